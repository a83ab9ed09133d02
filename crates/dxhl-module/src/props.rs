//! Per-function shader-stage properties.
//!
//! A [`FunctionProps`] record holds exactly one stage payload. The stage is fixed when the
//! record is built; changing it means replacing the record.

use dxhl_ir::{FunctionId, GlobalId};

use crate::dxil::{
    InputPrimitive, PrimitiveTopology, ShaderKind, TessellatorDomain,
    TessellatorOutputPrimitive, TessellatorPartitioning, DEFAULT_MAX_TESS_FACTOR,
    NUM_CLIP_PLANES, NUM_OUTPUT_STREAMS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeProps {
    pub num_threads: [u32; 3],
}

impl Default for ComputeProps {
    fn default() -> Self {
        Self {
            num_threads: [1, 1, 1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryProps {
    pub input_primitive: InputPrimitive,
    pub max_vertex_count: u32,
    pub instance_count: u32,
    /// Output topology per stream; `Undefined` for unused streams.
    pub stream_primitive_topologies: [PrimitiveTopology; NUM_OUTPUT_STREAMS],
}

impl Default for GeometryProps {
    fn default() -> Self {
        Self {
            input_primitive: InputPrimitive::Undefined,
            max_vertex_count: 0,
            instance_count: 1,
            stream_primitive_topologies: [PrimitiveTopology::Undefined; NUM_OUTPUT_STREAMS],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullProps {
    pub patch_constant_func: Option<FunctionId>,
    pub domain: TessellatorDomain,
    pub partitioning: TessellatorPartitioning,
    pub output_primitive: TessellatorOutputPrimitive,
    pub input_control_points: u32,
    pub output_control_points: u32,
    pub max_tess_factor: f32,
}

impl Default for HullProps {
    fn default() -> Self {
        Self {
            patch_constant_func: None,
            domain: TessellatorDomain::Undefined,
            partitioning: TessellatorPartitioning::Undefined,
            output_primitive: TessellatorOutputPrimitive::Undefined,
            input_control_points: 0,
            output_control_points: 0,
            max_tess_factor: DEFAULT_MAX_TESS_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainProps {
    pub domain: TessellatorDomain,
    pub input_control_points: u32,
}

impl Default for DomainProps {
    fn default() -> Self {
        Self {
            domain: TessellatorDomain::Undefined,
            input_control_points: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexProps {
    /// Globals holding the user clip-plane equations.
    pub clip_planes: [Option<GlobalId>; NUM_CLIP_PLANES],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelProps {
    pub early_depth_stencil: bool,
}

/// The stage payload of a [`FunctionProps`] record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageProps {
    Compute(ComputeProps),
    Geometry(GeometryProps),
    Hull(HullProps),
    Domain(DomainProps),
    Vertex(VertexProps),
    Pixel(PixelProps),
}

impl StageProps {
    pub fn shader_kind(&self) -> ShaderKind {
        match self {
            StageProps::Compute(_) => ShaderKind::Compute,
            StageProps::Geometry(_) => ShaderKind::Geometry,
            StageProps::Hull(_) => ShaderKind::Hull,
            StageProps::Domain(_) => ShaderKind::Domain,
            StageProps::Vertex(_) => ShaderKind::Vertex,
            StageProps::Pixel(_) => ShaderKind::Pixel,
        }
    }

    /// A payload of the given stage with every field defaulted.
    pub fn default_for(kind: ShaderKind) -> Self {
        match kind {
            ShaderKind::Compute => StageProps::Compute(ComputeProps::default()),
            ShaderKind::Geometry => StageProps::Geometry(GeometryProps::default()),
            ShaderKind::Hull => StageProps::Hull(HullProps::default()),
            ShaderKind::Domain => StageProps::Domain(DomainProps::default()),
            ShaderKind::Vertex => StageProps::Vertex(VertexProps::default()),
            ShaderKind::Pixel => StageProps::Pixel(PixelProps::default()),
        }
    }
}

/// Shader-stage properties of one entry or patch-constant function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionProps {
    stage: StageProps,
}

macro_rules! stage_accessors {
    ($($variant:ident, $props:ty, $get:ident, $get_mut:ident, $expect:ident;)+) => {
        $(
            pub fn $get(&self) -> Option<&$props> {
                match &self.stage {
                    StageProps::$variant(props) => Some(props),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self) -> Option<&mut $props> {
                match &mut self.stage {
                    StageProps::$variant(props) => Some(props),
                    _ => None,
                }
            }

            /// # Panics
            ///
            /// Panics if the record belongs to another stage.
            #[track_caller]
            pub fn $expect(&self) -> &$props {
                match &self.stage {
                    StageProps::$variant(props) => props,
                    other => panic!(
                        "{:?} properties read from a {:?} record",
                        ShaderKind::$variant,
                        other.shader_kind()
                    ),
                }
            }
        )+
    };
}

impl FunctionProps {
    pub fn new(stage: StageProps) -> Self {
        Self { stage }
    }

    pub fn shader_kind(&self) -> ShaderKind {
        self.stage.shader_kind()
    }

    pub fn stage(&self) -> &StageProps {
        &self.stage
    }

    stage_accessors! {
        Compute, ComputeProps, compute, compute_mut, expect_compute;
        Geometry, GeometryProps, geometry, geometry_mut, expect_geometry;
        Hull, HullProps, hull, hull_mut, expect_hull;
        Domain, DomainProps, domain, domain_mut, expect_domain;
        Vertex, VertexProps, vertex, vertex_mut, expect_vertex;
        Pixel, PixelProps, pixel, pixel_mut, expect_pixel;
    }
}

macro_rules! impl_from_stage {
    ($($variant:ident($props:ty)),+) => {
        $(
            impl From<$props> for FunctionProps {
                fn from(props: $props) -> Self {
                    Self::new(StageProps::$variant(props))
                }
            }
        )+
    };
}

impl_from_stage!(
    Compute(ComputeProps),
    Geometry(GeometryProps),
    Hull(HullProps),
    Domain(DomainProps),
    Vertex(VertexProps),
    Pixel(PixelProps)
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_follows_payload() {
        let props = FunctionProps::from(ComputeProps {
            num_threads: [8, 8, 1],
        });
        assert_eq!(props.shader_kind(), ShaderKind::Compute);
        assert_eq!(props.compute().unwrap().num_threads, [8, 8, 1]);
    }

    #[test]
    fn mismatched_accessors_return_none() {
        let mut props = FunctionProps::from(PixelProps {
            early_depth_stencil: true,
        });
        assert!(props.compute().is_none());
        assert!(props.hull_mut().is_none());
        assert!(props.vertex().is_none());
        assert!(props.pixel().unwrap().early_depth_stencil);
    }

    #[test]
    #[should_panic(expected = "Hull properties read from a Domain record")]
    fn mismatched_expect_accessor_panics() {
        FunctionProps::from(DomainProps::default()).expect_hull();
    }

    #[test]
    fn mutation_keeps_the_tag() {
        let mut props = FunctionProps::new(StageProps::default_for(ShaderKind::Hull));
        props.hull_mut().unwrap().output_control_points = 3;
        assert_eq!(props.shader_kind(), ShaderKind::Hull);
        assert_eq!(props.expect_hull().output_control_points, 3);
        assert_eq!(props.expect_hull().max_tess_factor, 64.0);
    }

    #[test]
    fn defaults_cover_every_stage() {
        for raw in 0..=5 {
            let kind = ShaderKind::from_u32(raw).unwrap();
            assert_eq!(StageProps::default_for(kind).shader_kind(), kind);
        }
    }
}
