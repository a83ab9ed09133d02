use std::collections::BTreeMap;

use dxhl_ir::{FunctionId, MdId};

use super::{Reader, Writer};
use crate::dxil::{
    InputPrimitive, PrimitiveTopology, ShaderKind, TessellatorDomain,
    TessellatorOutputPrimitive, TessellatorPartitioning, DEFAULT_MAX_TESS_FACTOR,
    NUM_CLIP_PLANES, NUM_OUTPUT_STREAMS,
};
use crate::error::Result;
use crate::props::{
    ComputeProps, DomainProps, FunctionProps, GeometryProps, HullProps, PixelProps, StageProps,
    VertexProps,
};

/// Function reference plus shader kind.
const HEADER_FIELDS: usize = 2;

fn payload_fields(kind: ShaderKind, minor: u32) -> usize {
    match kind {
        ShaderKind::Compute => 3,
        ShaderKind::Geometry => 3 + NUM_OUTPUT_STREAMS,
        // Minor 1 appended the max tessellation factor.
        ShaderKind::Hull => 6 + usize::from(minor >= 1),
        ShaderKind::Domain => 2,
        ShaderKind::Vertex => NUM_CLIP_PLANES,
        ShaderKind::Pixel => 1,
    }
}

fn emit_payload(w: &mut Writer<'_>, stage: &StageProps) -> Vec<Option<MdId>> {
    match stage {
        StageProps::Compute(cs) => cs.num_threads.iter().map(|&n| w.u32(n)).collect(),
        StageProps::Geometry(gs) => {
            let mut ops = vec![
                w.u32(gs.input_primitive.to_u32()),
                w.u32(gs.max_vertex_count),
                w.u32(gs.instance_count),
            ];
            for topology in gs.stream_primitive_topologies {
                ops.push(w.u32(topology.to_u32()));
            }
            ops
        }
        StageProps::Hull(hs) => vec![
            w.opt_value(hs.patch_constant_func),
            w.u32(hs.domain.to_u32()),
            w.u32(hs.partitioning.to_u32()),
            w.u32(hs.output_primitive.to_u32()),
            w.u32(hs.input_control_points),
            w.u32(hs.output_control_points),
            w.f32(hs.max_tess_factor),
        ],
        StageProps::Domain(ds) => vec![w.u32(ds.domain.to_u32()), w.u32(ds.input_control_points)],
        StageProps::Vertex(vs) => vs.clip_planes.iter().map(|&g| w.opt_value(g)).collect(),
        StageProps::Pixel(ps) => vec![w.bool(ps.early_depth_stencil)],
    }
}

/// One `dx.fnprops` operand per record, in function-handle order.
pub(super) fn emit(
    w: &mut Writer<'_>,
    props: &BTreeMap<FunctionId, FunctionProps>,
) -> Vec<MdId> {
    props
        .iter()
        .map(|(&f, record)| {
            let mut ops = vec![w.value(f), w.u32(record.shader_kind().to_u32())];
            ops.extend(emit_payload(w, record.stage()));
            w.tuple(ops)
        })
        .collect()
}

fn load_payload(r: &Reader<'_>, kind: ShaderKind, f: &[Option<MdId>]) -> Result<StageProps> {
    Ok(match kind {
        ShaderKind::Compute => StageProps::Compute(ComputeProps {
            num_threads: [
                r.u32(f[0], "num threads x")?,
                r.u32(f[1], "num threads y")?,
                r.u32(f[2], "num threads z")?,
            ],
        }),
        ShaderKind::Geometry => {
            let mut topologies = [PrimitiveTopology::Undefined; NUM_OUTPUT_STREAMS];
            for (slot, &op) in topologies.iter_mut().zip(&f[3..]) {
                *slot = r.enumerated(op, "stream topology", PrimitiveTopology::from_u32)?;
            }
            StageProps::Geometry(GeometryProps {
                input_primitive: r.enumerated(f[0], "input primitive", InputPrimitive::from_u32)?,
                max_vertex_count: r.u32(f[1], "max vertex count")?,
                instance_count: r.u32(f[2], "instance count")?,
                stream_primitive_topologies: topologies,
            })
        }
        ShaderKind::Hull => StageProps::Hull(HullProps {
            patch_constant_func: r.opt_function(f[0], "patch constant function")?,
            domain: r.enumerated(f[1], "domain", TessellatorDomain::from_u32)?,
            partitioning: r.enumerated(f[2], "partitioning", TessellatorPartitioning::from_u32)?,
            output_primitive: r.enumerated(
                f[3],
                "output primitive",
                TessellatorOutputPrimitive::from_u32,
            )?,
            input_control_points: r.u32(f[4], "input control points")?,
            output_control_points: r.u32(f[5], "output control points")?,
            max_tess_factor: match f.get(6) {
                Some(&op) => r.f32(op, "max tessellation factor")?,
                None => DEFAULT_MAX_TESS_FACTOR,
            },
        }),
        ShaderKind::Domain => StageProps::Domain(DomainProps {
            domain: r.enumerated(f[0], "domain", TessellatorDomain::from_u32)?,
            input_control_points: r.u32(f[1], "input control points")?,
        }),
        ShaderKind::Vertex => {
            let mut clip_planes = [None; NUM_CLIP_PLANES];
            for (slot, &op) in clip_planes.iter_mut().zip(f) {
                *slot = r.opt_global(op, "clip plane")?;
            }
            StageProps::Vertex(VertexProps { clip_planes })
        }
        ShaderKind::Pixel => StageProps::Pixel(PixelProps {
            early_depth_stencil: r.bool(f[0], "early depth stencil")?,
        }),
    })
}

pub(super) fn load(
    r: &Reader<'_>,
    operands: &[MdId],
) -> Result<BTreeMap<FunctionId, FunctionProps>> {
    let mut props = BTreeMap::new();
    for &node in operands {
        let header = r.tuple(node)?;
        if header.len() < HEADER_FIELDS {
            return Err(r.malformed("function properties record without a header"));
        }
        let kind = r.enumerated(header[1], "shader kind", ShaderKind::from_u32)?;
        let ops = r.record(
            node,
            HEADER_FIELDS + payload_fields(kind, r.minor()),
            "function properties",
        )?;
        let function = r.function(ops[0], "function")?;
        let stage = load_payload(r, kind, &ops[HEADER_FIELDS..])?;
        props.insert(function, FunctionProps::new(stage));
    }
    Ok(props)
}
