//! DXIL enumerations carried by the high-level module, with their on-disk numbering.

/// Declares a `#[repr(u32)]` enum together with its `from_u32`/`to_u32` conversions.
macro_rules! dxil_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            pub fn from_u32(value: u32) -> Option<Self> {
                Some(match value {
                    $($value => Self::$variant,)+
                    _ => return None,
                })
            }

            pub fn to_u32(self) -> u32 {
                self as u32
            }
        }
    };
}

/// Number of geometry-shader output streams.
pub const NUM_OUTPUT_STREAMS: usize = 4;

/// Number of user clip planes a vertex shader may declare.
pub const NUM_CLIP_PLANES: usize = 6;

/// Hull-shader maximum tessellation factor when none is declared.
pub const DEFAULT_MAX_TESS_FACTOR: f32 = 64.0;

dxil_enum! {
    pub enum ShaderKind {
        Pixel = 0,
        Vertex = 1,
        Geometry = 2,
        Hull = 3,
        Domain = 4,
        Compute = 5,
    }
}

impl ShaderKind {
    /// Two-letter profile prefix, as in `cs_6_0`.
    pub fn prefix(self) -> &'static str {
        match self {
            ShaderKind::Pixel => "ps",
            ShaderKind::Vertex => "vs",
            ShaderKind::Geometry => "gs",
            ShaderKind::Hull => "hs",
            ShaderKind::Domain => "ds",
            ShaderKind::Compute => "cs",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "ps" => ShaderKind::Pixel,
            "vs" => ShaderKind::Vertex,
            "gs" => ShaderKind::Geometry,
            "hs" => ShaderKind::Hull,
            "ds" => ShaderKind::Domain,
            "cs" => ShaderKind::Compute,
            _ => return None,
        })
    }
}

dxil_enum! {
    pub enum ResourceClass {
        Srv = 0,
        Uav = 1,
        CBuffer = 2,
        Sampler = 3,
        /// Sentinel returned for types without a resource annotation.
        Invalid = 4,
    }
}

dxil_enum! {
    pub enum ResourceKind {
        /// Sentinel returned for types without a resource annotation.
        Invalid = 0,
        Texture1D = 1,
        Texture2D = 2,
        Texture2DMS = 3,
        Texture3D = 4,
        TextureCube = 5,
        Texture1DArray = 6,
        Texture2DArray = 7,
        Texture2DMSArray = 8,
        TextureCubeArray = 9,
        TypedBuffer = 10,
        RawBuffer = 11,
        StructuredBuffer = 12,
        CBuffer = 13,
        Sampler = 14,
        TBuffer = 15,
    }
}

dxil_enum! {
    pub enum ComponentType {
        Invalid = 0,
        I1 = 1,
        I16 = 2,
        U16 = 3,
        I32 = 4,
        U32 = 5,
        I64 = 6,
        U64 = 7,
        F16 = 8,
        F32 = 9,
        F64 = 10,
        SNormF16 = 11,
        UNormF16 = 12,
        SNormF32 = 13,
        UNormF32 = 14,
        SNormF64 = 15,
        UNormF64 = 16,
    }
}

impl ComponentType {
    pub fn is_64_bit(self) -> bool {
        matches!(
            self,
            ComponentType::I64
                | ComponentType::U64
                | ComponentType::F64
                | ComponentType::SNormF64
                | ComponentType::UNormF64
        )
    }
}

dxil_enum! {
    pub enum SamplerKind {
        Default = 0,
        Comparison = 1,
        Mono = 2,
        Invalid = 3,
    }
}

dxil_enum! {
    pub enum SemanticKind {
        Arbitrary = 0,
        VertexId = 1,
        InstanceId = 2,
        Position = 3,
        RenderTargetArrayIndex = 4,
        ViewportArrayIndex = 5,
        ClipDistance = 6,
        CullDistance = 7,
        OutputControlPointId = 8,
        DomainLocation = 9,
        PrimitiveId = 10,
        GsInstanceId = 11,
        SampleIndex = 12,
        IsFrontFace = 13,
        Coverage = 14,
        InnerCoverage = 15,
        Target = 16,
        Depth = 17,
        DepthLessEqual = 18,
        DepthGreaterEqual = 19,
        StencilRef = 20,
        DispatchThreadId = 21,
        GroupId = 22,
        GroupIndex = 23,
        GroupThreadId = 24,
        TessFactor = 25,
        InsideTessFactor = 26,
        Invalid = 27,
    }
}

dxil_enum! {
    pub enum InterpolationMode {
        Undefined = 0,
        Constant = 1,
        Linear = 2,
        LinearCentroid = 3,
        LinearNoperspective = 4,
        LinearNoperspectiveCentroid = 5,
        LinearSample = 6,
        LinearNoperspectiveSample = 7,
        Invalid = 8,
    }
}

dxil_enum! {
    pub enum InputPrimitive {
        Undefined = 0,
        Point = 1,
        Line = 2,
        Triangle = 3,
        LineWithAdjacency = 6,
        TriangleWithAdjacency = 7,
        ControlPointPatch1 = 8,
        ControlPointPatch2 = 9,
        ControlPointPatch3 = 10,
        ControlPointPatch4 = 11,
        ControlPointPatch5 = 12,
        ControlPointPatch6 = 13,
        ControlPointPatch7 = 14,
        ControlPointPatch8 = 15,
        ControlPointPatch9 = 16,
        ControlPointPatch10 = 17,
        ControlPointPatch11 = 18,
        ControlPointPatch12 = 19,
        ControlPointPatch13 = 20,
        ControlPointPatch14 = 21,
        ControlPointPatch15 = 22,
        ControlPointPatch16 = 23,
        ControlPointPatch17 = 24,
        ControlPointPatch18 = 25,
        ControlPointPatch19 = 26,
        ControlPointPatch20 = 27,
        ControlPointPatch21 = 28,
        ControlPointPatch22 = 29,
        ControlPointPatch23 = 30,
        ControlPointPatch24 = 31,
        ControlPointPatch25 = 32,
        ControlPointPatch26 = 33,
        ControlPointPatch27 = 34,
        ControlPointPatch28 = 35,
        ControlPointPatch29 = 36,
        ControlPointPatch30 = 37,
        ControlPointPatch31 = 38,
        ControlPointPatch32 = 39,
    }
}

dxil_enum! {
    pub enum PrimitiveTopology {
        Undefined = 0,
        PointList = 1,
        LineList = 2,
        LineStrip = 3,
        TriangleList = 4,
        TriangleStrip = 5,
    }
}

dxil_enum! {
    pub enum TessellatorDomain {
        Undefined = 0,
        IsoLine = 1,
        Tri = 2,
        Quad = 3,
    }
}

dxil_enum! {
    pub enum TessellatorPartitioning {
        Undefined = 0,
        Integer = 1,
        Pow2 = 2,
        FractionalOdd = 3,
        FractionalEven = 4,
    }
}

dxil_enum! {
    pub enum TessellatorOutputPrimitive {
        Undefined = 0,
        Point = 1,
        Line = 2,
        TriangleCw = 3,
        TriangleCcw = 4,
    }
}

dxil_enum! {
    /// How a function parameter is passed.
    pub enum InputQualifier {
        In = 0,
        Out = 1,
        InOut = 2,
        InputPatch = 3,
        OutputPatch = 4,
        OutStream0 = 5,
        OutStream1 = 6,
        OutStream2 = 7,
        OutStream3 = 8,
        InputPrimitive = 9,
    }
}

dxil_enum! {
    pub enum MatrixOrientation {
        Undefined = 0,
        RowMajor = 1,
        ColumnMajor = 2,
    }
}
