//! High-level HLSL shader module.
//!
//! [`HlModule`] wraps a [`dxhl_ir::Module`] with the shader-specific state a code generator
//! accumulates: the resource registry, input/output/patch-constant signatures, per-function
//! shader-stage properties and type annotations. The [`metadata`] codec persists that
//! state into the host module's named metadata and restores it after the module has been
//! round-tripped. [`debug_info`] and [`precise`] hold the helpers legalization passes use
//! when they split globals or promote precise values out of memory.

#![forbid(unsafe_code)]

pub mod debug_info;
pub mod dxil;
mod error;
pub mod metadata;
mod module;
mod options;
pub mod precise;
mod props;
mod resource;
mod shader_model;
mod signature;
mod type_system;

pub use crate::debug_info::ElementGeometry;
pub use crate::error::{HlError, Result};
pub use crate::metadata::{clear_hl_metadata, MetadataVersion, HL_METADATA_VERSION};
pub use crate::module::{is_shared_memory_global, is_static_global, HlModule, LEGACY_DATA_LAYOUT};
pub use crate::options::HlOptions;
pub use crate::props::{
    ComputeProps, DomainProps, FunctionProps, GeometryProps, HullProps, PixelProps, StageProps,
    VertexProps,
};
pub use crate::resource::{
    BoundResource, CBuffer, Resource, ResourceBinding, ResourceList, ResourceRegistry, Sampler,
};
pub use crate::shader_model::ShaderModel;
pub use crate::signature::{
    RootSignatureHandle, Signature, SignatureElement, SignatureKind, SignatureSet,
};
pub use crate::type_system::{
    is_hlsl_object_type, is_stream_output_ptr_type, is_stream_output_type,
    legacy_cbuffer_field_element_size, matrix_shape, parameter_rows_and_cols, FieldAnnotation,
    FunctionAnnotation, ParameterAnnotation, ResourceTypeAnnotations, StructAnnotation,
    TypeSystem,
};
