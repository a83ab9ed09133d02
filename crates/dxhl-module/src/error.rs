use dxhl_ir::{FunctionId, GlobalId, IrError};
use thiserror::Error;

use crate::dxil::ResourceClass;
use crate::metadata::HL_METADATA_VERSION;

pub type Result<T> = std::result::Result<T, HlError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HlError {
    #[error("{class:?} index {index} is out of range (collection holds {len} records)")]
    ResourceIndexOutOfRange {
        class: ResourceClass,
        index: u32,
        len: usize,
    },

    #[error("function {0} has no shader-stage properties")]
    MissingFunctionProps(FunctionId),

    #[error("global {0} has no debug info")]
    MissingDebugInfo(GlobalId),

    #[error("debug info for global {0} is not listed by any compile unit")]
    DetachedDebugInfo(GlobalId),

    #[error("malformed `{group}` metadata: {reason}")]
    MalformedMetadata { group: &'static str, reason: String },

    #[error(
        "unsupported HL metadata version {major}.{minor} (this codec reads major version {})",
        HL_METADATA_VERSION.major
    )]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("`{group}` refers to {entity}, which is no longer in the module")]
    DanglingReference { group: &'static str, entity: String },

    #[error("invalid shader model `{0}`")]
    InvalidShaderModel(String),

    #[error("option bits {0:#x} are reserved")]
    ReservedOptionBits(u32),

    #[error("global {0} is not in group-shared memory")]
    NotGroupShared(GlobalId),

    #[error("precise marker target has non-pointer type `{0}`")]
    NotAPointer(String),

    #[error(transparent)]
    Ir(#[from] IrError),
}

impl HlError {
    /// Whether the error rejects persisted metadata, including an unsupported version.
    pub fn is_malformed_metadata(&self) -> bool {
        matches!(
            self,
            HlError::MalformedMetadata { .. } | HlError::UnsupportedVersion { .. }
        )
    }

    pub(crate) fn malformed(group: &'static str, reason: impl Into<String>) -> Self {
        HlError::MalformedMetadata {
            group,
            reason: reason.into(),
        }
    }
}
