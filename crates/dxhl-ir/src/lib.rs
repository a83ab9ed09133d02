//! Arena-based host IR for the high-level shader module.
//!
//! This crate is the generic layer the high-level module augments: interned types, global
//! variables, functions with a linear instruction list, uniqued constants, schema-free
//! metadata (strings, value references and tuples) attached to the module under names or
//! to individual instructions and functions, and a debug-info model.
//!
//! Entities are addressed by stable integer handles ([`GlobalId`], [`FunctionId`],
//! [`TypeId`], ...). Side-tables kept by higher layers key on these handles.

#![forbid(unsafe_code)]

mod debug_info;
mod error;
mod function;
mod global;
mod handle;
mod metadata;
mod module;
mod types;
mod value;

/// Helpers that simulate destructive transformations in tests.
///
/// Only available when compiling this crate's own tests or with the `test-utils` feature.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::debug_info::{
    DebugInfo, DebugInfoFinder, DiCompileUnit, DiCompileUnitId, DiGlobalVariable,
    DiGlobalVariableId, DiType, DiTypeId, DiTypeTag,
};
pub use crate::error::{IrError, Result};
pub use crate::function::{BinaryOp, Function, FunctionId, InstId, InstKind, Instruction};
pub use crate::global::{GlobalId, GlobalVariable, Linkage};
pub use crate::metadata::{MdId, Metadata};
pub use crate::module::Module;
pub use crate::types::{AddressSpace, Type, TypeId};
pub use crate::value::{ConstId, Constant, Value};
