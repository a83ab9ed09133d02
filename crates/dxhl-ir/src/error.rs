use thiserror::Error;

use crate::{ConstId, FunctionId, GlobalId, InstId};

pub type Result<T> = std::result::Result<T, IrError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("unknown or erased global {0}")]
    UnknownGlobal(GlobalId),

    #[error("unknown or erased function {0}")]
    UnknownFunction(FunctionId),

    #[error("unknown or erased instruction {0}")]
    UnknownInstruction(InstId),

    #[error("unknown constant {0}")]
    UnknownConstant(ConstId),

    #[error("function `{0}` already exists")]
    DuplicateFunction(String),

    #[error("type `{0}` is not a function type")]
    NotAFunctionType(String),

    #[error("type `{0}` is not a pointer type")]
    NotAPointerType(String),

    #[error("argument {index} is out of range for {function}")]
    UnknownArgument { function: FunctionId, index: u32 },

    #[error("call to {callee} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        callee: FunctionId,
        expected: usize,
        actual: usize,
    },
}
