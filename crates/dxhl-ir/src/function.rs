use std::collections::BTreeMap;

use crate::handle::define_handle;
use crate::{MdId, TypeId, Value};

define_handle!(
    /// Handle to a [`Function`].
    FunctionId,
    "FunctionId"
);

define_handle!(
    /// Handle to an [`Instruction`].
    InstId,
    "InstId"
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) body: Vec<InstId>,
    pub(crate) metadata: BTreeMap<String, MdId>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's [`crate::Type::Function`] signature.
    pub fn function_type(&self) -> TypeId {
        self.ty
    }

    /// Instructions in program order. Functions are a single linear block.
    pub fn body(&self) -> &[InstId] {
        &self.body
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    Alloca { allocated: TypeId },
    Load { ptr: Value },
    Store { ptr: Value, value: Value },
    Binary { op: BinaryOp, lhs: Value, rhs: Value },
    Call { callee: FunctionId, args: Vec<Value> },
    Ret { value: Option<Value> },
}

impl InstKind {
    pub fn operands(&self) -> Vec<Value> {
        match self {
            InstKind::Alloca { .. } => Vec::new(),
            InstKind::Load { ptr } => vec![*ptr],
            InstKind::Store { ptr, value } => vec![*ptr, *value],
            InstKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            InstKind::Call { callee, args } => {
                let mut ops = Vec::with_capacity(args.len() + 1);
                ops.push(Value::Function(*callee));
                ops.extend(args.iter().copied());
                ops
            }
            InstKind::Ret { value } => value.iter().copied().collect(),
        }
    }

    pub(crate) fn replace_operand(&mut self, from: Value, to: Value) -> bool {
        let mut changed = false;
        let mut swap = |slot: &mut Value| {
            if *slot == from {
                *slot = to;
                changed = true;
            }
        };
        match self {
            InstKind::Alloca { .. } => {}
            InstKind::Load { ptr } => swap(ptr),
            InstKind::Store { ptr, value } => {
                swap(ptr);
                swap(value);
            }
            InstKind::Binary { lhs, rhs, .. } => {
                swap(lhs);
                swap(rhs);
            }
            InstKind::Call { args, .. } => args.iter_mut().for_each(swap),
            InstKind::Ret { value } => {
                if let Some(value) = value {
                    swap(value);
                }
            }
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub(crate) parent: FunctionId,
    pub(crate) kind: InstKind,
    pub(crate) ty: TypeId,
    pub(crate) metadata: BTreeMap<String, MdId>,
}

impl Instruction {
    pub fn parent(&self) -> FunctionId {
        self.parent
    }

    pub fn kind(&self) -> &InstKind {
        &self.kind
    }

    /// Result type; `void` for stores, returns and void calls.
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    pub fn metadata(&self, kind: &str) -> Option<MdId> {
        self.metadata.get(kind).copied()
    }
}
