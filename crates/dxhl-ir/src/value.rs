use crate::handle::define_handle;
use crate::{FunctionId, GlobalId, InstId, TypeId};

define_handle!(
    /// Handle to a uniqued [`Constant`].
    ConstId,
    "ConstId"
);

/// A uniqued constant. Floats are stored by bit pattern so constants can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int { ty: TypeId, value: i64 },
    Float { ty: TypeId, bits: u64 },
    /// Opaque byte array (`[N x i8]` initializer).
    Bytes(Vec<u8>),
    Undef(TypeId),
    Null(TypeId),
}

impl Constant {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Float { bits, .. } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

/// Any operand an instruction or metadata node may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Inst(InstId),
    Global(GlobalId),
    Function(FunctionId),
    Argument { function: FunctionId, index: u32 },
    Const(ConstId),
}

impl From<InstId> for Value {
    fn from(id: InstId) -> Self {
        Value::Inst(id)
    }
}

impl From<GlobalId> for Value {
    fn from(id: GlobalId) -> Self {
        Value::Global(id)
    }
}

impl From<FunctionId> for Value {
    fn from(id: FunctionId) -> Self {
        Value::Function(id)
    }
}

impl From<ConstId> for Value {
    fn from(id: ConstId) -> Self {
        Value::Const(id)
    }
}
