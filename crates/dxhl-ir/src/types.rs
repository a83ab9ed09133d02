//! Interned IR types.
//!
//! Types are uniqued per module: two structurally equal types always share one [`TypeId`],
//! so side-tables can key on the handle the same way they would key on a type pointer.

use std::collections::HashMap;

use crate::handle::define_handle;

define_handle!(
    /// Handle to an interned [`Type`].
    TypeId,
    "TypeId"
);

/// Address space of a pointer or global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressSpace {
    #[default]
    Default,
    /// Thread-group shared memory.
    GroupShared,
}

impl AddressSpace {
    /// Numeric address space as it appears in the textual IR.
    pub fn to_raw(self) -> u32 {
        match self {
            AddressSpace::Default => 0,
            AddressSpace::GroupShared => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int {
        bits: u32,
    },
    Float {
        bits: u32,
    },
    Vector {
        element: TypeId,
        len: u32,
    },
    Array {
        element: TypeId,
        len: u64,
    },
    /// Named aggregate. Object types (textures, buffers, streams) are modelled as structs
    /// whose name carries the object class, e.g. `class.Texture2D<float4>`.
    Struct {
        name: String,
        fields: Vec<TypeId>,
    },
    Pointer {
        pointee: TypeId,
        address_space: AddressSpace,
    },
    Function {
        ret: TypeId,
        params: Vec<TypeId>,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TypeTable {
    types: Vec<Type>,
    lookup: HashMap<Type, TypeId>,
}

impl TypeTable {
    pub(crate) fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = TypeId::from_index(self.types.len());
        self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by a different module.
    pub(crate) fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub(crate) fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".to_owned(),
            Type::Int { bits } => format!("i{bits}"),
            Type::Float { bits: 16 } => "half".to_owned(),
            Type::Float { bits: 32 } => "float".to_owned(),
            Type::Float { bits: 64 } => "double".to_owned(),
            Type::Float { bits } => format!("f{bits}"),
            Type::Vector { element, len } => format!("<{len} x {}>", self.name(*element)),
            Type::Array { element, len } => format!("[{len} x {}]", self.name(*element)),
            Type::Struct { name, .. } => format!("%{name}"),
            Type::Pointer {
                pointee,
                address_space: AddressSpace::Default,
            } => format!("{}*", self.name(*pointee)),
            Type::Pointer {
                pointee,
                address_space,
            } => format!("{} addrspace({})*", self.name(*pointee), address_space.to_raw()),
            Type::Function { ret, params } => {
                let params: Vec<String> = params.iter().map(|p| self.name(*p)).collect();
                format!("{} ({})", self.name(*ret), params.join(", "))
            }
        }
    }
}
