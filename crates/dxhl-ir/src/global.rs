use crate::handle::define_handle;
use crate::{AddressSpace, ConstId, TypeId};

define_handle!(
    /// Handle to a [`GlobalVariable`].
    GlobalId,
    "GlobalId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    #[default]
    External,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub name: String,
    /// Type of the stored value; the global itself is a pointer to it.
    pub value_type: TypeId,
    pub address_space: AddressSpace,
    pub linkage: Linkage,
    pub is_constant: bool,
    pub initializer: Option<ConstId>,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, value_type: TypeId) -> Self {
        Self {
            name: name.into(),
            value_type,
            address_space: AddressSpace::Default,
            linkage: Linkage::External,
            is_constant: false,
            initializer: None,
        }
    }

    pub fn with_address_space(mut self, address_space: AddressSpace) -> Self {
        self.address_space = address_space;
        self
    }

    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_initializer(mut self, initializer: ConstId) -> Self {
        self.initializer = Some(initializer);
        self
    }
}
