use crate::handle::define_handle;
use crate::Value;

define_handle!(
    /// Handle to a [`Metadata`] node.
    MdId,
    "MdId"
);

/// A schema-free metadata node.
///
/// Nodes are immutable once created. Tuple operands may be null (`None`), which is how
/// optional fields are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Metadata {
    String(String),
    Value(Value),
    Tuple(Vec<Option<MdId>>),
}
