use dxhl_ir::{Constant, FunctionId, GlobalId, MdId, Metadata, Module, TypeId, Value};
use tracing::trace;

use super::{as_u32, HL_METADATA_VERSION};
use crate::error::{HlError, Result};

/// Typed field access over the metadata of one reserved group.
///
/// Every failure is reported as malformed metadata of that group.
pub(crate) struct Reader<'a> {
    module: &'a Module,
    group: &'static str,
    minor: u32,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(module: &'a Module, group: &'static str, minor: u32) -> Self {
        Self {
            module,
            group,
            minor,
        }
    }

    /// Minor version of the payload being read.
    pub(crate) fn minor(&self) -> u32 {
        self.minor
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> HlError {
        HlError::malformed(self.group, reason)
    }

    fn node(&self, md: MdId) -> Result<&'a Metadata> {
        self.module
            .metadata(md)
            .ok_or_else(|| self.malformed(format!("dangling node {md}")))
    }

    fn required(&self, op: Option<MdId>, what: &str) -> Result<MdId> {
        op.ok_or_else(|| self.malformed(format!("{what} is null")))
    }

    pub(crate) fn tuple(&self, md: MdId) -> Result<&'a [Option<MdId>]> {
        match self.node(md)? {
            Metadata::Tuple(ops) => Ok(ops),
            _ => Err(self.malformed(format!("{md} is not a tuple"))),
        }
    }

    /// A tuple operand that may be null; null reads as empty.
    pub(crate) fn opt_tuple(&self, op: Option<MdId>) -> Result<&'a [Option<MdId>]> {
        match op {
            Some(md) => self.tuple(md),
            None => Ok(&[]),
        }
    }

    /// A fixed-layout record with `arity` fields at the payload's version.
    ///
    /// Extra trailing fields are accepted only from a newer minor version and are cut off.
    pub(crate) fn record(&self, md: MdId, arity: usize, what: &str) -> Result<&'a [Option<MdId>]> {
        let ops = self.tuple(md)?;
        if ops.len() < arity {
            return Err(self.malformed(format!(
                "{what} has {} fields, expected {arity}",
                ops.len()
            )));
        }
        if ops.len() > arity {
            if self.minor <= HL_METADATA_VERSION.minor {
                return Err(self.malformed(format!(
                    "{what} has {} fields, expected {arity}",
                    ops.len()
                )));
            }
            trace!(
                group = self.group,
                extra = ops.len() - arity,
                "ignoring trailing fields"
            );
        }
        Ok(&ops[..arity])
    }

    pub(crate) fn value(&self, op: Option<MdId>, what: &str) -> Result<Value> {
        match self.node(self.required(op, what)?)? {
            Metadata::Value(v) => Ok(*v),
            _ => Err(self.malformed(format!("{what} is not a value reference"))),
        }
    }

    fn constant(&self, op: Option<MdId>, what: &str) -> Result<&'a Constant> {
        match self.value(op, what)? {
            Value::Const(c) => self
                .module
                .get_constant(c)
                .ok_or_else(|| self.malformed(format!("{what} refers to unknown {c}"))),
            _ => Err(self.malformed(format!("{what} is not a constant"))),
        }
    }

    fn int(&self, op: Option<MdId>, what: &str) -> Result<i64> {
        self.constant(op, what)?
            .as_int()
            .ok_or_else(|| self.malformed(format!("{what} is not an integer")))
    }

    pub(crate) fn u32(&self, op: Option<MdId>, what: &str) -> Result<u32> {
        as_u32(self.constant(op, what)?)
            .ok_or_else(|| self.malformed(format!("{what} is not a 32-bit unsigned integer")))
    }

    /// Reads a field written by `Writer::opt_u32`.
    pub(crate) fn opt_u32(&self, op: Option<MdId>, what: &str) -> Result<Option<u32>> {
        match self.int(op, what)? {
            -1 => Ok(None),
            v => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.malformed(format!("{what} is out of range: {v}"))),
        }
    }

    pub(crate) fn bool(&self, op: Option<MdId>, what: &str) -> Result<bool> {
        match self.int(op, what)? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(self.malformed(format!("{what} is not a boolean: {v}"))),
        }
    }

    pub(crate) fn f32(&self, op: Option<MdId>, what: &str) -> Result<f32> {
        self.constant(op, what)?
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| self.malformed(format!("{what} is not a float")))
    }

    pub(crate) fn enumerated<T>(
        &self,
        op: Option<MdId>,
        what: &str,
        from_u32: fn(u32) -> Option<T>,
    ) -> Result<T> {
        let raw = self.u32(op, what)?;
        from_u32(raw).ok_or_else(|| self.malformed(format!("{what} has unknown value {raw}")))
    }

    pub(crate) fn string(&self, op: Option<MdId>, what: &str) -> Result<&'a str> {
        match self.node(self.required(op, what)?)? {
            Metadata::String(s) => Ok(s),
            _ => Err(self.malformed(format!("{what} is not a string"))),
        }
    }

    pub(crate) fn opt_string(&self, op: Option<MdId>, what: &str) -> Result<Option<&'a str>> {
        op.map(|_| self.string(op, what)).transpose()
    }

    pub(crate) fn bytes(&self, op: Option<MdId>, what: &str) -> Result<&'a [u8]> {
        match self.constant(op, what)? {
            Constant::Bytes(bytes) => Ok(bytes),
            _ => Err(self.malformed(format!("{what} is not a byte array"))),
        }
    }

    pub(crate) fn global(&self, op: Option<MdId>, what: &str) -> Result<GlobalId> {
        match self.value(op, what)? {
            Value::Global(g) if self.module.contains_global(g) => Ok(g),
            Value::Global(g) => Err(self.malformed(format!("{what} refers to erased {g}"))),
            _ => Err(self.malformed(format!("{what} is not a global"))),
        }
    }

    pub(crate) fn opt_global(&self, op: Option<MdId>, what: &str) -> Result<Option<GlobalId>> {
        op.map(|_| self.global(op, what)).transpose()
    }

    pub(crate) fn function(&self, op: Option<MdId>, what: &str) -> Result<FunctionId> {
        match self.value(op, what)? {
            Value::Function(f) if self.module.contains_function(f) => Ok(f),
            Value::Function(f) => Err(self.malformed(format!("{what} refers to erased {f}"))),
            _ => Err(self.malformed(format!("{what} is not a function"))),
        }
    }

    pub(crate) fn opt_function(&self, op: Option<MdId>, what: &str) -> Result<Option<FunctionId>> {
        op.map(|_| self.function(op, what)).transpose()
    }

    /// A type carried as an `undef` constant of that type.
    pub(crate) fn ty(&self, op: Option<MdId>, what: &str) -> Result<TypeId> {
        match self.constant(op, what)? {
            Constant::Undef(ty) => Ok(*ty),
            _ => Err(self.malformed(format!("{what} is not a type placeholder"))),
        }
    }
}
