use std::fmt;
use std::str::FromStr;

use crate::dxil::ShaderKind;
use crate::error::HlError;

/// Target profile of the module, e.g. `cs_6_0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModel {
    pub kind: ShaderKind,
    pub major: u32,
    pub minor: u32,
}

impl ShaderModel {
    pub fn new(kind: ShaderKind, major: u32, minor: u32) -> Self {
        Self { kind, major, minor }
    }
}

impl fmt::Display for ShaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind.prefix(), self.major, self.minor)
    }
}

impl FromStr for ShaderModel {
    type Err = HlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HlError::InvalidShaderModel(s.to_owned());
        let mut parts = s.split('_');
        let kind = parts
            .next()
            .and_then(ShaderKind::from_prefix)
            .ok_or_else(invalid)?;
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { kind, major, minor })
    }
}
