use bitflags::bitflags;

use crate::error::{HlError, Result};

bitflags! {
    /// Module-wide code-generation options, persisted in `dx.options`.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct HlOptions: u32 {
        const DEFAULT_ROW_MAJOR = 1 << 0;
        const IEEE_STRICT = 1 << 1;
        const ALL_RESOURCES_BOUND = 1 << 2;
        const DISABLE_OPTIMIZATIONS = 1 << 3;
        const LEGACY_CBUFFER_LOAD = 1 << 4;
    }
}

impl HlOptions {
    pub fn to_raw(self) -> u32 {
        self.bits()
    }

    /// Unpacks a raw options word. Bits outside the known set are an error.
    pub fn from_raw(raw: u32) -> Result<Self> {
        Self::from_bits(raw).ok_or(HlError::ReservedOptionBits(raw & !Self::all().bits()))
    }

    /// Unpacks a raw options word written by a newer producer, dropping bits this version
    /// does not know about.
    pub fn from_raw_truncate(raw: u32) -> Self {
        Self::from_bits_truncate(raw)
    }
}
