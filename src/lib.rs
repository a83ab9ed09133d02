//! HLSL high-level module over an arena-based host IR.
//!
//! Re-exports [`dxhl_module`] at the top level and the host IR as [`ir`].

#![forbid(unsafe_code)]

pub use dxhl_ir as ir;
pub use dxhl_module::*;
