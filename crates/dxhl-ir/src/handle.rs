/// Declares a stable integer handle into one of the module's arenas.
///
/// Handles are never reused: erasing an entity leaves a tombstone so side-tables keyed on a
/// handle can detect that the entity is gone instead of silently aliasing a newer one.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Zero-based arena slot of this handle.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                assert!(index <= u32::MAX as usize, "arena exceeds u32::MAX entries");
                Self(index as u32)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

pub(crate) use define_handle;
