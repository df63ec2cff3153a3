//! Reader and in-place node editor for U8 packed-directory archives.
//!
//! A U8 archive is a header, a flat table of 12-byte nodes describing a
//! directory tree, a string table of node names, and one contiguous data
//! region. This crate parses that directory from an in-memory buffer and lets
//! callers rewrite the offset/size of file nodes without touching the tree
//! shape, which is all an overlay needs to redirect an entry to new data.
//!
//! Enable the `builder` feature for [`U8Builder`], which assembles archives in
//! memory (used by fixtures and tooling).

mod archive;
#[cfg(any(test, feature = "builder"))]
mod builder;
pub mod error;
pub mod header;

pub use archive::{Children, Entry, U8Archive};
#[cfg(any(test, feature = "builder"))]
pub use builder::U8Builder;
pub use error::{ArchiveError, Result};
pub use header::{NodeKind, U8Header, U8Node, HEADER_SIZE, NODE_SIZE};

/// Archive magic, `U.8-`.
pub const U8_MAGIC: u32 = 0x55AA_382D;

/// Boundary every file's data must start on.
pub const DATA_ALIGNMENT: u64 = 0x20;

/// Round `value` up to the next multiple of `alignment` (a power of two).
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 0x20), 0);
        assert_eq!(align_up(1, 0x20), 0x20);
        assert_eq!(align_up(0x20, 0x20), 0x20);
        assert_eq!(align_up(40, 32), 64);
    }

    #[test]
    fn test_magic_matches_header_codec() {
        assert_eq!(&U8_MAGIC.to_be_bytes(), &[0x55, 0xAA, 0x38, 0x2D]);
    }
}
