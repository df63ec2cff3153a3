//! Error types for U8 archive parsing and node mutation.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors raised while reading or editing a U8 archive buffer.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A header or node record could not be decoded.
    #[error("Binary read error: {0}")]
    Binary(#[from] binrw::Error),

    /// The buffer is too small to hold the structure being read.
    #[error("Archive truncated: need {needed} bytes, buffer has {available}")]
    Truncated { needed: u64, available: usize },

    /// The root node is missing, is not a directory, or declares no nodes.
    #[error("Invalid root node: {0}")]
    InvalidRoot(String),

    /// A node violates the directory tree invariants.
    #[error("Invalid node {index}: {reason}")]
    InvalidNode { index: usize, reason: String },

    /// A node name points outside the string table or is not terminated.
    #[error("Name of node {index} is out of range (offset {offset:#x})")]
    NameOutOfRange { index: usize, offset: u32 },

    /// A file node's data range does not fit inside the archive buffer.
    #[error("File node {index} range {offset:#x}+{size:#x} exceeds buffer length {len:#x}")]
    FileOutOfBounds {
        index: usize,
        offset: u64,
        size: u64,
        len: usize,
    },

    /// A node index is past the end of the node table.
    #[error("Node index {index} out of range ({count} nodes)")]
    NodeIndexOutOfRange { index: usize, count: usize },

    /// Offset/size updates are only allowed on file nodes.
    #[error("Node {0} is a directory")]
    NotAFile(usize),

    /// An offset does not fit the 32-bit field of the node record.
    #[error("Offset {0:#x} does not fit in a node record")]
    OffsetOverflow(u64),
}
