//! On-disk records: the archive header and the 12-byte node entry.

use binrw::binrw;

/// Size of one node record in the node table.
pub const NODE_SIZE: usize = 12;

/// Size of the archive header, which is also where the node table normally starts.
pub const HEADER_SIZE: usize = 0x20;

/// U8 archive header.
#[binrw]
#[brw(big, magic = 0x55AA382Du32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U8Header {
    /// Offset of the first node (the root directory), normally `0x20`.
    pub root_node_offset: u32,
    /// Combined size of the node table and the string table.
    pub header_size: u32,
    /// Offset of the file data region.
    pub data_offset: u32,
    pub reserved: [u8; 16],
}

/// Whether a node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    /// Any non-zero type byte is treated as a directory.
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            NodeKind::File
        } else {
            NodeKind::Directory
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            NodeKind::File => 0,
            NodeKind::Directory => 1,
        }
    }
}

/// A node table entry.
///
/// For files `data_offset` is the byte offset from the start of the archive and
/// `size` the byte length. For directories `data_offset` is the parent node index
/// and `size` is the index one past the directory's last descendant.
#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U8Node {
    #[br(map = |raw: u8| NodeKind::from_raw(raw))]
    #[bw(map = |kind: &NodeKind| kind.as_raw())]
    pub kind: NodeKind,

    /// 24-bit offset into the string table.
    #[br(map = |raw: [u8; 3]| u32::from_be_bytes([0, raw[0], raw[1], raw[2]]))]
    #[bw(map = |offset: &u32| { let b = offset.to_be_bytes(); [b[1], b[2], b[3]] })]
    pub name_offset: u32,

    pub data_offset: u32,
    pub size: u32,
}

impl U8Node {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}
