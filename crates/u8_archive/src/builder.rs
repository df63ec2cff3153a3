//! In-memory U8 archive construction.
//!
//! Produces the layout the game's own tooling emits: a root directory holding a
//! single `.` directory, children sorted by name, and every file's data starting
//! on a [`DATA_ALIGNMENT`] boundary.

use crate::header::{NodeKind, U8Header, U8Node, HEADER_SIZE, NODE_SIZE};
use crate::{align_up, Result, DATA_ALIGNMENT};
use binrw::BinWrite;
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, Clone)]
enum Tree {
    File(Vec<u8>),
    Dir(BTreeMap<String, Tree>),
}

/// Builder for U8 archive buffers.
///
/// ```ignore
/// use u8_archive::{U8Archive, U8Builder};
///
/// let data = U8Builder::default()
///     .with_file("blyt/award.brlyt", b"layout".to_vec())
///     .build()?;
/// let archive = U8Archive::parse(&data).unwrap();
/// assert!(archive.find_path("blyt/award.brlyt").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct U8Builder {
    root: BTreeMap<String, Tree>,
    dot_root: bool,
}

impl Default for U8Builder {
    fn default() -> Self {
        Self {
            root: BTreeMap::new(),
            dot_root: true,
        }
    }
}

struct FlatNode<'a> {
    name: &'a str,
    kind: NodeKind,
    parent: usize,
    end: usize,
    data: Option<&'a [u8]>,
}

impl U8Builder {
    /// Place entries directly under the root instead of under a `.` directory.
    pub fn without_dot_root(mut self) -> Self {
        self.dot_root = false;
        self
    }

    /// Add a file at a slash-separated path, creating directories as needed.
    ///
    /// A later file at the same path replaces the earlier one.
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return self;
        };

        let mut dir = &mut self.root;
        for segment in dirs {
            let slot = dir
                .entry(segment.to_string())
                .or_insert_with(|| Tree::Dir(BTreeMap::new()));
            if !matches!(slot, Tree::Dir(_)) {
                *slot = Tree::Dir(BTreeMap::new());
            }
            let Tree::Dir(children) = slot else {
                return self;
            };
            dir = children;
        }
        dir.insert(file_name.to_string(), Tree::File(data));
        self
    }

    /// Serialize the archive.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut nodes = vec![FlatNode {
            name: "",
            kind: NodeKind::Directory,
            parent: 0,
            end: 0,
            data: None,
        }];
        if self.dot_root {
            nodes.push(FlatNode {
                name: ".",
                kind: NodeKind::Directory,
                parent: 0,
                end: 0,
                data: None,
            });
            flatten(&self.root, 1, &mut nodes);
            nodes[1].end = nodes.len();
        } else {
            flatten(&self.root, 0, &mut nodes);
        }
        nodes[0].end = nodes.len();

        let mut strings = Vec::new();
        let mut name_offsets = Vec::with_capacity(nodes.len());
        for node in &nodes {
            name_offsets.push(strings.len() as u32);
            strings.extend_from_slice(node.name.as_bytes());
            strings.push(0);
        }

        let header_size = nodes.len() * NODE_SIZE + strings.len();
        let data_offset = align_up((HEADER_SIZE + header_size) as u64, DATA_ALIGNMENT) as usize;

        let mut cursor = data_offset;
        let mut records = Vec::with_capacity(nodes.len());
        for (node, &name_offset) in nodes.iter().zip(&name_offsets) {
            let (data_offset, size) = match node.data {
                Some(data) => {
                    let offset = cursor;
                    cursor = align_up((cursor + data.len()) as u64, DATA_ALIGNMENT) as usize;
                    (offset as u32, data.len() as u32)
                }
                None => (node.parent as u32, node.end as u32),
            };
            records.push(U8Node {
                kind: node.kind,
                name_offset,
                data_offset,
                size,
            });
        }

        let header = U8Header {
            root_node_offset: HEADER_SIZE as u32,
            header_size: header_size as u32,
            data_offset: data_offset as u32,
            reserved: [0; 16],
        };

        let mut out = Cursor::new(Vec::with_capacity(cursor));
        header.write(&mut out)?;
        for record in &records {
            record.write(&mut out)?;
        }
        let mut out = out.into_inner();
        out.extend_from_slice(&strings);
        out.resize(cursor.max(data_offset), 0);

        for (node, record) in nodes.iter().zip(&records) {
            if let Some(data) = node.data {
                let start = record.data_offset as usize;
                out[start..start + data.len()].copy_from_slice(data);
            }
        }

        Ok(out)
    }
}

fn flatten<'a>(dir: &'a BTreeMap<String, Tree>, parent: usize, out: &mut Vec<FlatNode<'a>>) {
    for (name, tree) in dir {
        match tree {
            Tree::File(data) => out.push(FlatNode {
                name: name.as_str(),
                kind: NodeKind::File,
                parent,
                end: 0,
                data: Some(data.as_slice()),
            }),
            Tree::Dir(children) => {
                let index = out.len();
                out.push(FlatNode {
                    name: name.as_str(),
                    kind: NodeKind::Directory,
                    parent,
                    end: 0,
                    data: None,
                });
                flatten(children, index, out);
                out[index].end = out.len();
            }
        }
    }
}
