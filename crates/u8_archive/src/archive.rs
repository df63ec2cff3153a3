//! Parsed view of a U8 archive held in memory.
//!
//! [`U8Archive::parse`] decodes the header, node table and string table from a
//! byte buffer and checks every tree invariant up front, so lookups afterwards
//! can index freely. The view does not borrow the buffer: callers that need to
//! rewrite file extents pass the same buffer back to
//! [`set_file_extent`](U8Archive::set_file_extent), which bounds-checks the
//! write against the slice it is given.

use crate::error::{ArchiveError, Result};
use crate::header::{NodeKind, U8Header, U8Node, NODE_SIZE};
use binrw::BinRead;
use byteorder::{BigEndian, ByteOrder};
use std::io::Cursor;

/// Decoded directory of a U8 archive.
#[derive(Debug, Clone)]
pub struct U8Archive {
    header: U8Header,
    nodes: Vec<U8Node>,
    names: Vec<String>,
    buffer_len: usize,
}

/// A node together with its full path inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    pub index: usize,
    /// Slash-separated path from the root, e.g. `./blyt/award.brlyt`.
    pub path: String,
    pub name: &'a str,
    pub kind: NodeKind,
    pub data_offset: u32,
    pub size: u32,
}

impl U8Archive {
    /// Parse and validate the directory of the archive stored in `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = U8Header::read(&mut cursor)?;

        let table_start = u64::from(header.root_node_offset);
        ensure_len(data, table_start + NODE_SIZE as u64)?;
        cursor.set_position(table_start);

        let root = U8Node::read(&mut cursor)?;
        if !root.is_dir() {
            return Err(ArchiveError::InvalidRoot(
                "root node is not a directory".to_string(),
            ));
        }
        let count = root.size as usize;
        if count == 0 {
            return Err(ArchiveError::InvalidRoot(
                "root declares zero nodes".to_string(),
            ));
        }

        let table_end = table_start + count as u64 * NODE_SIZE as u64;
        ensure_len(data, table_end)?;
        let strings_end = table_start + u64::from(header.header_size);
        if strings_end < table_end {
            return Err(ArchiveError::InvalidRoot(format!(
                "header size {:#x} is smaller than the node table ({} nodes)",
                header.header_size, count
            )));
        }
        ensure_len(data, strings_end)?;

        let mut nodes = Vec::with_capacity(count);
        nodes.push(root);
        for _ in 1..count {
            nodes.push(U8Node::read(&mut cursor)?);
        }

        let strings = &data[table_end as usize..strings_end as usize];
        let names = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| read_name(strings, index, node.name_offset))
            .collect::<Result<Vec<_>>>()?;

        let archive = Self {
            header,
            nodes,
            names,
            buffer_len: data.len(),
        };
        archive.validate()?;

        tracing::trace!(
            "Parsed U8 archive: {} nodes, data offset {:#x}, buffer {:#x}",
            archive.nodes.len(),
            archive.header.data_offset,
            archive.buffer_len
        );

        Ok(archive)
    }

    /// Check nesting, parent links and file ranges for every node.
    fn validate(&self) -> Result<()> {
        let count = self.nodes.len();
        // Ends of the directories enclosing the current node, innermost last.
        let mut open_dirs = vec![count];

        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            while open_dirs.last().is_some_and(|&end| end <= index) {
                open_dirs.pop();
            }
            let enclosing_end = open_dirs.last().copied().unwrap_or(count);

            match node.kind {
                NodeKind::Directory => {
                    let end = node.size as usize;
                    if end <= index || end > enclosing_end {
                        return Err(ArchiveError::InvalidNode {
                            index,
                            reason: format!(
                                "directory end {} outside ({}, {}]",
                                end, index, enclosing_end
                            ),
                        });
                    }
                    if node.data_offset as usize >= index {
                        return Err(ArchiveError::InvalidNode {
                            index,
                            reason: format!("parent {} does not precede node", node.data_offset),
                        });
                    }
                    open_dirs.push(end);
                }
                NodeKind::File => check_file_range(index, node, self.buffer_len)?,
            }
        }

        Ok(())
    }

    pub fn header(&self) -> &U8Header {
        &self.header
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a parsed archive; the root node is mandatory.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length of the buffer the archive was parsed from.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn nodes(&self) -> &[U8Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&U8Node> {
        self.nodes.get(index)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate the direct children of directory `dir`.
    ///
    /// Yields nothing if `dir` is out of range or is a file.
    pub fn children(&self, dir: usize) -> Children<'_> {
        let end = match self.nodes.get(dir) {
            Some(node) if node.is_dir() => node.size as usize,
            _ => 0,
        };
        Children {
            nodes: &self.nodes,
            next: dir + 1,
            end,
        }
    }

    /// Find a direct child of `dir` by name, ignoring ASCII case.
    pub fn find_child(&self, dir: usize, name: &str) -> Option<usize> {
        self.children(dir)
            .find(|&index| self.names[index].eq_ignore_ascii_case(name))
    }

    /// Resolve a slash-separated path to a node index, ignoring ASCII case.
    ///
    /// Most archives keep their content under a single `.` directory; when the
    /// path does not resolve from the root it is retried from that directory, so
    /// `blyt/award.brlyt` and `./blyt/award.brlyt` find the same node.
    pub fn find_path(&self, path: &str) -> Option<usize> {
        let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }

        self.walk(0, &segments)
            .or_else(|| {
                let dot = self.find_child(0, ".")?;
                self.walk(dot, &segments)
            })
            .or_else(|| match segments.split_first() {
                Some((&".", rest)) => self.walk(0, rest),
                _ => None,
            })
    }

    fn walk(&self, mut dir: usize, segments: &[&str]) -> Option<usize> {
        let (last, parents) = segments.split_last()?;
        for segment in parents {
            let child = self.find_child(dir, segment)?;
            if !self.nodes[child].is_dir() {
                return None;
            }
            dir = child;
        }
        self.find_child(dir, last)
    }

    /// All file nodes whose name equals `name`, ignoring ASCII case.
    pub fn find_files_named(&self, name: &str) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(index, node)| node.is_file() && self.names[*index].eq_ignore_ascii_case(name))
            .map(|(index, _)| index)
            .collect()
    }

    /// Every node except the root, in table order, with its full path.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut open_dirs: Vec<(usize, String)> = vec![(self.nodes.len(), String::new())];

        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            while open_dirs.last().is_some_and(|(end, _)| *end <= index) {
                open_dirs.pop();
            }
            let name = self.names[index].as_str();
            let path = match open_dirs.last() {
                Some((_, prefix)) if !prefix.is_empty() => format!("{}/{}", prefix, name),
                _ => name.to_string(),
            };
            if node.is_dir() {
                open_dirs.push((node.size as usize, path.clone()));
            }
            entries.push(Entry {
                index,
                path,
                name,
                kind: node.kind,
                data_offset: node.data_offset,
                size: node.size,
            });
        }

        entries
    }

    /// Borrow the data of file node `index` from `buffer`.
    pub fn file_data<'b>(&self, buffer: &'b [u8], index: usize) -> Option<&'b [u8]> {
        let node = self.nodes.get(index).filter(|n| n.is_file())?;
        let start = node.data_offset as usize;
        buffer.get(start..start.checked_add(node.size as usize)?)
    }

    /// Rewrite the offset and size of file node `index` in `buffer`.
    ///
    /// `buffer` must be the archive this view was parsed from, possibly grown at
    /// its tail. The new range must lie inside `buffer`.
    pub fn set_file_extent(
        &mut self,
        buffer: &mut [u8],
        index: usize,
        offset: u64,
        size: u32,
    ) -> Result<()> {
        let count = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(ArchiveError::NodeIndexOutOfRange { index, count })?;
        if !node.is_file() {
            return Err(ArchiveError::NotAFile(index));
        }

        let offset32 = u32::try_from(offset).map_err(|_| ArchiveError::OffsetOverflow(offset))?;
        let end = offset + u64::from(size);
        if end > buffer.len() as u64 {
            return Err(ArchiveError::FileOutOfBounds {
                index,
                offset,
                size: u64::from(size),
                len: buffer.len(),
            });
        }

        let record = self.header.root_node_offset as usize + index * NODE_SIZE;
        let available = buffer.len();
        let fields = buffer
            .get_mut(record + 4..record + NODE_SIZE)
            .ok_or(ArchiveError::Truncated {
                needed: (record + NODE_SIZE) as u64,
                available,
            })?;
        BigEndian::write_u32(&mut fields[0..4], offset32);
        BigEndian::write_u32(&mut fields[4..8], size);

        node.data_offset = offset32;
        node.size = size;
        self.buffer_len = self.buffer_len.max(available);
        Ok(())
    }
}

/// Iterator over the direct children of a directory node.
pub struct Children<'a> {
    nodes: &'a [U8Node],
    next: usize,
    end: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        let node = self.nodes.get(index)?;
        // Skip the whole subtree of a nested directory.
        self.next = if node.is_dir() {
            (node.size as usize).max(index + 1)
        } else {
            index + 1
        };
        Some(index)
    }
}

fn ensure_len(data: &[u8], needed: u64) -> Result<()> {
    if needed > data.len() as u64 {
        return Err(ArchiveError::Truncated {
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn read_name(strings: &[u8], index: usize, offset: u32) -> Result<String> {
    let tail = strings
        .get(offset as usize..)
        .ok_or(ArchiveError::NameOutOfRange { index, offset })?;
    let len = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ArchiveError::NameOutOfRange { index, offset })?;
    Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
}

fn check_file_range(index: usize, node: &U8Node, len: usize) -> Result<()> {
    let offset = u64::from(node.data_offset);
    let size = u64::from(node.size);
    if offset + size > len as u64 {
        return Err(ArchiveError::FileOutOfBounds {
            index,
            offset,
            size,
            len,
        });
    }
    Ok(())
}
