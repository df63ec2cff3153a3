//! Archive node patching.
//!
//! The second half of the two-pass protocol. The caller has already grown the
//! archive buffer to [`OverrideTotals::required_len`]; this module copies each
//! override into that tail and points the matching file nodes at it. An
//! override that replaces several entries is copied once per entry, so file
//! ranges stay disjoint. The node table keeps its count, order and nesting:
//! only the offset and size fields of file records are rewritten.

use crate::enumerator::{get_overrides_total_aligned, OverrideSet, OverrideTotals};
use crate::error::{Error, Result};
use crate::storage::{read_exact_into, OverrideStorage};
use serde::Serialize;
use u8_archive::{align_up, U8Archive};

/// Counters reported by one patching pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOverrideStats {
    /// Overrides copied into the archive.
    pub applied_overrides: usize,
    /// File nodes rewritten. Exceeds `applied_overrides` when one override
    /// replaces several entries.
    pub patched_nodes: usize,
    /// Overrides that could not be read or whose target vanished.
    pub missing_overrides: usize,
    /// Aligned bytes of the tail consumed by applied overrides.
    pub bytes_appended: u64,
}

/// Append every override of `set` to the tail of `buffer` and repoint the
/// matching file nodes.
///
/// `buffer[..base_size]` must hold the original archive, and `buffer` must be
/// at least `totals.required_len(base_size)` bytes long; otherwise
/// [`Error::InsufficientTailSpace`] is returned before anything is written.
/// `totals` must come from [`get_overrides_total_aligned`] on the same set.
///
/// An override whose source can no longer be read is counted in
/// `missing_overrides` and its nodes keep their original data.
///
/// Appending always starts at the first aligned offset after `base_size`, so
/// running the pass again on an already patched buffer rewrites the same
/// offsets and leaves the buffer unchanged.
pub fn apply_loose_overrides<S: OverrideStorage + ?Sized>(
    storage: &S,
    buffer: &mut [u8],
    base_size: usize,
    set: &OverrideSet,
    totals: &OverrideTotals,
) -> Result<AppliedOverrideStats> {
    if get_overrides_total_aligned(set) != *totals {
        return Err(Error::StaleTotals {
            expected: set.len(),
            actual: totals.applicable,
        });
    }

    let required = totals.required_len(base_size);
    if base_size > buffer.len() || (buffer.len() as u64) < required {
        return Err(Error::InsufficientTailSpace {
            required,
            available: buffer.len(),
        });
    }

    let mut stats = AppliedOverrideStats::default();
    if set.is_empty() {
        return Ok(stats);
    }

    // Nodes of a buffer patched before point into the tail, so the whole
    // buffer is parsed, not just the base archive.
    let mut archive = U8Archive::parse(buffer)?;
    let mut cursor = align_up(base_size as u64, set.alignment);

    for entry in set.iter() {
        let nodes = entry.target.resolve(&archive);
        if nodes.len() != entry.node_count {
            tracing::warn!(
                "Override target for {} changed in {}: {} node(s), expected {}",
                entry.relative_path,
                set.archive_key,
                nodes.len(),
                entry.node_count
            );
            stats.missing_overrides += 1;
            continue;
        }

        let size = entry.size as usize;
        let aligned = entry.aligned_size(set.alignment) as usize;
        let reserved = entry.reserved_size(set.alignment);
        let start = cursor as usize;
        let Some(region) = buffer.get_mut(start..start + reserved as usize) else {
            return Err(Error::InsufficientTailSpace {
                required: cursor + reserved,
                available: buffer.len(),
            });
        };

        if let Err(e) = read_source(storage, &entry.source, entry.size, &mut region[..size]) {
            tracing::warn!("Failed to read override {}: {}", entry.source, e);
            region.fill(0);
            stats.missing_overrides += 1;
            continue;
        }
        region[size..aligned].fill(0);
        for copy in 1..nodes.len() {
            region.copy_within(..aligned, copy * aligned);
        }

        for (copy, &index) in nodes.iter().enumerate() {
            let offset = cursor + (copy * aligned) as u64;
            archive.set_file_extent(buffer, index, offset, entry.size)?;
        }
        tracing::info!(
            "Applied override {} -> {} ({} bytes, {} node(s), offset {:#x})",
            entry.source,
            set.archive_key,
            entry.size,
            nodes.len(),
            cursor
        );

        stats.applied_overrides += 1;
        stats.patched_nodes += nodes.len();
        stats.bytes_appended += reserved;
        cursor += reserved;
    }

    Ok(stats)
}

/// Copy exactly `expected` bytes of `path` into `dest`, refusing a source whose
/// size changed since enumeration.
fn read_source<S: OverrideStorage + ?Sized>(
    storage: &S,
    path: &camino::Utf8Path,
    expected: u32,
    dest: &mut [u8],
) -> std::io::Result<()> {
    let actual = storage.size(path)?;
    if actual != u64::from(expected) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("size changed from {} to {} bytes", expected, actual),
        ));
    }
    read_exact_into(storage, path, dest)
}
