//! Override discovery and sizing.
//!
//! Enumeration is the first half of the two-pass protocol:
//!
//! 1. [`should_apply_loose_overrides`] decides cheaply whether an archive has
//!    any override directory at all. Most archives don't, and for those the
//!    rest of the pipeline is skipped.
//! 2. [`collect_overrides`] walks the override directory and keeps every loose
//!    file that matches an existing file entry of the archive. Files with no
//!    counterpart are ignored: the node table cannot grow, so new entries are
//!    unsupported.
//! 3. [`get_overrides_total_aligned`] sums the aligned payload sizes so the
//!    caller can grow the archive buffer exactly once, before any node is
//!    rewritten by the [patcher](crate::patcher). An override that replaces
//!    several entries reserves one aligned copy per entry, so no two file
//!    nodes ever share a data range.
//!
//! # Matching
//!
//! A loose file's path relative to the scanned directory is matched against
//! archive paths component by component, ignoring ASCII case; a leading `.`
//! directory in the archive is transparent. What a top-level file (no
//! directory part) matches depends on the [`OverrideLayout`]:
//!
//! - `Mirrored`: the entry of that name at the archive's top level.
//! - `Shared`: every file entry of that name anywhere in the archive. Names
//!   tagged with `.<ArchiveName>` only apply to that archive, with the tag
//!   stripped before matching.

use crate::config::{OverlayConfig, OverrideLayout};
use crate::path::{
    archive_base_name, has_extension_ignore_case, normalize_key, strip_extension,
};
use crate::storage::{find_dir_ignore_case, EntryKind, OverrideStorage};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::HashMap;
use u8_archive::{align_up, U8Archive};

/// Where to look for loose overrides of one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideScope {
    /// Normalized lower-case archive path without extension, e.g. `ui/award`.
    pub key: String,
    /// Archive file name without extension, used as the tag in shared layouts.
    pub tag: String,
    /// Directory to scan, with the on-storage spelling of every component.
    pub dir: Utf8PathBuf,
    pub layout: OverrideLayout,
}

/// What an override replaces inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveTarget {
    /// One entry at this archive-internal path.
    Path(String),
    /// Every file entry with this name.
    Name(String),
}

impl ArchiveTarget {
    /// Indices of the file nodes this target names in `archive`.
    pub fn resolve(&self, archive: &U8Archive) -> Vec<usize> {
        match self {
            ArchiveTarget::Path(path) => archive
                .find_path(path)
                .filter(|&index| archive.node(index).is_some_and(|n| n.is_file()))
                .into_iter()
                .collect(),
            ArchiveTarget::Name(name) => archive.find_files_named(name),
        }
    }
}

/// A loose file that replaces one or more archive entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    /// Virtual path of the loose file.
    pub source: Utf8PathBuf,
    /// Path of the loose file relative to the scanned directory.
    pub relative_path: String,
    pub target: ArchiveTarget,
    /// Payload size in bytes at enumeration time.
    pub size: u32,
    /// Number of file nodes `target` resolved to at enumeration time.
    pub node_count: usize,
    /// Whether the file name carried this archive's tag.
    pub tagged: bool,
}

impl OverrideEntry {
    pub fn aligned_size(&self, alignment: u64) -> u64 {
        align_up(u64::from(self.size), alignment)
    }

    /// Tail bytes this override occupies: one aligned copy per target node.
    pub fn reserved_size(&self, alignment: u64) -> u64 {
        self.aligned_size(alignment) * self.node_count as u64
    }
}

/// Overrides collected for one archive, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    pub archive_key: String,
    pub alignment: u64,
    entries: Vec<OverrideEntry>,
}

impl OverrideSet {
    pub fn new(archive_key: String, alignment: u64, entries: Vec<OverrideEntry>) -> Self {
        Self {
            archive_key,
            alignment,
            entries,
        }
    }

    pub fn entries(&self) -> &[OverrideEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OverrideEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extra storage needed to append every override of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideTotals {
    /// Sum of the payload sizes, each rounded up to `alignment` and counted
    /// once per target node.
    pub total_aligned: u64,
    /// Number of overrides that will be applied.
    pub applicable: usize,
    pub alignment: u64,
}

impl OverrideTotals {
    /// Exact buffer length the patcher needs for an archive of `base_size`
    /// bytes.
    ///
    /// Payloads are appended from the first aligned offset at or after
    /// `base_size`; for an aligned base this is `base_size + total_aligned`.
    pub fn required_len(&self, base_size: usize) -> u64 {
        if self.applicable == 0 {
            return base_size as u64;
        }
        align_up(base_size as u64, self.alignment) + self.total_aligned
    }
}

/// Decide whether `archive_path` can have loose overrides at all.
///
/// Returns `None` when the path is itself under the override root, does not
/// carry the configured archive extension, or has no override directory.
pub fn should_apply_loose_overrides<S: OverrideStorage + ?Sized>(
    config: &OverlayConfig,
    storage: &S,
    archive_path: &str,
) -> Option<OverrideScope> {
    let root = config.override_root();
    if root.is_under(archive_path) {
        tracing::trace!("{} is inside the override root, skipping", archive_path);
        return None;
    }
    if !has_extension_ignore_case(archive_path, &config.archive_extension) {
        return None;
    }

    let stem = strip_extension(archive_path);
    let key = normalize_key(stem);
    if key.is_empty() {
        return None;
    }

    let root_dir = Utf8Path::new(root.as_str());
    let dir = match config.layout {
        OverrideLayout::Mirrored => {
            let components: Vec<&str> = stem.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
            find_dir_ignore_case(storage, root_dir, &components)?
        }
        OverrideLayout::Shared => {
            if !storage.is_dir(root_dir) {
                return None;
            }
            root_dir.to_path_buf()
        }
    };

    if dir.as_str().len() + 1 > config.max_path {
        tracing::warn!("Override directory {} exceeds max path length", dir);
        return None;
    }

    tracing::debug!("Loose overrides enabled for {} from {}", archive_path, dir);
    Some(OverrideScope {
        key,
        tag: archive_base_name(archive_path).to_string(),
        dir,
        layout: config.layout,
    })
}

/// Walk the scope directory and keep the loose files that match an existing
/// file entry of `archive`.
pub fn collect_overrides<S: OverrideStorage + ?Sized>(
    config: &OverlayConfig,
    storage: &S,
    scope: &OverrideScope,
    archive: &U8Archive,
) -> OverrideSet {
    let mut files = Vec::new();
    scan_dir(config, storage, &scope.dir, "", &mut files);

    let mut entries: Vec<OverrideEntry> = Vec::new();
    // Sorted target node indices -> position in `entries`.
    let mut claimed: HashMap<Vec<usize>, usize> = HashMap::new();

    for (source, relative_path) in files {
        let Some((target, tagged)) = match_file(scope, &relative_path) else {
            continue;
        };

        let mut nodes = target.resolve(archive);
        if nodes.is_empty() {
            tracing::debug!(
                "No file entry for override {} in {}",
                relative_path,
                scope.key
            );
            continue;
        }
        nodes.sort_unstable();

        let size = match storage.size(&source) {
            Ok(0) => {
                tracing::debug!("Skipping empty override {}", source);
                continue;
            }
            Ok(size) => match u32::try_from(size) {
                Ok(size) => size,
                Err(_) => {
                    tracing::warn!("Override {} is too large ({} bytes)", source, size);
                    continue;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read size for override {}: {}", source, e);
                continue;
            }
        };

        let entry = OverrideEntry {
            source,
            relative_path,
            target,
            size,
            node_count: nodes.len(),
            tagged,
        };

        if let Some(&existing) = claimed.get(&nodes) {
            if entry.tagged && !entries[existing].tagged {
                tracing::debug!(
                    "Tagged override {} replaces {}",
                    entry.source,
                    entries[existing].source
                );
                entries[existing] = entry;
            } else {
                tracing::debug!(
                    "Override {} duplicates {}, ignoring",
                    entry.source,
                    entries[existing].source
                );
            }
            continue;
        }

        if entries.len() >= config.max_overrides {
            tracing::warn!(
                "Override cap reached ({}) for {}, skipping {}",
                config.max_overrides,
                scope.key,
                entry.source
            );
            break;
        }

        claimed.insert(nodes, entries.len());
        entries.push(entry);
    }

    tracing::debug!(
        "Override scan complete for {}: {} matching file(s)",
        scope.key,
        entries.len()
    );

    OverrideSet::new(scope.key.clone(), config.alignment(), entries)
}

/// Sum the tail space reserved by every override of `set`.
pub fn get_overrides_total_aligned(set: &OverrideSet) -> OverrideTotals {
    OverrideTotals {
        total_aligned: set.iter().map(|e| e.reserved_size(set.alignment)).sum(),
        applicable: set.len(),
        alignment: set.alignment,
    }
}

/// Recursively list files under `dir` as `(virtual path, relative path)`.
fn scan_dir<S: OverrideStorage + ?Sized>(
    config: &OverlayConfig,
    storage: &S,
    dir: &Utf8Path,
    relative: &str,
    out: &mut Vec<(Utf8PathBuf, String)>,
) {
    let entries = match storage.list_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to list override directory {}: {}", dir, e);
            return;
        }
    };

    for entry in entries {
        if entry.name.len() > config.max_name {
            tracing::warn!("Override name too long: {}/{}", dir, entry.name);
            continue;
        }
        let child = Utf8PathBuf::from(format!("{}/{}", dir, entry.name));
        let child_relative = if relative.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", relative, entry.name)
        };
        if child.as_str().len() + 1 > config.max_path {
            tracing::warn!("Override path too long: {}", child);
            continue;
        }

        match entry.kind {
            EntryKind::Directory => scan_dir(config, storage, &child, &child_relative, out),
            EntryKind::File => out.push((child, child_relative)),
        }
    }
}

/// Map a relative override path to its archive target.
fn match_file(scope: &OverrideScope, relative_path: &str) -> Option<(ArchiveTarget, bool)> {
    let (dir_part, name) = match relative_path.rfind('/') {
        Some(slash) => (Some(&relative_path[..slash]), &relative_path[slash + 1..]),
        None => (None, relative_path),
    };

    let (name, tagged) = match scope.layout {
        OverrideLayout::Shared => strip_tag(name, &scope.tag),
        OverrideLayout::Mirrored => (name, false),
    };
    if name.is_empty() {
        return None;
    }

    let target = match (dir_part, scope.layout) {
        (Some(dir), _) => ArchiveTarget::Path(format!("{}/{}", dir, name)),
        (None, OverrideLayout::Mirrored) => ArchiveTarget::Path(name.to_string()),
        (None, OverrideLayout::Shared) => ArchiveTarget::Name(name.to_string()),
    };
    Some((target, tagged))
}

/// Strip a trailing `.<tag>` from `name`, ignoring ASCII case.
fn strip_tag<'a>(name: &'a str, tag: &str) -> (&'a str, bool) {
    if tag.is_empty() || name.len() <= tag.len() + 1 {
        return (name, false);
    }
    let split = name.len() - tag.len();
    if !name.is_char_boundary(split) {
        return (name, false);
    }
    let (head, suffix) = name.split_at(split);
    match head.strip_suffix('.') {
        Some(stripped) if suffix.eq_ignore_ascii_case(tag) => (stripped, true),
        _ => (name, false),
    }
}
