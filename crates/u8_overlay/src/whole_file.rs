//! Whole-file override resolution.
//!
//! Before an archive is even opened, the loader asks whether a complete loose
//! replacement exists for it. Two locations are tried under the override root:
//!
//! 1. the mirrored path: `/UI/Award.szs` → `<root>/UI/Award.szs`
//! 2. the flat path: `/UI/Award.szs` → `<root>/Award.szs`
//!
//! A redirect only means the candidate exists. Callers must still be ready for
//! the open to fail and fall back to the original path, which is what
//! [`read_with_fallback`] does.

use crate::path::{file_name, OverrideRoot};
use crate::storage::{read_to_vec, OverrideStorage};
use camino::Utf8Path;
use std::borrow::Cow;

/// Outcome of [`resolve_whole_file_override`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WholeFileResolution<'a> {
    /// The override path when redirected, otherwise the original path.
    pub path: Cow<'a, str>,
    pub redirected: bool,
}

impl<'a> WholeFileResolution<'a> {
    fn original(path: &'a str) -> Self {
        Self {
            path: Cow::Borrowed(path),
            redirected: false,
        }
    }
}

/// Resolve a whole-file override for `path`.
///
/// `capacity` is the size of the caller's path buffer. A candidate whose length
/// plus a terminator does not fit is never returned truncated: the resolver
/// fails closed and reports the original path, so an unintended file can never
/// be opened.
pub fn resolve_whole_file_override<'a, S: OverrideStorage + ?Sized>(
    root: &OverrideRoot,
    storage: &S,
    path: &'a str,
    capacity: usize,
) -> WholeFileResolution<'a> {
    let name = file_name(path);
    if name.is_empty() || root.is_under(path) {
        return WholeFileResolution::original(path);
    }

    let mirrored = root.join(path);
    let flat = root.join(name);
    let candidates = if mirrored == flat {
        vec![mirrored]
    } else {
        vec![mirrored, flat]
    };

    for candidate in candidates {
        if !storage.exists(Utf8Path::new(&candidate)) {
            continue;
        }
        if candidate.len() + 1 > capacity {
            tracing::warn!(
                "Whole-file override {} does not fit a {}-byte path buffer, keeping {}",
                candidate,
                capacity,
                path
            );
            return WholeFileResolution::original(path);
        }

        tracing::debug!("Whole-file override for {}: {}", path, candidate);
        return WholeFileResolution {
            path: Cow::Owned(candidate),
            redirected: true,
        };
    }

    WholeFileResolution::original(path)
}

/// Read the resolved file, falling back to `original` when a redirected path
/// cannot be read.
///
/// Returns the bytes together with the path they were read from.
pub fn read_with_fallback<'r, S: OverrideStorage + ?Sized>(
    storage: &S,
    resolution: &'r WholeFileResolution<'_>,
    original: &'r str,
) -> std::io::Result<(Vec<u8>, &'r str)> {
    if resolution.redirected {
        match read_to_vec(storage, Utf8Path::new(resolution.path.as_ref())) {
            Ok(bytes) => return Ok((bytes, resolution.path.as_ref())),
            Err(e) => tracing::warn!(
                "Failed to read whole-file override {} ({}), falling back to {}",
                resolution.path,
                e,
                original
            ),
        }
    }
    let bytes = read_to_vec(storage, Utf8Path::new(original))?;
    Ok((bytes, original))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, FsStorage, OverrideRoot) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("files/Mods/Race/Course")).unwrap();
        fs::create_dir_all(dir.path().join("UI")).unwrap();
        fs::create_dir_all(dir.path().join("Race/Course")).unwrap();
        fs::write(dir.path().join("files/Mods/Award.szs"), b"flat").unwrap();
        fs::write(
            dir.path().join("files/Mods/Race/Course/castle_course.szs"),
            b"mirrored",
        )
        .unwrap();
        fs::write(dir.path().join("UI/Award.szs"), b"original").unwrap();
        fs::write(dir.path().join("UI/Title.szs"), b"title").unwrap();

        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, FsStorage::new(root), OverrideRoot::new("/files/Mods", 256))
    }

    #[test]
    fn test_flat_override() {
        let (_dir, storage, root) = setup();
        let resolved = resolve_whole_file_override(&root, &storage, "/UI/Award.szs", 256);
        assert!(resolved.redirected);
        assert_eq!(resolved.path, "/files/Mods/Award.szs");
    }

    #[test]
    fn test_mirrored_override_preferred() {
        let (_dir, storage, root) = setup();
        let resolved =
            resolve_whole_file_override(&root, &storage, "/Race/Course/castle_course.szs", 256);
        assert!(resolved.redirected);
        assert_eq!(resolved.path, "/files/Mods/Race/Course/castle_course.szs");
    }

    #[test]
    fn test_no_override() {
        let (_dir, storage, root) = setup();
        let resolved = resolve_whole_file_override(&root, &storage, "/UI/Title.szs", 256);
        assert!(!resolved.redirected);
        assert_eq!(resolved.path, "/UI/Title.szs");
    }

    #[test]
    fn test_paths_under_root_are_not_redirected() {
        let (_dir, storage, root) = setup();
        let resolved = resolve_whole_file_override(&root, &storage, "/files/Mods/Award.szs", 256);
        assert!(!resolved.redirected);
    }

    #[test]
    fn test_fails_closed_when_buffer_too_small() {
        let (_dir, storage, root) = setup();
        // "/files/Mods/Award.szs" is 21 bytes and needs 22 with the terminator.
        let resolved = resolve_whole_file_override(&root, &storage, "/UI/Award.szs", 21);
        assert!(!resolved.redirected);
        assert_eq!(resolved.path, "/UI/Award.szs");

        let resolved = resolve_whole_file_override(&root, &storage, "/UI/Award.szs", 22);
        assert!(resolved.redirected);
    }

    #[test]
    fn test_read_with_fallback() {
        let (dir, storage, root) = setup();
        let resolved = resolve_whole_file_override(&root, &storage, "/UI/Award.szs", 256);
        let (bytes, from) = read_with_fallback(&storage, &resolved, "/UI/Award.szs").unwrap();
        assert_eq!(bytes, b"flat");
        assert_eq!(from, "/files/Mods/Award.szs");

        // Override vanishes after resolution: the original is used instead.
        fs::remove_file(dir.path().join("files/Mods/Award.szs")).unwrap();
        let (bytes, from) = read_with_fallback(&storage, &resolved, "/UI/Award.szs").unwrap();
        assert_eq!(bytes, b"original");
        assert_eq!(from, "/UI/Award.szs");
    }
}
