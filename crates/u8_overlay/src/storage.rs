//! Storage access abstraction.
//!
//! This module defines the [`OverrideStorage`] trait that decouples the overlay
//! components from wherever loose files actually live (an SD card, a host
//! directory, a disc image). Implementations answer existence/size queries,
//! list directories, and open files for reading; every method works on
//! virtual `/`-rooted paths.
//!
//! The crate ships [`FsStorage`], which maps the virtual root onto a host
//! directory.
//!
//! Callers in this crate treat any storage failure for a single override as
//! "override not applicable" and never surface it as a hard error.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::{self, Read};

/// Whether a directory entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Read-only access to the storage holding loose override files.
pub trait OverrideStorage {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Utf8Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Utf8Path) -> bool;

    /// Size in bytes of the file at `path`.
    fn size(&self, path: &Utf8Path) -> io::Result<u64>;

    /// Open the file at `path` for reading.
    ///
    /// The handle is dropped by the caller as soon as the read completes.
    fn open_read(&self, path: &Utf8Path) -> io::Result<Box<dyn Read + '_>>;

    /// List the entries of the directory at `path`, sorted by name, excluding
    /// `.` and `..`.
    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>>;
}

impl<S: OverrideStorage + ?Sized> OverrideStorage for &S {
    fn exists(&self, path: &Utf8Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        (**self).is_dir(path)
    }

    fn size(&self, path: &Utf8Path) -> io::Result<u64> {
        (**self).size(path)
    }

    fn open_read(&self, path: &Utf8Path) -> io::Result<Box<dyn Read + '_>> {
        (**self).open_read(path)
    }

    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        (**self).list_dir(path)
    }
}

/// Read exactly `dest.len()` bytes from the file at `path`.
///
/// A file shorter than `dest` is an [`io::ErrorKind::UnexpectedEof`] error.
pub fn read_exact_into<S: OverrideStorage + ?Sized>(
    storage: &S,
    path: &Utf8Path,
    dest: &mut [u8],
) -> io::Result<()> {
    let mut reader = storage.open_read(path)?;
    reader.read_exact(dest)
}

/// Read the whole file at `path`.
pub fn read_to_vec<S: OverrideStorage + ?Sized>(storage: &S, path: &Utf8Path) -> io::Result<Vec<u8>> {
    let mut reader = storage.open_read(path)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Find the directory `base/components...`, matching each component ignoring
/// ASCII case when the exact spelling does not exist.
pub fn find_dir_ignore_case<S: OverrideStorage + ?Sized>(
    storage: &S,
    base: &Utf8Path,
    components: &[&str],
) -> Option<Utf8PathBuf> {
    if !storage.is_dir(base) {
        return None;
    }

    let mut current = base.to_path_buf();
    for component in components {
        let exact = current.join(component);
        if storage.is_dir(&exact) {
            current = exact;
            continue;
        }

        let entries = storage.list_dir(&current).ok()?;
        let found = entries.into_iter().find(|entry| {
            entry.kind == EntryKind::Directory && entry.name.eq_ignore_ascii_case(component)
        })?;
        current = current.join(found.name);
    }
    Some(current)
}

/// Filesystem-backed storage.
///
/// Virtual paths are resolved against a host directory standing in for the
/// virtual `/`, so `/files/Mods/UI/Award/award.brlyt` is read from
/// `<host_root>/files/Mods/UI/Award/award.brlyt`. Paths containing `..` are
/// rejected so nothing outside the host root is ever reached.
pub struct FsStorage {
    host_root: Utf8PathBuf,
}

impl FsStorage {
    pub fn new(host_root: Utf8PathBuf) -> Self {
        Self { host_root }
    }

    pub fn host_root(&self) -> &Utf8Path {
        &self.host_root
    }

    fn host_path(&self, path: &Utf8Path) -> io::Result<Utf8PathBuf> {
        let relative = path.as_str().trim_start_matches(['/', '\\']);
        if relative.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes the storage root: {}", path),
            ));
        }
        Ok(self.host_root.join(relative))
    }
}

impl OverrideStorage for FsStorage {
    fn exists(&self, path: &Utf8Path) -> bool {
        self.host_path(path).is_ok_and(|p| p.as_std_path().exists())
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        self.host_path(path).is_ok_and(|p| p.as_std_path().is_dir())
    }

    fn size(&self, path: &Utf8Path) -> io::Result<u64> {
        let metadata = std::fs::metadata(self.host_path(path)?.as_std_path())?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: {}", path),
            ));
        }
        Ok(metadata.len())
    }

    fn open_read(&self, path: &Utf8Path) -> io::Result<Box<dyn Read + '_>> {
        let file = std::fs::File::open(self.host_path(path)?.as_std_path())?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<DirEntry>> {
        let dir = self.host_path(path)?;
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir.as_std_path())? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    tracing::warn!("Skipping non-UTF-8 entry {:?} in {}", name, path);
                    continue;
                }
            };
            if name == "." || name == ".." {
                continue;
            }
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn storage_with_tree() -> (tempfile::TempDir, FsStorage) {
        let dir = tempdir().unwrap();
        let mods = dir.path().join("files/Mods/UI/Award");
        fs::create_dir_all(&mods).unwrap();
        fs::write(mods.join("award.brlyt"), b"layout").unwrap();
        fs::write(dir.path().join("files/Mods/readme.txt"), b"hello").unwrap();

        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, FsStorage::new(root))
    }

    #[test]
    fn test_fs_exists_and_size() {
        let (_dir, storage) = storage_with_tree();
        assert!(storage.exists(Utf8Path::new("/files/Mods/readme.txt")));
        assert!(storage.is_dir(Utf8Path::new("/files/Mods/UI")));
        assert!(!storage.is_dir(Utf8Path::new("/files/Mods/readme.txt")));
        assert_eq!(storage.size(Utf8Path::new("/files/Mods/readme.txt")).unwrap(), 5);
        assert!(storage.size(Utf8Path::new("/files/Mods/UI")).is_err());
        assert!(storage.size(Utf8Path::new("/files/Mods/missing")).is_err());
    }

    #[test]
    fn test_fs_list_dir_sorted() {
        let (_dir, storage) = storage_with_tree();
        let entries = storage.list_dir(Utf8Path::new("/files/Mods")).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "UI".to_string(),
                    kind: EntryKind::Directory
                },
                DirEntry {
                    name: "readme.txt".to_string(),
                    kind: EntryKind::File
                },
            ]
        );
    }

    #[test]
    fn test_fs_rejects_parent_components() {
        let (_dir, storage) = storage_with_tree();
        assert!(!storage.exists(Utf8Path::new("/files/../files/Mods/readme.txt")));
        assert!(storage.open_read(Utf8Path::new("/../etc/passwd")).is_err());
    }

    #[test]
    fn test_read_exact_into_short_file() {
        let (_dir, storage) = storage_with_tree();
        let mut buf = [0u8; 8];
        let err = read_exact_into(&storage, Utf8Path::new("/files/Mods/readme.txt"), &mut buf)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut buf = [0u8; 5];
        read_exact_into(&storage, Utf8Path::new("/files/Mods/readme.txt"), &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_find_dir_ignore_case() {
        let (_dir, storage) = storage_with_tree();
        let found = find_dir_ignore_case(&storage, Utf8Path::new("/files/Mods"), &["ui", "AWARD"]);
        assert_eq!(found, Some(Utf8PathBuf::from("/files/Mods/UI/Award")));
        assert!(find_dir_ignore_case(&storage, Utf8Path::new("/files/Mods"), &["ui", "race"]).is_none());
        assert!(find_dir_ignore_case(&storage, Utf8Path::new("/missing"), &[]).is_none());
    }
}
