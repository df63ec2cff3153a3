use crate::errors::CliError;
use camino::Utf8Path;
use miette::Result;
use u8_overlay::FsStorage;

pub mod config;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// Open `root` as override storage, failing if it is not a directory.
pub fn open_storage(root: &Utf8Path) -> Result<FsStorage> {
    if !root.as_std_path().is_dir() {
        return Err(CliError::StorageNotFound {
            path: root.to_path_buf(),
        }
        .into());
    }
    Ok(FsStorage::new(root.to_path_buf()))
}

/// Read a host file, mapping a missing file to its own diagnostic.
pub fn read_host_file(path: &Utf8Path) -> Result<Vec<u8>> {
    std::fs::read(path.as_std_path()).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::FileNotFound {
            path: path.to_string(),
        }
        .into(),
        _ => CliError::from(e).into(),
    })
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
