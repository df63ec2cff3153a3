use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(config::not_found),
        help("Run 'u8-overlay config init' to create an overlay.toml, or pass --config with an existing file")
    )]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Invalid configuration file: {path}")]
    #[diagnostic(
        code(config::invalid),
        help("Check overlay.toml for syntax errors; alignment must be a power of two")
    )]
    ConfigInvalid {
        path: Utf8PathBuf,
        #[source]
        source: u8_overlay::Error,
    },

    #[error("Configuration file already exists: {path}")]
    #[diagnostic(
        code(config::exists),
        help("Pass --force to overwrite it with the defaults")
    )]
    ConfigExists { path: Utf8PathBuf },

    #[error("Storage root not found: {path}")]
    #[diagnostic(
        code(storage::not_found),
        help("Point --storage at the directory that stands in for the virtual '/'")
    )]
    StorageNotFound { path: Utf8PathBuf },

    #[error("File not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    FileNotFound { path: String },

    #[error("Not a valid U8 archive: {path}")]
    #[diagnostic(
        code(archive::invalid),
        help("Overrides are applied to decompressed archives. Decompress Yaz0 (.szs) files first")
    )]
    InvalidArchive {
        path: String,
        #[source]
        source: u8_archive::ArchiveError,
    },

    #[error("Overlay failed for {path}")]
    #[diagnostic(code(overlay::failed))]
    Overlay {
        path: String,
        #[source]
        source: u8_overlay::Error,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_invalid(path: Utf8PathBuf, source: u8_overlay::Error) -> Self {
        Self::ConfigInvalid { path, source }
    }

    pub fn invalid_archive(path: impl Into<String>, source: u8_archive::ArchiveError) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            source,
        }
    }

    /// Map a library error for `path`, surfacing archive and missing-file
    /// failures with their own diagnostics.
    pub fn overlay(path: impl Into<String>, source: u8_overlay::Error) -> Self {
        let path = path.into();
        match source {
            u8_overlay::Error::Archive(source) => Self::InvalidArchive { path, source },
            u8_overlay::Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound { path }
            }
            source => Self::Overlay { path, source },
        }
    }
}
