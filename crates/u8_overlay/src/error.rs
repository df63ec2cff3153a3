//! Error types for overlay operations.
//!
//! Only failures the caller must act on are errors here. An archive with no
//! overrides, or an override that disappears before it can be copied, is
//! reported through `Option` results and [`AppliedOverrideStats`] counters
//! instead.
//!
//! [`AppliedOverrideStats`]: crate::patcher::AppliedOverrideStats

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or applying an overlay.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed outside of a single override's copy.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive buffer could not be parsed or a node write was rejected.
    #[error("Archive error: {0}")]
    Archive(#[from] u8_archive::ArchiveError),

    /// The overlay configuration file is not valid TOML for [`OverlayConfig`](crate::OverlayConfig).
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The overlay configuration holds an unusable value.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The caller did not grow the archive buffer by the reserved tail size.
    #[error("Insufficient tail space: patching needs a {required:#x}-byte buffer, got {available:#x}")]
    InsufficientTailSpace { required: u64, available: usize },

    /// The totals passed to the patcher were not computed from the same override set.
    #[error("Override totals do not match the override set ({expected} entries, got {actual})")]
    StaleTotals { expected: usize, actual: usize },
}
