//! Loose-file overlay for U8 archives.
//!
//! Game assets ship packed in U8 archives. This crate lets modified files
//! placed on external storage take precedence without rebuilding the archives:
//!
//! - **Whole-file overrides**: a complete replacement archive under the
//!   override root is loaded instead of the original.
//! - **Loose overrides**: individual files mirrored under the override root
//!   are copied into the tail of the decompressed archive buffer, and the
//!   matching file nodes are pointed at them.
//!
//! Loose overrides follow a two-pass protocol. The enumerator sizes the set
//! first so the caller can grow the buffer exactly once, then the patcher
//! appends the payloads and rewrites node extents. The node table itself is
//! never restructured, so only entries the archive already has can be
//! replaced.
//!
//! # Example
//!
//! ```no_run
//! use u8_overlay::{FsStorage, OverlayConfig, OverlayLoader};
//! use camino::Utf8PathBuf;
//!
//! # fn main() -> u8_overlay::Result<()> {
//! let storage = FsStorage::new(Utf8PathBuf::from("/mnt/sd"));
//! let loader = OverlayLoader::new(OverlayConfig::default(), storage)?;
//!
//! let outcome = loader.load("/UI/Award.szs")?;
//! if let Some(report) = outcome.report {
//!     println!(
//!         "Applied {} override(s), {} extra bytes",
//!         report.stats.applied_overrides, report.totals.total_aligned
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod enumerator;
pub mod error;
pub mod loader;
pub mod patcher;
pub mod path;
pub mod storage;
pub mod whole_file;

pub use config::{OverlayConfig, OverrideLayout};
pub use enumerator::{
    collect_overrides, get_overrides_total_aligned, should_apply_loose_overrides, ArchiveTarget,
    OverrideEntry, OverrideScope, OverrideSet, OverrideTotals,
};
pub use error::{Error, Result};
pub use loader::{OverlayLoader, OverlayOutcome, OverlayPlan, OverlayReport};
pub use patcher::{apply_loose_overrides, AppliedOverrideStats};
pub use path::OverrideRoot;
pub use storage::{FsStorage, OverrideStorage};
pub use whole_file::{read_with_fallback, resolve_whole_file_override, WholeFileResolution};
