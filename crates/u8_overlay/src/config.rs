//! Overlay configuration.
//!
//! The configuration is read once (from TOML or defaults) and then passed by
//! reference to every component; nothing in the crate keeps it in a global.
//!
//! ```toml
//! root = "/files/Mods"
//! layout = "mirrored"
//! archive_extension = ".szs"
//! alignment = 32
//! ```

use crate::error::{Error, Result};
use crate::path::OverrideRoot;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Default override root on the game's virtual filesystem.
pub const DEFAULT_ROOT: &str = "/files/Mods";

/// Container extension of archives eligible for overrides.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = ".szs";

/// Maximum length of a full virtual path, including its terminator.
pub const MAX_PATH: usize = 256;

/// Maximum length of a single path component.
pub const MAX_NAME: usize = 64;

/// Maximum number of override files applied to one archive.
pub const MAX_OVERRIDES: usize = 256;

/// How loose files under the root are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideLayout {
    /// One directory per archive, mirroring the archive's path without its
    /// extension: `/UI/Award.szs` is overridden from `<root>/UI/Award/`.
    #[default]
    Mirrored,
    /// One directory shared by all archives. A file applies to every archive
    /// containing an entry of that name unless its name carries a
    /// `.<ArchiveName>` tag (`award.brlyt.Award`), which restricts it to that
    /// archive.
    Shared,
}

/// Settings shared by every overlay component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Virtual path under which loose override files live.
    pub root: String,
    pub layout: OverrideLayout,
    /// Only paths with this extension (case-insensitive) receive loose overrides.
    pub archive_extension: String,
    /// Boundary every appended payload starts on. Must be a power of two.
    pub alignment: u32,
    pub max_path: usize,
    pub max_name: usize,
    pub max_overrides: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            layout: OverrideLayout::default(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            alignment: u8_archive::DATA_ALIGNMENT as u32,
            max_path: MAX_PATH,
            max_name: MAX_NAME,
            max_overrides: MAX_OVERRIDES,
        }
    }
}

impl OverlayConfig {
    /// Load and validate a TOML configuration file.
    ///
    /// Missing keys fall back to their defaults.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.alignment.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "alignment {} is not a power of two",
                self.alignment
            )));
        }
        if self.root.trim_matches(['/', '\\']).is_empty() {
            return Err(Error::InvalidConfig(
                "override root must name a directory".to_string(),
            ));
        }
        if self.root.len() + 1 > self.max_path {
            return Err(Error::InvalidConfig(format!(
                "override root '{}' does not fit max_path {}",
                self.root, self.max_path
            )));
        }
        if self.max_name == 0 || self.max_overrides == 0 {
            return Err(Error::InvalidConfig(
                "max_name and max_overrides must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn alignment(&self) -> u64 {
        u64::from(self.alignment)
    }

    pub fn override_root(&self) -> OverrideRoot {
        OverrideRoot::new(&self.root, self.max_path)
    }
}
