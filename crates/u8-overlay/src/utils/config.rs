//! Overlay configuration lookup for the CLI.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use std::env;
use std::fs;
use std::io;
use u8_overlay::OverlayConfig;

pub const CONFIG_FILE_NAME: &str = "overlay.toml";

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (overlay.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(Utf8PathBuf),
    Defaults,
}

/// Loads the overlay configuration.
///
/// An explicit path must exist. Without one, overlay.toml next to the
/// executable is used when present, otherwise the defaults.
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<(OverlayConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.as_std_path().is_file() {
            return Err(CliError::ConfigNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        return load_file(path);
    }

    match default_config_path() {
        Some(path) if path.as_std_path().is_file() => load_file(&path),
        _ => Ok((OverlayConfig::default(), ConfigSource::Defaults)),
    }
}

fn load_file(path: &Utf8Path) -> Result<(OverlayConfig, ConfigSource)> {
    let config = OverlayConfig::load(path)
        .map_err(|e| CliError::config_invalid(path.to_path_buf(), e))?;
    tracing::debug!("Loaded overlay config from {}", path);
    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Writes `cfg` as pretty TOML to `path`.
pub fn save_config(cfg: &OverlayConfig, path: &Utf8Path) -> io::Result<()> {
    let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    fs::write(path.as_std_path(), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use u8_overlay::OverrideLayout;

    fn temp_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(CONFIG_FILE_NAME)).unwrap()
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);
        fs::write(path.as_std_path(), "layout = \"shared\"\n").unwrap();

        let (config, source) = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.layout, OverrideLayout::Shared);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(temp_path(&dir).as_path())).is_err());
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_path(&dir);
        let config = OverlayConfig {
            root: "/mods".to_string(),
            ..OverlayConfig::default()
        };
        save_config(&config, &path).unwrap();

        let (loaded, _) = load_config(Some(path.as_path())).unwrap();
        assert_eq!(loaded, config);
    }
}
