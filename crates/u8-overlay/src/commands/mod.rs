use crate::errors::CliError;
use crate::utils::config::{load_config, ConfigSource};
use crate::utils::{open_storage, read_host_file};
use camino::Utf8Path;
use miette::Result;
use u8_overlay::storage::read_to_vec;
use u8_overlay::{FsStorage, OverlayLoader};

mod apply;
mod config;
mod inspect;
mod plan;
mod resolve;

pub use apply::*;
pub use config::*;
pub use inspect::*;
pub use plan::*;
pub use resolve::*;

/// Build a loader over the host directory `storage` with the effective
/// configuration.
fn open_loader(config_path: Option<&Utf8Path>, storage: &Utf8Path) -> Result<OverlayLoader<FsStorage>> {
    let (config, source) = load_config(config_path)?;
    OverlayLoader::new(config, open_storage(storage)?).map_err(|e| match source {
        ConfigSource::File(path) => CliError::config_invalid(path, e).into(),
        ConfigSource::Defaults => CliError::overlay(storage.as_str(), e).into(),
    })
}

/// Archive bytes from a host file when given, otherwise from `path` on storage.
fn read_archive(
    loader: &OverlayLoader<FsStorage>,
    path: &str,
    host_file: Option<&Utf8Path>,
) -> Result<Vec<u8>> {
    match host_file {
        Some(file) => read_host_file(file),
        None => read_to_vec(loader.storage(), Utf8Path::new(path))
            .map_err(|e| CliError::overlay(path, e.into()).into()),
    }
}
