//! End-to-end load pipeline.
//!
//! [`OverlayLoader`] ties the components together the way a host loading an
//! archive uses them:
//!
//! 1. [`resolve_source`](OverlayLoader::resolve_source) checks for a whole-file
//!    replacement before anything is read.
//! 2. [`apply`](OverlayLoader::apply) takes the decompressed archive bytes,
//!    collects and sizes the loose overrides, grows the buffer once, and
//!    patches it.
//!
//! [`load`](OverlayLoader::load) runs both steps against the loader's storage.
//! Loose overrides are not applied on top of a whole-file replacement.

use crate::config::OverlayConfig;
use crate::enumerator::{
    collect_overrides, get_overrides_total_aligned, should_apply_loose_overrides, OverrideScope,
    OverrideSet, OverrideTotals,
};
use crate::error::Result;
use crate::patcher::{apply_loose_overrides, AppliedOverrideStats};
use crate::storage::OverrideStorage;
use crate::whole_file::{read_with_fallback, resolve_whole_file_override, WholeFileResolution};
use serde::Serialize;
use u8_archive::U8Archive;

/// Overrides found for one archive, sized but not yet applied.
#[derive(Debug, Clone)]
pub struct OverlayPlan {
    pub scope: OverrideScope,
    pub set: OverrideSet,
    pub totals: OverrideTotals,
}

/// What a patching pass did to one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayReport {
    pub totals: OverrideTotals,
    pub stats: AppliedOverrideStats,
}

/// Result of loading an archive through the overlay.
#[derive(Debug, Clone)]
pub struct OverlayOutcome {
    /// Archive bytes, patched when `report` is set.
    pub data: Vec<u8>,
    /// Length of the archive before any tail was appended.
    pub base_size: usize,
    /// Virtual path the bytes were read from.
    pub source: String,
    /// Whether `source` is a whole-file override.
    pub whole_file: bool,
    /// Set when loose overrides were applied.
    pub report: Option<OverlayReport>,
}

/// Loads archives with whole-file and loose overrides applied.
pub struct OverlayLoader<S> {
    config: OverlayConfig,
    storage: S,
}

impl<S: OverrideStorage> OverlayLoader<S> {
    /// Fails with [`Error::InvalidConfig`](crate::Error::InvalidConfig) when
    /// `config` breaks an invariant, such as a zero alignment.
    pub fn new(config: OverlayConfig, storage: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whole-file resolution for `path`, using `max_path` as the path buffer
    /// capacity.
    pub fn resolve_source<'a>(&self, path: &'a str) -> WholeFileResolution<'a> {
        resolve_whole_file_override(
            &self.config.override_root(),
            &self.storage,
            path,
            self.config.max_path,
        )
    }

    /// Find and size the loose overrides for the archive `data` loaded from
    /// `path`.
    ///
    /// Returns `None` when the archive has no override directory or nothing in
    /// it matches an archive entry.
    pub fn plan(&self, path: &str, data: &[u8]) -> Result<Option<OverlayPlan>> {
        let Some(scope) = should_apply_loose_overrides(&self.config, &self.storage, path) else {
            return Ok(None);
        };

        let archive = U8Archive::parse(data)?;
        let set = collect_overrides(&self.config, &self.storage, &scope, &archive);
        if set.is_empty() {
            return Ok(None);
        }

        let totals = get_overrides_total_aligned(&set);
        Ok(Some(OverlayPlan { scope, set, totals }))
    }

    /// Apply loose overrides to the archive `data` loaded from `path`.
    ///
    /// The buffer is grown at most once, to exactly the size the overrides
    /// need. Archives without overrides come back unchanged.
    pub fn apply(&self, path: &str, mut data: Vec<u8>) -> Result<OverlayOutcome> {
        let base_size = data.len();
        let report = match self.plan(path, &data)? {
            Some(plan) => {
                data.resize(plan.totals.required_len(base_size) as usize, 0);
                let stats =
                    apply_loose_overrides(&self.storage, &mut data, base_size, &plan.set, &plan.totals)?;

                tracing::info!(
                    "Loose overrides for {}: files={} nodes={} missing={} extra={:#x}",
                    path,
                    stats.applied_overrides,
                    stats.patched_nodes,
                    stats.missing_overrides,
                    plan.totals.total_aligned
                );
                Some(OverlayReport {
                    totals: plan.totals,
                    stats,
                })
            }
            None => None,
        };

        Ok(OverlayOutcome {
            data,
            base_size,
            source: path.to_string(),
            whole_file: false,
            report,
        })
    }

    /// Read `path` from storage and apply the overlay.
    pub fn load(&self, path: &str) -> Result<OverlayOutcome> {
        let resolution = self.resolve_source(path);
        let (data, source) = read_with_fallback(&self.storage, &resolution, path)?;

        if source != path {
            tracing::info!("Loaded whole-file override {} for {}", source, path);
            return Ok(OverlayOutcome {
                base_size: data.len(),
                source: source.to_string(),
                data,
                whole_file: true,
                report: None,
            });
        }

        self.apply(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;
    use u8_archive::U8Builder;

    fn loader(files: &[(&str, &[u8])]) -> (tempfile::TempDir, OverlayLoader<FsStorage>) {
        let dir = tempdir().unwrap();
        for (path, data) in files {
            let host = dir.path().join(path.trim_start_matches('/'));
            fs::create_dir_all(host.parent().unwrap()).unwrap();
            fs::write(host, data).unwrap();
        }
        let storage = FsStorage::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        (dir, OverlayLoader::new(OverlayConfig::default(), storage).unwrap())
    }

    fn base() -> Vec<u8> {
        U8Builder::default()
            .with_file("blyt/award.brlyt", vec![1; 24])
            .with_file("timg/icon.tpl", vec![2; 48])
            .build().unwrap()
    }

    #[test]
    fn test_apply_grows_buffer_exactly() {
        let base = base();
        let (_dir, loader) = loader(&[
            ("/files/Mods/UI/Award/blyt/award.brlyt", &[9; 70]),
            ("/files/Mods/UI/Award/timg/new.tpl", &[8; 4]),
        ]);

        let outcome = loader.apply("/UI/Award.szs", base.clone()).unwrap();
        let report = outcome.report.unwrap();
        assert_eq!(outcome.base_size, base.len());
        assert_eq!(outcome.data.len(), base.len() + 96);
        assert_eq!(report.totals.applicable, 1);
        assert_eq!(report.stats.applied_overrides, 1);

        let archive = U8Archive::parse(&outcome.data).unwrap();
        let node = archive.find_path("blyt/award.brlyt").unwrap();
        assert_eq!(archive.file_data(&outcome.data, node), Some(&[9; 70][..]));
    }

    #[test]
    fn test_apply_without_overrides_is_unchanged() {
        let base = base();
        let (_dir, loader) = loader(&[("/files/Mods/UI/Award/unknown.bin", &[1])]);

        let outcome = loader.apply("/UI/Award.szs", base.clone()).unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(outcome.data, base);

        let outcome = loader.apply("/UI/Title.szs", base.clone()).unwrap();
        assert!(outcome.report.is_none());
    }

    #[test]
    fn test_load_prefers_whole_file_override() {
        let base = base();
        let replacement = U8Builder::default().with_file("a.bin", vec![5; 3]).build().unwrap();
        let (_dir, loader) = loader(&[
            ("/UI/Award.szs", base.as_slice()),
            ("/files/Mods/Award.szs", replacement.as_slice()),
            ("/files/Mods/UI/Award/blyt/award.brlyt", &[9; 70]),
        ]);

        let outcome = loader.load("/UI/Award.szs").unwrap();
        assert!(outcome.whole_file);
        assert_eq!(outcome.source, "/files/Mods/Award.szs");
        assert!(outcome.report.is_none());
        assert_eq!(outcome.data, replacement);
    }

    #[test]
    fn test_load_applies_loose_overrides() {
        let base = base();
        let (_dir, loader) = loader(&[
            ("/UI/Award.szs", base.as_slice()),
            ("/files/Mods/UI/Award/timg/icon.tpl", &[7; 16]),
        ]);

        let outcome = loader.load("/UI/Award.szs").unwrap();
        assert!(!outcome.whole_file);
        assert_eq!(outcome.report.unwrap().stats.patched_nodes, 1);
        assert_eq!(outcome.data.len(), base.len() + 32);
    }

    #[test]
    fn test_apply_rejects_garbage_when_overrides_exist() {
        let (_dir, loader) = loader(&[("/files/Mods/UI/Award/a.bin", &[1])]);
        assert!(loader.apply("/UI/Award.szs", vec![0; 64]).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = tempdir().unwrap();
        let storage = FsStorage::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        let config = OverlayConfig {
            alignment: 0,
            ..OverlayConfig::default()
        };

        let err = OverlayLoader::new(config, storage).err().unwrap();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));
    }
}
