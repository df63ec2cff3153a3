use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use u8_archive::{U8Archive, U8Builder};
use u8_overlay::{
    apply_loose_overrides, collect_overrides, get_overrides_total_aligned,
    should_apply_loose_overrides, AppliedOverrideStats, FsStorage, OverlayConfig, OverlayLoader,
    OverrideLayout,
};

struct Sd {
    dir: TempDir,
    storage: FsStorage,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Sd {
    fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap());
        Self { dir, storage }
    }

    fn write(&self, path: &str, data: &[u8]) {
        let host = self.dir.path().join(path.trim_start_matches('/'));
        fs::create_dir_all(host.parent().unwrap()).unwrap();
        fs::write(host, data).unwrap();
    }

    fn remove(&self, path: &str) {
        fs::remove_file(self.dir.path().join(path.trim_start_matches('/'))).unwrap();
    }
}

fn award_archive() -> Vec<u8> {
    U8Builder::default()
        .with_file("a.bin", vec![0xAA; 10])
        .with_file("b.bin", vec![0xBB; 20])
        .with_file("c.bin", vec![0xCC; 5])
        .build().unwrap()
}

fn extent(archive: &U8Archive, path: &str) -> (u32, u32) {
    let node = archive.node(archive.find_path(path).unwrap()).unwrap();
    (node.data_offset, node.size)
}

#[test]
fn replaces_one_entry_and_leaves_the_rest() {
    let sd = Sd::new();
    sd.write("/files/Mods/UI/Award/b.bin", &[0x42; 40]);
    let config = OverlayConfig::default();

    let base = award_archive();
    let base_size = base.len();
    let original = U8Archive::parse(&base).unwrap();

    let scope = should_apply_loose_overrides(&config, &sd.storage, "/UI/Award.szs").unwrap();
    let set = collect_overrides(&config, &sd.storage, &scope, &original);
    let totals = get_overrides_total_aligned(&set);
    assert_eq!((totals.total_aligned, totals.applicable), (64, 1));

    let mut buffer = base.clone();
    buffer.resize(base_size + totals.total_aligned as usize, 0);
    let stats = apply_loose_overrides(&sd.storage, &mut buffer, base_size, &set, &totals).unwrap();
    assert_eq!(
        (stats.applied_overrides, stats.patched_nodes, stats.missing_overrides),
        (1, 1, 0)
    );

    let patched = U8Archive::parse(&buffer).unwrap();
    assert_eq!(extent(&patched, "b.bin"), (base_size as u32, 40));
    assert_eq!(extent(&patched, "a.bin"), extent(&original, "a.bin"));
    assert_eq!(extent(&patched, "c.bin"), extent(&original, "c.bin"));
    assert_eq!(patched.len(), original.len());
}

#[test]
fn ignores_overrides_without_an_archive_entry() {
    let sd = Sd::new();
    sd.write("/files/Mods/UI/Award/d.bin", &[1; 12]);
    let config = OverlayConfig::default();
    let base = award_archive();
    let archive = U8Archive::parse(&base).unwrap();

    let scope = should_apply_loose_overrides(&config, &sd.storage, "/UI/Award.szs").unwrap();
    let set = collect_overrides(&config, &sd.storage, &scope, &archive);
    assert!(set.is_empty());

    let totals = get_overrides_total_aligned(&set);
    let mut buffer = base.clone();
    let stats = apply_loose_overrides(&sd.storage, &mut buffer, base.len(), &set, &totals).unwrap();
    assert_eq!(stats, AppliedOverrideStats::default());
    assert_eq!(buffer, base);
}

#[test]
fn source_deleted_between_passes_is_counted_missing() {
    let sd = Sd::new();
    sd.write("/files/Mods/UI/Award/b.bin", &[0x42; 40]);
    let config = OverlayConfig::default();
    let base = award_archive();
    let original = U8Archive::parse(&base).unwrap();

    let scope = should_apply_loose_overrides(&config, &sd.storage, "/UI/Award.szs").unwrap();
    let set = collect_overrides(&config, &sd.storage, &scope, &original);
    let totals = get_overrides_total_aligned(&set);
    sd.remove("/files/Mods/UI/Award/b.bin");

    let mut buffer = base.clone();
    buffer.resize(totals.required_len(base.len()) as usize, 0);
    let stats = apply_loose_overrides(&sd.storage, &mut buffer, base.len(), &set, &totals).unwrap();
    assert_eq!((stats.applied_overrides, stats.missing_overrides), (0, 1));

    let patched = U8Archive::parse(&buffer).unwrap();
    assert_eq!(extent(&patched, "b.bin"), extent(&original, "b.bin"));
}

#[test]
fn shared_layout_applies_tagged_and_untagged_files() {
    let sd = Sd::new();
    sd.write("/files/Mods/award.brlyt", &[1; 8]);
    sd.write("/files/Mods/icon.tpl.Title", &[2; 8]);
    sd.write("/files/Mods/icon.tpl.Award", &[3; 8]);
    let config = OverlayConfig {
        layout: OverrideLayout::Shared,
        ..OverlayConfig::default()
    };

    let base = U8Builder::default()
        .with_file("blyt/award.brlyt", vec![0; 4])
        .with_file("timg/icon.tpl", vec![0; 4])
        .with_file("anim/icon.tpl", vec![0; 4])
        .build().unwrap();

    let loader = OverlayLoader::new(config, &sd.storage).unwrap();
    let outcome = loader.apply("/UI/Award.szs", base).unwrap();
    let report = outcome.report.unwrap();
    assert_eq!(report.stats.applied_overrides, 2);
    // The tagged icon replaces both entries of that name, one copy each.
    assert_eq!(report.stats.patched_nodes, 3);
    assert_eq!(report.totals.total_aligned, 3 * 32);
    assert_eq!(outcome.data.len(), outcome.base_size + 3 * 32);

    let archive = U8Archive::parse(&outcome.data).unwrap();
    let timg = archive.find_path("timg/icon.tpl").unwrap();
    let anim = archive.find_path("anim/icon.tpl").unwrap();
    assert_eq!(archive.file_data(&outcome.data, timg), Some(&[3; 8][..]));
    assert_eq!(archive.file_data(&outcome.data, anim), Some(&[3; 8][..]));
    assert_ne!(extent(&archive, "timg/icon.tpl"), extent(&archive, "anim/icon.tpl"));
}

#[test]
fn reapplying_to_a_patched_buffer_changes_nothing() {
    let sd = Sd::new();
    sd.write("/files/Mods/UI/Award/b.bin", &[0x42; 40]);
    sd.write("/files/Mods/UI/Award/c.bin", &[0x43; 3]);
    let config = OverlayConfig::default();
    let base = award_archive();
    let base_size = base.len();

    let scope = should_apply_loose_overrides(&config, &sd.storage, "/UI/Award.szs").unwrap();
    let set = collect_overrides(&config, &sd.storage, &scope, &U8Archive::parse(&base).unwrap());
    let totals = get_overrides_total_aligned(&set);

    let mut buffer = base;
    buffer.resize(totals.required_len(base_size) as usize, 0);
    apply_loose_overrides(&sd.storage, &mut buffer, base_size, &set, &totals).unwrap();
    let once = buffer.clone();

    let stats = apply_loose_overrides(&sd.storage, &mut buffer, base_size, &set, &totals).unwrap();
    assert_eq!((stats.applied_overrides, stats.missing_overrides), (2, 0));
    assert_eq!(buffer, once);

    let patched = U8Archive::parse(&buffer).unwrap();
    assert_eq!(extent(&patched, "b.bin"), (base_size as u32, 40));
    assert_eq!(extent(&patched, "c.bin"), (base_size as u32 + 64, 3));
}

#[test]
fn loader_reads_archive_from_storage() {
    let sd = Sd::new();
    sd.write("/Race/Course/castle_course.szs", &award_archive());
    sd.write("/files/Mods/Race/Course/castle_course/C.BIN", &[7; 33]);

    let loader = OverlayLoader::new(OverlayConfig::default(), &sd.storage).unwrap();
    let outcome = loader.load("/Race/Course/castle_course.szs").unwrap();
    assert!(!outcome.whole_file);
    assert_eq!(outcome.data.len(), outcome.base_size + 64);

    let archive = U8Archive::parse(&outcome.data).unwrap();
    let c = archive.find_path("c.bin").unwrap();
    assert_eq!(archive.file_data(&outcome.data, c), Some(&[7; 33][..]));
}

#[test]
fn paths_under_the_override_root_are_left_alone() {
    let sd = Sd::new();
    sd.write("/files/Mods/UI/Award.szs", &award_archive());
    sd.write("/files/Mods/files/Mods/UI/Award.szs", &[0; 4]);
    sd.write("/files/Mods/files/Mods/UI/Award/b.bin", &[1; 4]);

    let loader = OverlayLoader::new(OverlayConfig::default(), &sd.storage).unwrap();
    let outcome = loader.load("/files/Mods/UI/Award.szs").unwrap();
    assert!(!outcome.whole_file);
    assert!(outcome.report.is_none());
    assert_eq!(outcome.data, award_archive());
}
