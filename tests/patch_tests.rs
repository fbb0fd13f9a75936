mod common;

use common::*;
use pretty_assertions::assert_eq;
use toc_modder::workset::patch::patch_file_name;
use toc_modder::{encode, Archive, AssetRef, ErrorKind, WorkingSet, PATCH_NAME};

fn base_set() -> WorkingSet {
    let (toc, stream) = single_bank_archive();
    let mut set = WorkingSet::new("mod");
    set.add_archive(Archive::from_bytes("base", &toc, &stream).unwrap())
        .unwrap();
    set
}

fn other_bank(name: &str) -> Archive {
    let embedded = wem(22050, 2205, 80);
    let entries = vec![sound(141, 50, 500, EMBEDDED, 80, 0)];
    let payload = bank_payload(141, 0xB, &[(500, &embedded)], &entries, &[]);
    let (toc, stream) = build_toc(&bank_recs(BANK_B, BANK_PATH_B, payload), 0);
    Archive::from_bytes(name, &toc, &stream).unwrap()
}

#[test]
fn test_patch_file_name() {
    assert_eq!(patch_file_name("0123abcd"), "0123abcd.patch_0");
    assert_eq!(patch_file_name("0123abcd.patch_2"), "0123abcd.patch_0");
}

#[test]
fn test_clean_set_writes_empty_patch() {
    let set = base_set();
    let dir = tempfile::tempdir().unwrap();
    let path = set.write_patch(dir.path()).unwrap();
    let patch = Archive::open(&path).unwrap();
    assert_eq!(patch.store.record_count(), 0);
}

#[test]
fn test_patch_carries_only_modified_banks() {
    let mut set = base_set();
    set.add_archive(other_bank("other")).unwrap();
    set.set_property(20, 0x05, 7).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = set.write_patch(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(PATCH_NAME));

    let patch = Archive::open(&path).unwrap();
    assert_eq!(patch.store.banks.keys().copied().collect::<Vec<_>>(), vec![BANK_A]);
    assert_eq!(patch.store.dependencies.len(), 1);
    assert!(patch.store.streams.is_empty());
    assert_eq!(patch.store.hierarchy.len(), 5);
    assert_eq!(patch.store.header_unknown, 0x17);
}

#[test]
fn test_patch_holds_exactly_the_banks_with_edited_audio() {
    let mut set = base_set();
    set.add_archive(other_bank("other")).unwrap();
    set.set_audio_data(100, wem(44100, 4410, 96)).unwrap();
    set.set_audio_data(500, wem(44100, 4410, 80)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let patch = Archive::open(set.write_patch(dir.path()).unwrap()).unwrap();
    assert_eq!(
        patch.store.banks.keys().copied().collect::<Vec<_>>(),
        vec![BANK_A, BANK_B]
    );
    assert_eq!(patch.store.audio_data(100).unwrap(), wem(44100, 4410, 96).as_slice());
    assert_eq!(patch.store.audio_data(500).unwrap(), wem(44100, 4410, 80).as_slice());
}

#[test]
fn test_import_applies_edits_once() {
    let mut source = base_set();
    source.replace_audio(200, wem(48000, 144000, 160)).unwrap();
    source.set_property(20, 0x05, 7).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = source.write_patch(dir.path()).unwrap();

    let mut target = base_set();
    let report = target.import_patch(&path).unwrap();
    assert_eq!(report.archive, PATCH_NAME);
    assert_eq!(report.audio, vec![200]);
    assert_eq!(report.entries, vec![20]);
    assert!(report.unresolved.is_empty());
    assert_eq!(report.residue, None);
    assert_eq!(target.track_info(30).unwrap()[0].source_duration, 3000.0);
    assert_eq!(encode(target.store()).unwrap(), encode(source.store()).unwrap());

    let again = target.import_patch(&path).unwrap();
    assert_eq!(again.applied(), 0);
    assert!(again.unresolved.is_empty());
    assert_eq!(target.modified(), source.modified());
}

#[test]
fn test_unresolved_data_becomes_residue() {
    let mut set = base_set();
    let report = set.import_archive(other_bank("extra.patch_0")).unwrap();

    assert!(report.unresolved.contains(&AssetRef::Audio(500)));
    assert!(report.unresolved.contains(&AssetRef::Entry(50)));
    assert_eq!(report.residue.as_deref(), Some("extra.patch_0"));
    assert!(set.has_archive("extra.patch_0"));
    assert_eq!(set.audio_data(500).unwrap().len(), 80);
    assert_eq!(set.store().banks[&BANK_B].dirty, 1);

    let again = set.import_archive(other_bank("extra.patch_0")).unwrap();
    assert_eq!(again.applied(), 0);
    assert!(again.unresolved.is_empty());
    assert_eq!(again.residue, None);

    let dir = tempfile::tempdir().unwrap();
    let patch = Archive::open(set.write_patch(dir.path()).unwrap()).unwrap();
    assert!(patch.store.banks.contains_key(&BANK_B));
    assert!(patch.store.audio.contains_key(&500));
}

#[test]
fn test_residue_name_avoids_loaded_archives() {
    let mut set = base_set();
    let report = set.import_archive(other_bank("base")).unwrap();
    assert_eq!(report.residue.as_deref(), Some("base#1"));
    assert_eq!(set.archive_names().collect::<Vec<_>>(), vec!["base", "base#1"]);
}

#[test]
fn test_video_and_stream_edits_round_trip_through_patch() {
    let recs = vec![
        Rec::new(0x77, BINK_VIDEO, vec![1, 2, 3, 4]).with_stream(vec![0x42; 20]),
        stream_rec(0x99, vec![9u8; 21]),
    ];
    let (toc, stream) = build_toc(&recs, 0);
    let load = || {
        let mut set = WorkingSet::new("mod");
        set.add_archive(Archive::from_bytes("movies", &toc, &stream).unwrap())
            .unwrap();
        set
    };

    let mut source = load();
    source.set_video_data(0x77, vec![0x24; 48]).unwrap();
    source.store_mut().set_stream_data(0x99, vec![1u8; 30]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = source.write_patch(dir.path()).unwrap();

    let mut target = load();
    let report = target.import_patch(&path).unwrap();
    assert_eq!(report.videos, vec![0x77]);
    assert_eq!(report.streams, vec![0x99]);
    assert_eq!(target.store().videos[&0x77].payload(), vec![0x24u8; 48].as_slice());
    assert_eq!(target.store().streams[&0x99].data, vec![1u8; 30]);

    let again = target.import_patch(&path).unwrap();
    assert!(again.streams.is_empty());
    target.revert_all().unwrap();
    assert!(target.modified().is_empty());
    assert_eq!(target.store().streams[&0x99].data, vec![9u8; 21]);
}

#[test]
fn test_separate_patches_follow_archives() {
    let mut set = base_set();
    set.add_archive(other_bank("other")).unwrap();
    set.set_event_actions(40, &[41, 41, 42]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = set.write_separate_patches(dir.path()).unwrap();
    assert_eq!(written, vec![dir.path().join("base.patch_0")]);

    let toc = std::fs::read(&written[0]).unwrap();
    assert_eq!(&toc[12..16], &0x17u32.to_le_bytes());
    let patch = Archive::open(&written[0]).unwrap();
    assert_eq!(patch.store.banks.keys().copied().collect::<Vec<_>>(), vec![BANK_A]);
}

#[test]
fn test_full_archive_of_clean_constituent_is_identical() {
    let (toc, stream) = single_bank_archive();
    let mut set = base_set();
    set.add_archive(other_bank("other")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = set.write_full_archive("base", dir.path()).unwrap();
    assert_eq!(path, dir.path().join("base"));
    assert_eq!(std::fs::read(&path).unwrap(), toc);
    assert_eq!(
        std::fs::read(toc_modder::toc::stream_path(&path)).unwrap(),
        stream
    );

    let err = set.write_full_archive("nope", dir.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_full_archive_includes_edits() {
    let mut set = base_set();
    set.set_audio_data(100, wem(48000, 24000, 120)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = set.write_full_archive("base", dir.path()).unwrap();
    let written = Archive::open(&path).unwrap();
    assert_eq!(written.store.audio_data(100).unwrap().len(), 120);
    assert_eq!(written.store.hierarchy[&20].body.sources()[0].mem_size, 120);
    assert_eq!(written.store.streams.len(), 1);
}
