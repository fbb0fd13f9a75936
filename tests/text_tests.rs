mod common;

use common::*;
use pretty_assertions::assert_eq;
use toc_modder::context::parse_id;
use toc_modder::toc::text::StringEntry;
use toc_modder::{decode, encode, Archive, ErrorKind, SessionContext, WorkingSet};

const ENGLISH: u32 = 0x4E45;
const GERMAN: u32 = 0x4544;

fn two_languages() -> (Vec<u8>, Vec<u8>) {
    build_toc(
        &[
            Rec::new(0x10, TEXT_BANK, text_bank(ENGLISH, &[(1, "Hello"), (2, "Bye")])),
            Rec::new(0x20, TEXT_BANK, text_bank(GERMAN, &[(1, "Hallo"), (3, "Nur hier")])),
        ],
        0,
    )
}

#[test]
fn test_strings_follow_session_language() {
    let (toc, stream) = two_languages();
    let store = decode(&toc, &stream).unwrap();

    let english = store.strings(&SessionContext::with_language(ENGLISH));
    assert_eq!(english.len(), 2);
    assert_eq!(english[&1], "Hello");

    let german = store.strings(&SessionContext::with_language(GERMAN));
    assert_eq!(german[&1], "Hallo");
    assert_eq!(german.get(&2), None);

    let all = store.strings(&SessionContext::default());
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(all[&1], "Hello");
}

#[test]
fn test_set_string_only_touches_visible_banks() {
    let (toc, stream) = two_languages();
    let mut store = decode(&toc, &stream).unwrap();
    let ctx = SessionContext::with_language(GERMAN);

    assert!(store.set_string(&ctx, 1, "Servus").unwrap());
    assert!(!store.set_string(&ctx, 1, "Servus").unwrap());
    assert_eq!(store.text_banks[&0x10].strings[&1].text, "Hello");
    assert_eq!(store.modified().text_banks, vec![0x20]);

    let err = store.set_string(&ctx, 2, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);

    let (toc_out, stream_out) = encode(&store).unwrap();
    let reread = decode(&toc_out, &stream_out).unwrap();
    assert_eq!(reread.strings(&ctx)[&1], "Servus");
    assert_eq!(reread.strings(&ctx)[&3], "Nur hier");

    assert!(store.revert_string(&ctx, 1).unwrap());
    assert!(store.modified().is_empty());
    assert_eq!(encode(&store).unwrap(), (toc, stream));
}

#[test]
fn test_unmodified_text_bank_keeps_original_bytes() {
    let mut payload = text_bank(ENGLISH, &[(1, "Hello")]);
    payload.extend_from_slice(&[0xEE; 5]);
    let (toc, stream) = build_toc(&[Rec::new(0x10, TEXT_BANK, payload.clone())], 0);
    let store = decode(&toc, &stream).unwrap();
    assert_eq!(store.text_banks[&0x10].to_bytes().unwrap(), payload);
}

#[test]
fn test_string_entry_edit_back_clears() {
    let mut entry = StringEntry::new("a".to_string());
    assert!(entry.set("b"));
    assert!(entry.is_modified());
    assert!(entry.set("a"));
    assert!(!entry.is_modified());
    assert!(!entry.revert());
}

#[test]
fn test_string_edits_travel_through_patch() {
    let (toc, stream) = two_languages();
    let load = || {
        let mut set = WorkingSet::new("mod");
        set.add_archive(Archive::from_bytes("text", &toc, &stream).unwrap())
            .unwrap();
        set
    };
    let ctx = SessionContext::with_language(ENGLISH);

    let mut source = load();
    source.set_string(&ctx, 2, "Goodbye").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = source.write_patch(dir.path()).unwrap();

    let mut target = load();
    let report = target.import_patch(&path).unwrap();
    assert_eq!(report.strings, vec![2]);
    assert_eq!(target.strings(&ctx)[&2], "Goodbye");
    assert_eq!(target.import_patch(&path).unwrap().applied(), 0);

    assert!(target.revert_string(&ctx, 2).unwrap());
    assert_eq!(target.strings(&ctx)[&2], "Bye");
}

#[test]
fn test_parse_id() {
    assert_eq!(parse_id("42"), Some(42));
    assert_eq!(parse_id(" 0x4E45 "), Some(ENGLISH));
    assert_eq!(parse_id("0XFF"), Some(255));
    assert_eq!(parse_id("english"), None);
}

#[test]
fn test_context_exposes() {
    assert!(SessionContext::default().exposes(ENGLISH));
    let ctx = SessionContext::with_language(ENGLISH);
    assert!(ctx.exposes(ENGLISH));
    assert!(!ctx.exposes(GERMAN));
}
