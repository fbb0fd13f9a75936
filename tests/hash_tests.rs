use pretty_assertions::assert_eq;
use toc_modder::hash::{dirname, murmur64, murmur64_seeded, stream_file_id};

#[test]
fn test_murmur64_vectors() {
    assert_eq!(murmur64(b""), 0);
    assert_eq!(murmur64(b"a"), 0x071717d2d36b6b11);
    assert_eq!(murmur64(b"abcdefgh"), 0xafdb0257ff41aa98);
    assert_eq!(murmur64(b"abcdefghi"), 0xc9b9d84356146ac2);
    assert_eq!(murmur64(b"hello world!"), 0x64db099bd1512951);
}

#[test]
fn test_type_ids_are_name_hashes() {
    assert_eq!(murmur64(b"wwise_bank"), 0x535a7bd3e650d799);
    assert_eq!(murmur64(b"wwise_stream"), 0x504b55235d21440e);
    assert_eq!(murmur64(b"wwise_dep"), 0xaf32095c82f2b070);
    assert_eq!(murmur64(b"strings"), 0x0d972bab10b40fd3);
    assert_eq!(murmur64(b"bik"), 0xaa5965f03029fa18);
}

#[test]
fn test_seed_zero_matches_default() {
    assert_eq!(murmur64_seeded(b"wwise_bank", 0), murmur64(b"wwise_bank"));
    assert_ne!(murmur64_seeded(b"wwise_bank", 1), murmur64(b"wwise_bank"));
}

#[test]
fn test_stream_file_id_uses_bank_directory() {
    assert_eq!(
        stream_file_id("content/audio/sfx_bank.bnk", 12345),
        0xa70b48affb36799e
    );
    assert_eq!(
        stream_file_id("content/audio/other.bnk", 12345),
        murmur64(b"content/audio/12345")
    );
}

#[test]
fn test_dirname() {
    assert_eq!(dirname("content/audio/sfx.bnk"), "content/audio");
    assert_eq!(dirname("sfx.bnk"), "");
    assert_eq!(dirname("/sfx.bnk"), "/");
    assert_eq!(dirname("content//sfx.bnk"), "content");
}
