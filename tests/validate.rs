use std::fs;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use pkgscan::formats::pkg::PkgType;
use pkgscan::{ErrorKind, Stage, Validator, ValidatorOptions, validate, validate_path};

const CONTENT_ID: &[u8] = b"EP1234-CUSA12345_00-TESTGAME00000000";

struct SfoEntry<'a> {
    key: &'a str,
    fmt: u16,
    value: Vec<u8>,
}

fn text<'a>(key: &'a str, value: &str) -> SfoEntry<'a> {
    let mut v = value.as_bytes().to_vec();
    v.push(0);
    SfoEntry { key, fmt: 0x0204, value: v }
}

fn int(key: &str, value: u32) -> SfoEntry<'_> {
    SfoEntry { key, fmt: 0x0404, value: value.to_le_bytes().to_vec() }
}

fn build_sfo(entries: &[SfoEntry<'_>]) -> Vec<u8> {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    let mut descs = Vec::new();
    for e in entries {
        descs.push((keys.len() as u16, e.fmt, e.value.len() as u32, values.len() as u32));
        keys.extend_from_slice(e.key.as_bytes());
        keys.push(0);
        values.extend_from_slice(&e.value);
    }
    let key_table = 0x14 + entries.len() * 0x10;
    let value_table = key_table + keys.len();

    let mut out = Vec::new();
    out.extend_from_slice(b"\0PSF");
    out.write_u32::<LittleEndian>(0x0101).unwrap();
    out.write_u32::<LittleEndian>(key_table as u32).unwrap();
    out.write_u32::<LittleEndian>(value_table as u32).unwrap();
    out.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
    for (key_offset, fmt, len, value_offset) in descs {
        out.write_u16::<LittleEndian>(key_offset).unwrap();
        out.write_u16::<LittleEndian>(fmt).unwrap();
        out.write_u32::<LittleEndian>(len).unwrap();
        out.write_u32::<LittleEndian>(len).unwrap();
        out.write_u32::<LittleEndian>(value_offset).unwrap();
    }
    out.extend_from_slice(&keys);
    out.extend_from_slice(&values);
    out
}

/// Header with three entries (Content ID at 0x200, Title ID at 0x250,
/// param.sfo at 0x300) pointing at the given property list.
fn build_pkg(sfo: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u32::<BigEndian>(0x7F43_4E54).unwrap();
    buf.write_u32::<BigEndian>(0x1).unwrap(); // type
    buf.write_u32::<BigEndian>(0x0).unwrap(); // flags
    buf.write_u32::<BigEndian>(0x0).unwrap();
    buf.write_u32::<BigEndian>(5).unwrap(); // file count
    buf.write_u32::<BigEndian>(3).unwrap(); // entry count
    buf.write_u32::<BigEndian>(0xC0).unwrap(); // entry table offset
    buf.write_u32::<BigEndian>(0x0).unwrap();
    buf.write_u64::<BigEndian>(0x1000).unwrap(); // body offset
    buf.write_u64::<BigEndian>(0x10_0000).unwrap(); // body size
    buf.resize(0xC0, 0);

    for (id, offset, size) in [
        (0x0100u32, 0x200u32, 48u32),
        (0x0103, 0x250, 16),
        (0x1000, 0x300, sfo.len() as u32),
    ] {
        buf.write_u32::<BigEndian>(id).unwrap();
        buf.write_u32::<BigEndian>(0).unwrap();
        buf.write_u32::<BigEndian>(offset).unwrap();
        buf.write_u32::<BigEndian>(size).unwrap();
        buf.extend_from_slice(&[0u8; 16]);
    }

    buf.resize(0x300 + sfo.len(), 0);
    buf[0x200..0x200 + CONTENT_ID.len()].copy_from_slice(CONTENT_ID);
    buf[0x250..0x259].copy_from_slice(b"CUSA12345");
    buf[0x300..].copy_from_slice(sfo);
    buf
}

fn full_sfo(system_ver: u32) -> Vec<u8> {
    build_sfo(&[
        text("TITLE", "Test PKG Game"),
        int("SYSTEM_VER", system_ver),
        text("APP_VER", "01.05"),
        text("VERSION", "01.00"),
        text("CATEGORY", "gd"),
    ])
}

#[test]
fn valid_package_with_full_metadata() {
    let pkg = build_pkg(&full_sfo(0x0850_0000));
    let result = validate(&pkg, Some("Game.pkg"));

    assert!(result.is_valid);
    assert!(result.failure.is_none());
    assert_eq!(result.stage, Stage::PropertyListDecoded);
    assert!(result.diagnostics.is_empty());

    let header = result.header.as_ref().unwrap();
    assert_eq!(header.pkg_type, PkgType::App);
    assert_eq!(header.file_count, 5);
    assert_eq!(header.entry_count, 3);
    assert_eq!(header.body_offset, 0x1000);

    let m = &result.metadata;
    assert_eq!(m.title.as_deref(), Some("Test PKG Game"));
    assert_eq!(m.content_id.as_deref(), Some("EP1234-CUSA12345_00-TESTGAME00000000"));
    assert_eq!(m.title_id.as_deref(), Some("CUSA12345"));
    assert_eq!(m.category.as_deref(), Some("Game"));
    assert_eq!(m.app_version.as_deref(), Some("01.05"));
    assert_eq!(m.version.as_deref(), Some("01.00"));
    assert_eq!(m.system_ver_raw, Some(0x0850_0000));
    assert_eq!(m.minimum_firmware.as_deref(), Some("8.50"));
    assert!(!m.has_trophy_marker);
    assert!(!m.backport_hinted);

    let report = result.to_string();
    assert!(report.starts_with("Valid PKG File"));
    assert!(report.contains("Minimum Firmware: 8.50"));
    assert!(report.contains("Body Size: 1.00 MB"));
}

#[test]
fn firmware_eleven() {
    let pkg = build_pkg(&full_sfo(0x0B00_0000));
    let result = validate(&pkg, None);
    assert_eq!(result.metadata.minimum_firmware.as_deref(), Some("11.00"));
}

#[test]
fn short_buffers_are_too_small() {
    for len in [0usize, 1, 4, 100, 191] {
        let mut buf = vec![0u8; len];
        if len >= 4 {
            buf[..4].copy_from_slice(b"\x7FCNT");
        }
        let result = validate(&buf, None);
        assert!(!result.is_valid, "len {len}");
        assert_eq!(result.failure.as_ref().unwrap().kind, ErrorKind::TooSmall);
        assert!(result.failure_reason().unwrap().contains("too small"));
    }
}

#[test]
fn wrong_magic_is_invalid() {
    let mut pkg = build_pkg(&full_sfo(0x0850_0000));
    pkg[..4].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    let result = validate(&pkg, None);

    assert!(!result.is_valid);
    assert_eq!(result.failure.as_ref().unwrap().kind, ErrorKind::BadMagic);
    assert!(result.failure_reason().unwrap().contains("invalid PKG magic"));
    assert!(result.header.is_none());
    assert!(result.metadata.title.is_none());
}

#[test]
fn missing_title_is_not_an_error() {
    let sfo = build_sfo(&[int("SYSTEM_VER", 0x0900_0000), text("CATEGORY", "gp")]);
    let result = validate(&build_pkg(&sfo), None);

    assert!(result.is_valid);
    assert!(result.failure.is_none());
    assert!(result.metadata.title.is_none());
    assert_eq!(result.metadata.category.as_deref(), Some("Patch"));
    assert_eq!(result.metadata.minimum_firmware.as_deref(), Some("9.00"));
    assert_eq!(result.metadata.title_id.as_deref(), Some("CUSA12345"));
    assert!(result.header.is_some());
}

#[test]
fn decoding_is_idempotent() {
    let pkg = build_pkg(&full_sfo(0x0850_0000));
    let first = validate(&pkg, Some("x_backport.pkg"));
    let second = validate(&pkg, Some("x_backport.pkg"));
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn trophy_marker_detection() {
    let mut pkg = build_pkg(&full_sfo(0x0850_0000));
    assert!(!validate(&pkg, None).metadata.has_trophy_marker);

    // Inside an unrelated region still counts.
    pkg[0x120..0x12A].copy_from_slice(b"TROPHY.TRP");
    let result = validate(&pkg, None);
    assert!(result.is_valid);
    assert!(result.metadata.has_trophy_marker);

    let limited = Validator::new(ValidatorOptions::new().trophy_scan_limit(Some(0x100)))
        .validate(&pkg, None);
    assert!(!limited.metadata.has_trophy_marker);
}

#[test]
fn backport_hint_from_file_name() {
    let pkg = build_pkg(&full_sfo(0x0850_0000));
    assert!(validate(&pkg, Some("Game_Backported.pkg")).metadata.backport_hinted);
    assert!(validate(&pkg, Some("GAME_BACKPORT.pkg")).metadata.backport_hinted);
    assert!(!validate(&pkg, Some("Game.pkg")).metadata.backport_hinted);
    assert!(!validate(&pkg, None).metadata.backport_hinted);
}

#[test]
fn truncated_entry_table_keeps_container_valid() {
    let mut pkg = build_pkg(&full_sfo(0x0850_0000));
    pkg[0x18..0x1C].copy_from_slice(&0x00FF_0000u32.to_be_bytes());
    let result = validate(&pkg, None);

    assert!(result.is_valid);
    assert!(result.failure.is_none());
    assert_eq!(result.stage, Stage::HeaderChecked);
    assert!(!result.header.as_ref().unwrap().entry_table_available);
    let m = &result.metadata;
    assert!(m.content_id.is_none());
    assert!(m.title_id.is_none());
    assert!(m.title.is_none());
    assert!(m.minimum_firmware.is_none());
    assert_eq!(result.diagnostics[0].kind, ErrorKind::TruncatedEntryTable);
}

#[test]
fn broken_property_list_keeps_identifiers() {
    let mut sfo = full_sfo(0x0850_0000);
    sfo[0x08..0x0C].copy_from_slice(&0xFFFFu32.to_le_bytes());
    let result = validate(&build_pkg(&sfo), None);

    assert!(result.is_valid);
    assert_eq!(result.stage, Stage::EntriesResolved);
    assert!(result.sfo.is_none());
    assert!(result.metadata.title.is_none());
    assert_eq!(result.metadata.title_id.as_deref(), Some("CUSA12345"));
    assert_eq!(result.diagnostics[0].kind, ErrorKind::TruncatedPropertyList);
}

#[test]
fn oversized_property_list_is_capped_before_decoding() {
    let pkg = build_pkg(&full_sfo(0x0850_0000));
    // The key table starts at 0x64 and the value table at 0x8E.
    let capped = Validator::new(ValidatorOptions::new().max_property_list_size(0x80))
        .validate(&pkg, None);

    assert!(capped.is_valid);
    assert_eq!(capped.stage, Stage::EntriesResolved);
    assert!(capped.sfo.is_none());
    assert!(capped.metadata.title.is_none());
    assert_eq!(capped.metadata.title_id.as_deref(), Some("CUSA12345"));
    assert_eq!(capped.diagnostics.len(), 1);
    assert_eq!(capped.diagnostics[0].kind, ErrorKind::TruncatedPropertyList);

    let roomy = Validator::new(ValidatorOptions::new().max_property_list_size(0x1000))
        .validate(&pkg, None);
    assert_eq!(roomy.stage, Stage::PropertyListDecoded);
    assert_eq!(roomy.metadata.title.as_deref(), Some("Test PKG Game"));
}

#[test]
fn property_list_fills_missing_identifiers() {
    let sfo = build_sfo(&[
        text("TITLE_ID", "CUSA99999"),
        text("CONTENT_ID", "UP0000-CUSA99999_00-FALLBACK00000000"),
    ]);
    let mut pkg = build_pkg(&sfo);
    // Turn the Content ID and Title ID entries into unknown ids.
    pkg[0xC0..0xC4].copy_from_slice(&0x0001u32.to_be_bytes());
    pkg[0xE0..0xE4].copy_from_slice(&0x0002u32.to_be_bytes());
    let result = validate(&pkg, None);

    assert_eq!(result.metadata.title_id.as_deref(), Some("CUSA99999"));
    assert_eq!(
        result.metadata.content_id.as_deref(),
        Some("UP0000-CUSA99999_00-FALLBACK00000000")
    );
}

#[test]
fn unrecognized_keys_are_retained() {
    let sfo = build_sfo(&[text("TITLE", "Kept"), int("PARENTAL_LEVEL", 5)]);
    let result = validate(&build_pkg(&sfo), None);
    let sfo = result.sfo.as_ref().unwrap();
    assert_eq!(sfo.get_int("PARENTAL_LEVEL"), Some(5));
    assert_eq!(sfo.len(), 2);
}

#[test]
fn truncation_never_panics() {
    let pkg = build_pkg(&full_sfo(0x0850_0000));
    for len in 0..=pkg.len() {
        let result = validate(&pkg[..len], None);
        assert_eq!(result.is_valid, len >= 0xC0, "len {len}");
    }
}

#[test]
fn noise_never_panics() {
    // xorshift keeps the noise reproducible without a rand dependency.
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for round in 0..64 {
        let len = 0xC0 + (next() % 0x400) as usize;
        let mut buf: Vec<u8> = (0..len).map(|_| next() as u8).collect();
        buf[..4].copy_from_slice(b"\x7FCNT");
        // Keep the table inside the file half of the time.
        if round % 2 == 0 {
            buf[0x14..0x18].copy_from_slice(&((next() % 8) as u32).to_be_bytes());
            buf[0x18..0x1C].copy_from_slice(&0xC0u32.to_be_bytes());
        }
        let result = validate(&buf, None);
        assert!(result.is_valid);
    }
}

#[test]
fn validate_path_reads_files() {
    let dir = std::env::temp_dir().join(format!("pkgscan-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let good = dir.join("Game_Backported.pkg");
    let tiny = dir.join("tiny.pkg");
    fs::write(&good, build_pkg(&full_sfo(0x0850_0000))).unwrap();
    fs::write(&tiny, b"TINY").unwrap();

    let results = Validator::default().validate_many([&good, &tiny, &dir.join("missing.pkg")]);
    assert!(results[0].is_valid);
    assert!(results[0].metadata.backport_hinted);
    assert_eq!(results[0].file_name.as_deref(), Some("Game_Backported.pkg"));
    assert_eq!(results[1].failure.as_ref().unwrap().kind, ErrorKind::TooSmall);
    assert_eq!(results[2].failure.as_ref().unwrap().kind, ErrorKind::Io);

    assert_eq!(validate_path(&good), results[0]);
    fs::remove_dir_all(&dir).unwrap();
}
