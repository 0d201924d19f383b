//! Display-ready metadata derived from the entry table and `param.sfo`.

use crate::formats::pkg::{EntryTable, PkgEntry};
use crate::formats::sfo::Sfo;
use crate::utils::{ByteReader, null_padded_string};

/// Longest Content ID read from its entry (`XXYYYY-XXXXYYYYY_00-ZZZZZZZZZZZZZZZZ`).
pub const CONTENT_ID_LEN: usize = 36;
/// Longest Title ID read from its entry.
pub const TITLE_ID_LEN: usize = 16;

/// `param.sfo` category codes and their labels.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("gd", "Game"),
    ("gp", "Patch"),
    ("ac", "Additional Content"),
    ("gde", "Application"),
    ("gdc", "Application"),
    ("gdd", "Application"),
    ("gda", "System Application"),
    ("bd", "Blu-ray Disc"),
    ("sd", "Save Data"),
];

/// Metadata for one package. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metadata {
    pub title: Option<String>,
    pub content_id: Option<String>,
    pub title_id: Option<String>,
    /// Category label, or the raw code when it is not a known one.
    pub category: Option<String>,
    pub app_version: Option<String>,
    pub version: Option<String>,
    pub system_ver_raw: Option<u32>,
    /// Minimum firmware, e.g. `"8.50"`.
    pub minimum_firmware: Option<String>,
    pub has_trophy_marker: bool,
    pub backport_hinted: bool,
}

impl Metadata {
    /// Fill identifier and `param.sfo` derived fields.
    ///
    /// Identifiers come from the entry table first and fall back to the
    /// `CONTENT_ID` / `TITLE_ID` keys of the property list.
    pub fn normalize(r: &ByteReader<'_>, table: Option<&EntryTable>, sfo: Option<&Sfo>) -> Self {
        let mut meta = Self::default();

        if let Some(table) = table {
            meta.content_id = table
                .content_id
                .and_then(|e| entry_string(r, &e, CONTENT_ID_LEN));
            meta.title_id = table
                .title_id
                .and_then(|e| entry_string(r, &e, TITLE_ID_LEN));
        }

        let Some(sfo) = sfo else {
            return meta;
        };

        let text = |key: &str| sfo.get_str(key).filter(|s| !s.is_empty()).map(str::to_owned);

        meta.content_id = meta.content_id.or_else(|| text("CONTENT_ID"));
        meta.title_id = meta.title_id.or_else(|| text("TITLE_ID"));
        meta.title = text("TITLE");
        meta.category = text("CATEGORY").map(|c| category_label(&c));
        meta.app_version = text("APP_VER");
        meta.version = text("VERSION");
        meta.system_ver_raw = sfo
            .get_int("SYSTEM_VER")
            .and_then(|v| u32::try_from(v).ok());
        meta.minimum_firmware = meta.system_ver_raw.and_then(firmware_version);

        meta
    }
}

fn entry_string(r: &ByteReader<'_>, entry: &PkgEntry, max: usize) -> Option<String> {
    let raw = entry.data(r).ok()?;
    let s = null_padded_string(&raw[..raw.len().min(max)]);
    (!s.is_empty()).then_some(s)
}

/// Render a raw `SYSTEM_VER` as `"<major>.<minor>"`.
///
/// The top byte is the major version in decimal, the next byte holds the
/// two minor digits. Zero means "not set".
///
/// ```
/// use pkgscan::metadata::firmware_version;
/// assert_eq!(firmware_version(0x0850_0000).as_deref(), Some("8.50"));
/// assert_eq!(firmware_version(0x0B00_0000).as_deref(), Some("11.00"));
/// assert_eq!(firmware_version(0), None);
/// ```
pub fn firmware_version(raw: u32) -> Option<String> {
    if raw == 0 {
        return None;
    }
    let major = raw >> 24;
    let minor = (raw >> 16) & 0xFF;
    Some(format!("{major}.{minor:02X}"))
}

/// Map a category code to its label; unknown codes are returned unchanged.
pub fn category_label(code: &str) -> String {
    CATEGORIES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map_or(code, |&(_, label)| label)
        .to_owned()
}

/// Format a byte count as `"1.50 MB"`.
pub fn human_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}
