//! PKG - PS4 package container (outer header and entry table).
//!
//! Only the unencrypted header and entry table are decoded. The body, PFS
//! image and signatures are never touched.
//!
//! ## Header (big-endian, at least 0xC0 bytes)
//! ```text
//! [0x00] Magic "\x7FCNT"           (4 bytes)
//! [0x04] PkgType                   (u32 BE)
//! [0x08] PkgFlags                  (u32 BE)
//! [0x10] FileCount                 (u32 BE)
//! [0x14] EntryCount                (u32 BE)
//! [0x18] EntryTableOffset          (u32 BE)
//! [0x20] BodyOffset                (u64 BE)
//! [0x28] BodySize                  (u64 BE)
//! [0x70] ContentType               (u32 BE)
//! [0x74] ContentFlags              (u32 BE)
//! ```
//!
//! ## Entry descriptor (0x20 bytes, big-endian)
//! ```text
//! [0x00] Id          - see [`EntryKind`] (u32)
//! [0x04] Flags       (u32)
//! [0x08] DataOffset  - absolute within the file (u32)
//! [0x0C] DataSize    (u32)
//! [0x10] Reserved    (0x10 bytes)
//! ```
//!
//! ## Notes
//! * A header whose entry table does not fit in the file is still returned;
//!   [`PkgHeader::entry_table_available`] is then `false`.
//! * Unknown entry ids are kept in [`EntryTable::entries`] but resolve to
//!   nothing.

use tracing::{debug, warn};

use crate::error::Diagnostic;
use crate::utils::ByteReader;
use crate::{Error, Result};

/// `\x7FCNT` read as a big-endian `u32`.
pub const PKG_MAGIC: u32 = 0x7F43_4E54;

/// Smallest buffer that can hold every fixed header field.
pub const MIN_HEADER_SIZE: usize = 0xC0;

/// Size of one entry-table descriptor.
pub const ENTRY_SIZE: usize = 0x20;

/// Package type from header offset 0x04.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PkgType {
    App,
    Game,
    Patch,
    Addon,
    Theme,
    Unknown(u32),
}

impl From<u32> for PkgType {
    fn from(v: u32) -> Self {
        match v {
            0x1 => Self::App,
            0x2 => Self::Patch,
            0x3 => Self::Game,
            0x4 => Self::Theme,
            0x6 => Self::Addon,
            other => Self::Unknown(other),
        }
    }
}

impl PkgType {
    /// Display name for a raw type code.
    pub fn label(code: u32) -> String {
        let name = match code {
            0x1 => "PS4 App",
            0x2 => "PS4 Patch",
            0x3 => "PS4 Remaster",
            0x4 => "PS4 Theme",
            0x5 => "PS4 Widget",
            0x6 => "PS4 License",
            0x7 => "PS Vita App",
            0x8 => "PS Vita DLC",
            0x9 => "PS Vita Theme",
            _ => return format!("Unknown (0x{code:X})"),
        };
        name.to_owned()
    }
}

/// Decoded PKG header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PkgHeader {
    /// Classified package type.
    pub pkg_type: PkgType,
    /// Raw package type code.
    pub pkg_type_raw: u32,
    pub flags: u32,
    /// Number of files in the PFS body, as declared.
    pub file_count: u32,
    /// Number of entry-table descriptors, as declared.
    pub entry_count: u32,
    /// Absolute offset of the entry table.
    pub entry_table_offset: u32,
    pub body_offset: u64,
    pub body_size: u64,
    pub content_type: u32,
    pub content_flags: u32,
    /// Whether the declared entry table lies entirely inside the file.
    pub entry_table_available: bool,
}

impl PkgHeader {
    /// Decode the header at the start of `r`.
    ///
    /// Fails only with [`Error::TooSmall`] or [`Error::BadMagic`]; an
    /// out-of-bounds entry table is reported through
    /// [`PkgHeader::entry_table_available`] instead.
    pub fn parse(r: &ByteReader<'_>) -> Result<Self> {
        if r.len() < MIN_HEADER_SIZE {
            return Err(Error::TooSmall(r.len()));
        }

        let magic = r.be_u32(0x00)?;
        if magic != PKG_MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let pkg_type_raw = r.be_u32(0x04)?;
        let flags = r.be_u32(0x08)?;
        let file_count = r.be_u32(0x10)?;
        let entry_count = r.be_u32(0x14)?;
        let entry_table_offset = r.be_u32(0x18)?;
        let body_offset = r.be_u64(0x20)?;
        let body_size = r.be_u64(0x28)?;
        let content_type = r.be_u32(0x70)?;
        let content_flags = r.be_u32(0x74)?;

        let entry_table_available = (entry_count as usize)
            .checked_mul(ENTRY_SIZE)
            .is_some_and(|size| r.contains(entry_table_offset as usize, size));

        debug!(
            pkg_type = pkg_type_raw,
            file_count,
            entry_count,
            entry_table_offset,
            body_offset,
            body_size,
            "decoded PKG header"
        );
        if !entry_table_available {
            warn!(
                entry_count,
                entry_table_offset,
                file_len = r.len(),
                "entry table extends past end of file"
            );
        }

        Ok(Self {
            pkg_type: PkgType::from(pkg_type_raw),
            pkg_type_raw,
            flags,
            file_count,
            entry_count,
            entry_table_offset,
            body_offset,
            body_size,
            content_type,
            content_flags,
            entry_table_available,
        })
    }

    /// Display name of the package type.
    pub fn pkg_type_label(&self) -> String {
        PkgType::label(self.pkg_type_raw)
    }

    /// Display name of the content type, when it is a well-known one.
    pub fn content_type_label(&self) -> Option<&'static str> {
        match self.content_type {
            0x1A => Some("Game Data (GD)"),
            0x1B => Some("Additional Content (AC)"),
            0x1C => Some("Additional License (AL)"),
            0x1E => Some("Delta Patch (DP)"),
            _ => None,
        }
    }
}

/// Entry ids the decoder resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EntryKind {
    /// Content ID string.
    ContentId = 0x0100,
    /// Title ID string.
    TitleId = 0x0103,
    /// Embedded `param.sfo`.
    ParamSfo = 0x1000,
}

impl TryFrom<u32> for EntryKind {
    /// The unrecognized id.
    type Error = u32;
    fn try_from(v: u32) -> std::result::Result<Self, u32> {
        match v {
            0x0100 => Ok(Self::ContentId),
            0x0103 => Ok(Self::TitleId),
            0x1000 => Ok(Self::ParamSfo),
            other => Err(other),
        }
    }
}

/// One entry-table descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PkgEntry {
    pub id: u32,
    pub flags: u32,
    /// Absolute offset of the entry data.
    pub offset: u32,
    /// Entry data size in bytes.
    pub size: u32,
}

impl PkgEntry {
    /// Which resolved field this entry feeds, if any.
    pub fn kind(&self) -> Option<EntryKind> {
        EntryKind::try_from(self.id).ok()
    }

    /// Borrow the entry's data from the container.
    pub fn data<'a>(&self, r: &ByteReader<'a>) -> Result<&'a [u8]> {
        r.bytes(self.offset as usize, self.size as usize)
    }
}

/// Result of walking the entry table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryTable {
    /// Every descriptor that could be read, in table order.
    pub entries: Vec<PkgEntry>,
    pub content_id: Option<PkgEntry>,
    pub title_id: Option<PkgEntry>,
    pub param_sfo: Option<PkgEntry>,
    /// Descriptors that were skipped.
    pub anomalies: Vec<Diagnostic>,
}

impl EntryTable {
    /// Walk the entry table described by `header`.
    ///
    /// Returns [`Error::TruncatedEntryTable`] when the header says the
    /// table is unavailable. Individual descriptors that are unreadable or
    /// point outside the file are skipped; the first descriptor of each
    /// [`EntryKind`] wins.
    pub fn walk(header: &PkgHeader, r: &ByteReader<'_>) -> Result<Self> {
        if !header.entry_table_available {
            return Err(Error::TruncatedEntryTable);
        }

        let base = header.entry_table_offset as usize;
        let mut table = Self {
            entries: Vec::with_capacity(header.entry_count as usize),
            ..Self::default()
        };

        for i in 0..header.entry_count {
            let at = base + i as usize * ENTRY_SIZE;
            let entry = match read_entry(r, at) {
                Ok(entry) => entry,
                Err(_) => {
                    table.skip(i);
                    continue;
                }
            };

            let kind = entry.kind();
            if kind.is_some() && !r.contains(entry.offset as usize, entry.size as usize) {
                table.skip(i);
                continue;
            }
            table.entries.push(entry);

            let slot = match kind {
                Some(EntryKind::ContentId) => &mut table.content_id,
                Some(EntryKind::TitleId) => &mut table.title_id,
                Some(EntryKind::ParamSfo) => &mut table.param_sfo,
                None => continue,
            };
            if slot.is_none() {
                debug!(
                    index = i,
                    id = entry.id,
                    offset = entry.offset,
                    size = entry.size,
                    "resolved entry"
                );
                *slot = Some(entry);
            }
        }

        Ok(table)
    }

    fn skip(&mut self, index: u32) {
        let e = Error::MalformedEntry(index);
        warn!("{e}");
        self.anomalies.push(e.into());
    }
}

fn read_entry(r: &ByteReader<'_>, at: usize) -> Result<PkgEntry> {
    let raw = r.sub(at, ENTRY_SIZE)?;
    Ok(PkgEntry {
        id: raw.be_u32(0x00)?,
        flags: raw.be_u32(0x04)?,
        offset: raw.be_u32(0x08)?,
        size: raw.be_u32(0x0C)?,
    })
}
