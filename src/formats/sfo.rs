//! SFO (`param.sfo`) - key/value property list embedded in the PKG.
//!
//! ## Layout (little-endian, offsets relative to the start of the blob)
//! ```text
//! [0x00] Magic "\0PSF"             (4 bytes)
//! [0x04] Version                   (u32 LE, 0x0101 on PS4)
//! [0x08] KeyTableOffset            (u32 LE)
//! [0x0C] ValueTableOffset          (u32 LE)
//! [0x10] EntryCount                (u32 LE)
//! [0x14] EntryTable                (EntryCount × 0x10 bytes)
//! ```
//!
//! ## Entry (0x10 bytes)
//! ```text
//! [0x00] KeyOffset   - into the key table (u16 LE)
//! [0x02] Format      - 0x0004 / 0x0204 text, 0x0404 integer (u16 LE)
//! [0x04] Length      - bytes used (u32 LE)
//! [0x08] MaxLength   - bytes reserved (u32 LE)
//! [0x0C] ValueOffset - into the value table (u32 LE)
//! ```
//!
//! Keys are null-terminated ASCII. A broken entry is skipped; only a
//! broken header makes the whole table unusable.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::Diagnostic;
use crate::utils::ByteReader;
use crate::{Error, Result};

const SFO_MAGIC: &[u8; 4] = b"\0PSF";
const HEADER_SIZE: usize = 0x14;
const ENTRY_SIZE: usize = 0x10;

/// Value format codes.
pub const FMT_TEXT_SPECIAL: u16 = 0x0004;
pub const FMT_TEXT: u16 = 0x0204;
pub const FMT_INTEGER: u16 = 0x0404;

/// A decoded property value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SfoValue {
    Text(String),
    Integer(u64),
    Raw(Vec<u8>),
}

impl fmt::Display for SfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SfoValue::Text(s) => f.write_str(s),
            SfoValue::Integer(v) => write!(f, "{v}"),
            SfoValue::Raw(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Parsed property list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Sfo {
    /// Format version from the header.
    pub version: u32,
    entries: BTreeMap<String, SfoValue>,
    /// Entries that were skipped.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub anomalies: Vec<Diagnostic>,
}

impl Sfo {
    /// Parse a property list occupying the whole of `r`.
    ///
    /// Fails with [`Error::TruncatedPropertyList`] or
    /// [`Error::BadPropertyListMagic`] when the header is unusable.
    pub fn parse(r: &ByteReader<'_>) -> Result<Self> {
        if r.len() < HEADER_SIZE {
            return Err(Error::TruncatedPropertyList);
        }
        if &r.array::<4>(0)? != SFO_MAGIC {
            return Err(Error::BadPropertyListMagic);
        }

        let version = r.le_u32(0x04)?;
        let key_table = r.le_u32(0x08)? as usize;
        let value_table = r.le_u32(0x0C)? as usize;
        let entry_count = r.le_u32(0x10)?;

        if key_table >= r.len() || value_table >= r.len() {
            warn!(
                key_table,
                value_table,
                size = r.len(),
                "param.sfo tables out of bounds"
            );
            return Err(Error::TruncatedPropertyList);
        }

        debug!(version, key_table, value_table, entry_count, "decoded param.sfo header");

        let keys = r.sub(key_table, r.len() - key_table)?;
        let values = r.sub(value_table, r.len() - value_table)?;

        let mut sfo = Self {
            version,
            ..Self::default()
        };

        for i in 0..entry_count {
            let Some(at) = (i as usize)
                .checked_mul(ENTRY_SIZE)
                .and_then(|o| o.checked_add(HEADER_SIZE))
                .filter(|&at| r.contains(at, ENTRY_SIZE))
            else {
                // Every later descriptor is out of range too.
                sfo.skip(i);
                break;
            };

            match read_entry(r, at, &keys, &values) {
                Ok((key, value)) => {
                    debug!(%key, %value, "param.sfo entry");
                    sfo.entries.entry(key).or_insert(value);
                }
                Err(_) => sfo.skip(i),
            }
        }

        Ok(sfo)
    }

    fn skip(&mut self, index: u32) {
        let e = Error::MalformedPropertyListEntry(index);
        warn!("{e}");
        self.anomalies.push(e.into());
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&SfoValue> {
        self.entries.get(key)
    }

    /// Look up a text value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            SfoValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Look up an integer value by key.
    pub fn get_int(&self, key: &str) -> Option<u64> {
        match self.entries.get(key)? {
            SfoValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Iterate over all entries, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entry(
    r: &ByteReader<'_>,
    at: usize,
    keys: &ByteReader<'_>,
    values: &ByteReader<'_>,
) -> Result<(String, SfoValue)> {
    let key_offset = r.le_u16(at)? as usize;
    let format = r.le_u16(at + 0x02)?;
    let len = r.le_u32(at + 0x04)? as usize;
    let _max_len = r.le_u32(at + 0x08)?;
    let value_offset = r.le_u32(at + 0x0C)? as usize;

    let key = keys.null_string(key_offset)?;
    if key.is_empty() {
        return Err(Error::OutOfBounds {
            offset: key_offset,
            len: 0,
        });
    }

    let value = match format {
        FMT_TEXT | FMT_TEXT_SPECIAL => {
            let raw = values.bytes(value_offset, len)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            SfoValue::Text(String::from_utf8_lossy(&raw[..end]).trim().to_owned())
        }
        FMT_INTEGER => SfoValue::Integer(values.le_uint(value_offset, len)?),
        _ => SfoValue::Raw(values.bytes(value_offset, len)?.to_vec()),
    };

    Ok((key, value))
}
