//! Validation pipeline: header → entry table → `param.sfo` → metadata.
//!
//! Decoding moves through [`Stage`]s and always produces a
//! [`ValidationResult`]. Only a too-small buffer, a bad magic or an
//! unreadable file make a result invalid; any later failure just leaves
//! metadata fields empty and adds a diagnostic.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Diagnostic, Error};
use crate::formats::pkg::{EntryTable, PkgHeader};
use crate::formats::sfo::Sfo;
use crate::heuristics::{backport_hinted, has_trophy_marker};
use crate::metadata::{Metadata, human_size};
use crate::options::ValidatorOptions;
use crate::utils::ByteReader;

/// Last decoding stage that completed.
///
/// A returned [`ValidationResult`] is always final: every stage that could
/// run has run, and `stage` records how far decoding got before the result
/// was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Stage {
    Unparsed,
    HeaderChecked,
    EntriesResolved,
    PropertyListDecoded,
}

/// Outcome of validating one package.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationResult {
    /// Whether the container is structurally plausible.
    pub is_valid: bool,
    pub file_name: Option<String>,
    pub file_size: u64,
    pub header: Option<PkgHeader>,
    pub metadata: Metadata,
    /// The decoded property list, including keys the metadata ignores.
    pub sfo: Option<Sfo>,
    pub stage: Stage,
    /// Why the container is invalid. Set exactly when `is_valid` is false.
    pub failure: Option<Diagnostic>,
    /// Soft anomalies met while decoding.
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    fn new(file_name: Option<&str>, file_size: u64) -> Self {
        Self {
            is_valid: false,
            file_name: file_name.map(str::to_owned),
            file_size,
            header: None,
            metadata: Metadata::default(),
            sfo: None,
            stage: Stage::Unparsed,
            failure: None,
            diagnostics: Vec::new(),
        }
    }

    fn fail(mut self, e: Error) -> Self {
        warn!(file = self.file_name.as_deref().unwrap_or("<memory>"), "{e}");
        self.is_valid = false;
        self.failure = Some(e.into());
        self
    }

    /// The failure message, if the container is invalid.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|d| d.message.as_str())
    }
}

/// Package validator with a fixed configuration.
///
/// Holds no per-file state; one instance can validate any number of
/// packages, from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate an in-memory package.
    ///
    /// `file_name` only feeds the backport hint.
    pub fn validate(&self, data: &[u8], file_name: Option<&str>) -> ValidationResult {
        let r = ByteReader::new(data);
        let mut result = ValidationResult::new(file_name, data.len() as u64);

        result.metadata.has_trophy_marker = has_trophy_marker(data, self.options.trophy_scan_limit);
        result.metadata.backport_hinted = file_name.is_some_and(backport_hinted);

        let header = match PkgHeader::parse(&r) {
            Ok(header) => header,
            Err(e) => return result.fail(e),
        };
        result.is_valid = true;
        result.stage = Stage::HeaderChecked;

        let table = match EntryTable::walk(&header, &r) {
            Ok(table) => {
                result.stage = Stage::EntriesResolved;
                self.record(&mut result, table.anomalies.iter().cloned());
                Some(table)
            }
            Err(e) => {
                self.record(&mut result, [Diagnostic::from(e)]);
                None
            }
        };

        let sfo = match table.as_ref().and_then(|t| t.param_sfo) {
            Some(entry) => {
                let size = (entry.size as usize).min(self.options.max_property_list_size);
                match r.sub(entry.offset as usize, size).and_then(|blob| Sfo::parse(&blob)) {
                    Ok(sfo) => {
                        result.stage = Stage::PropertyListDecoded;
                        self.record(&mut result, sfo.anomalies.iter().cloned());
                        Some(sfo)
                    }
                    Err(e) => {
                        warn!("{e}");
                        self.record(&mut result, [Diagnostic::from(e)]);
                        None
                    }
                }
            }
            None => None,
        };

        result.metadata = Metadata {
            has_trophy_marker: result.metadata.has_trophy_marker,
            backport_hinted: result.metadata.backport_hinted,
            ..Metadata::normalize(&r, table.as_ref(), sfo.as_ref())
        };

        debug!(stage = ?result.stage, title = ?result.metadata.title, "validated package");
        result.header = Some(header);
        result.sfo = sfo;
        result
    }

    /// Read and validate a package file.
    ///
    /// Never fails: an unreadable file yields an invalid result whose
    /// failure has kind [`crate::ErrorKind::Io`].
    pub fn validate_path(&self, path: impl AsRef<Path>) -> ValidationResult {
        let path = path.as_ref();
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());

        let result = match fs::read(path) {
            Ok(data) => self.validate(&data, file_name.as_deref()),
            Err(e) => ValidationResult::new(file_name.as_deref(), 0).fail(e.into()),
        };

        info!(
            path = %path.display(),
            valid = result.is_valid,
            reason = result.failure_reason().unwrap_or(""),
            "checked package"
        );
        result
    }

    /// Validate several files, in order.
    pub fn validate_many<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Vec<ValidationResult> {
        paths.into_iter().map(|p| self.validate_path(p)).collect()
    }

    fn record(&self, result: &mut ValidationResult, found: impl IntoIterator<Item = Diagnostic>) {
        if self.options.record_diagnostics {
            result.diagnostics.extend(found);
        }
    }
}

/// Validate an in-memory package with the default options.
pub fn validate(data: &[u8], file_name: Option<&str>) -> ValidationResult {
    Validator::default().validate(data, file_name)
}

/// Validate a package file with the default options.
pub fn validate_path(path: impl AsRef<Path>) -> ValidationResult {
    Validator::default().validate_path(path)
}

fn yes_no(b: bool) -> &'static str {
    if b { "Yes" } else { "No" }
}

impl fmt::Display for ValidationResult {
    /// Human-readable report, one field per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.file_name.as_deref().unwrap_or("<memory>");

        if !self.is_valid {
            writeln!(f, "Invalid PKG File")?;
            writeln!(f, "File: {name}")?;
            return writeln!(f, "Error: {}", self.failure_reason().unwrap_or("unknown"));
        }

        let m = &self.metadata;
        writeln!(f, "Valid PKG File")?;
        writeln!(f, "File: {name}")?;
        writeln!(f, "Size: {}", human_size(self.file_size))?;
        if let Some(title) = &m.title {
            writeln!(f, "Title: {title}")?;
        }

        if let Some(h) = &self.header {
            writeln!(f, "PKG Type: {}", h.pkg_type_label())?;
            writeln!(f, "PKG Flags: 0x{:08X}", h.flags)?;
            match h.content_type_label() {
                Some(label) => writeln!(f, "Content Type: {label}")?,
                None => writeln!(f, "Content Type: 0x{:08X}", h.content_type)?,
            }
            writeln!(f, "Content Flags: 0x{:08X}", h.content_flags)?;
        }

        let fields = [
            ("Category", &m.category),
            ("Content ID", &m.content_id),
            ("Title ID", &m.title_id),
            ("App Version", &m.app_version),
            ("Version", &m.version),
            ("Minimum Firmware", &m.minimum_firmware),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                writeln!(f, "{label}: {value}")?;
            }
        }
        if let Some(raw) = m.system_ver_raw {
            writeln!(f, "Raw SYSTEM_VER: 0x{raw:08X}")?;
        }

        writeln!(f, "Trophies Present: {}", yes_no(m.has_trophy_marker))?;
        let backport = if m.backport_hinted { "Likely (filename hint)" } else { "Unknown" };
        writeln!(f, "Backport: {backport}")?;

        if let Some(h) = &self.header {
            writeln!(f, "File Count: {}", h.file_count)?;
            writeln!(f, "Entry Count: {}", h.entry_count)?;
            writeln!(f, "Body Offset: 0x{:08X}", h.body_offset)?;
            writeln!(f, "Body Size: {}", human_size(h.body_size))?;
        }
        for d in &self.diagnostics {
            writeln!(f, "Warning: {d}")?;
        }
        Ok(())
    }
}
