//! Tuning knobs for [`crate::Validator`].
//!
//! The defaults reproduce the documented behavior; nothing here changes
//! which containers are considered valid.

/// Default cap on the number of `param.sfo` bytes decoded (64 KiB).
pub const DEFAULT_MAX_PROPERTY_LIST_SIZE: usize = 64 * 1024;

/// Validator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Only scan this many leading bytes for trophy markers. `None` scans
    /// the whole file.
    pub trophy_scan_limit: Option<usize>,
    /// Largest `param.sfo` entry that is decoded; larger entries are
    /// truncated to this size before parsing.
    pub max_property_list_size: usize,
    /// Keep soft anomalies in [`crate::ValidationResult::diagnostics`].
    pub record_diagnostics: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            trophy_scan_limit: None,
            max_property_list_size: DEFAULT_MAX_PROPERTY_LIST_SIZE,
            record_diagnostics: true,
        }
    }
}

impl ValidatorOptions {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trophy_scan_limit(mut self, limit: Option<usize>) -> Self {
        self.trophy_scan_limit = limit;
        self
    }

    pub fn max_property_list_size(mut self, size: usize) -> Self {
        self.max_property_list_size = size;
        self
    }

    pub fn record_diagnostics(mut self, record: bool) -> Self {
        self.record_diagnostics = record;
        self
    }
}
