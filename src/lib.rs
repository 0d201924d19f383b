//! **pkgscan** - a structural validator for PS4 PKG containers.
//!
//! Reads the unencrypted parts of a package (header, entry table and the
//! embedded `param.sfo`) and reports whether the file is plausibly a
//! well-formed PKG together with whatever metadata could be recovered.
//! Nothing is decrypted and no signature is checked.
//!
//! # Modules
//! | Module | Contents |
//! |--------|----------|
//! | [`formats::pkg`]  | PKG header and entry table |
//! | [`formats::sfo`]  | `param.sfo` property list |
//! | [`metadata`]      | Display-ready fields (firmware, category, ids) |
//! | [`heuristics`]    | Trophy marker scan, backport filename hint |
//! | [`validate`]      | The pipeline that ties it all together |
//!
//! ```no_run
//! let result = pkgscan::validate_path("CUSA12345.pkg");
//! if result.is_valid {
//!     println!("{:?}", result.metadata.minimum_firmware);
//! } else {
//!     println!("{}", result.failure_reason().unwrap_or_default());
//! }
//! ```

pub mod error;
pub mod formats;
pub mod heuristics;
pub mod metadata;
pub mod options;
pub mod utils;
pub mod validate;

pub use error::{Diagnostic, Error, ErrorKind, Result};
pub use metadata::Metadata;
pub use options::ValidatorOptions;
pub use validate::{Stage, ValidationResult, Validator, validate, validate_path};
