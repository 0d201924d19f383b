//! Parsers for the PS4 package formats.
//!
//! Both parsers share the same conventions:
//!
//! * **Slice based** - they read through a [`crate::utils::ByteReader`], so
//!   every offset taken from the file is bounds-checked before use.
//! * **Metadata only** - nothing beyond the header, the entry table and
//!   the `param.sfo` entry is read. The encrypted body is never touched.
//! * **Skip, don't abort** - a broken descriptor is recorded as a
//!   [`crate::Diagnostic`] and the walk continues.
//!
//! | Module  | Format    | Description |
//! |---------|-----------|-------------|
//! | [`pkg`] | PKG       | `\x7FCNT` container header and entry table |
//! | [`sfo`] | PARAM.SFO | `\0PSF` key/value property list |

pub mod pkg;
pub mod sfo;
