//! Docsieve - Document Content Extraction Library
//!
//! Docsieve extracts normalized content from documents: text, metadata,
//! tables, and embedded images, behind one uniform contract. Office
//! documents, OpenDocument files, PDFs, spreadsheets, email, and ZIP
//! archives all come out as the same typed [`DocumentContent`] model.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # fn main() -> docsieve::Result<()> {
//! let results = docsieve::extract_file("report.docx")?;
//! for content in &results {
//!     println!("{}", content.full_text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Routing** (`core`): extension-first format resolution against a
//!   lazy, write-once extractor registry
//! - **Extractors** (`extraction`): one backend per format family, each
//!   yielding a lazy [`ContentStream`] of results
//! - **Guards** (`guards`): pre-parse encryption probes and archive
//!   resource limits, run before any structural parsing
//! - **Serialization** (`serialization`): lossless type-tagged JSON with
//!   optional binary-payload elision
//!
//! Multi-item containers (mbox mailboxes, ZIP archives) yield one result
//! per contained item, lazily and in source order. Everything else yields
//! exactly one.

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extraction;
pub mod guards;
pub mod serialization;
pub mod types;

pub use error::{DocsieveError, Result};
pub use types::*;

pub use core::extractor::{extract_bytes, extract_file};
pub use core::router::{FileType, is_supported};

pub use extraction::{ContentStream, Extractor};

pub use serialization::{EncodeOptions, from_json, to_json};

#[cfg(any(feature = "office", feature = "excel", feature = "archives"))]
pub use guards::ArchiveLimits;
