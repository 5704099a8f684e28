//! Format routing and the extraction entry points.

pub mod extractor;
pub mod router;

pub use extractor::{extract_bytes, extract_file};
pub use router::{FileType, is_supported};
