//! Pre-parse safety guards.
//!
//! Extractors run these before handing bytes to a structural parser:
//! encryption probes turn password-protected files into a clean
//! [`Encrypted`](crate::DocsieveError::Encrypted) error up front, and the
//! archive guard rejects probable decompression bombs before anything is
//! inflated.

#[cfg(any(feature = "office", feature = "excel", feature = "archives"))]
pub mod archive;
pub mod encryption;
pub mod ole;

#[cfg(any(feature = "office", feature = "excel", feature = "archives"))]
pub use archive::ArchiveLimits;
