//! Decompression-bomb guards for ZIP-based containers.
//!
//! Every ZIP this crate opens (plain archives, OOXML and ODF documents) goes
//! through [`open_guarded`], which validates the central directory against
//! the limits before any entry is decompressed. Declared sizes can lie, so
//! entry reads additionally go through [`read_guarded`], which stops as soon
//! as the actual byte count exceeds the declaration or the per-entry cap.
//!
//! Entry count alone is never a rejection criterion: a large archive of
//! ordinary files is legitimate, a small archive with a 500:1 expansion is
//! not.

use std::io::{Read, Seek};

use tracing::warn;
use zip::ZipArchive;

use crate::error::{DocsieveError, Result};

/// Thresholds for rejecting probable decompression bombs.
///
/// The defaults are intentionally generous so legitimate large exports pass
/// while extreme bombs are caught.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchiveLimits {
    /// Cumulative uncompressed size across all entries.
    pub max_total_uncompressed: u64,
    /// Uncompressed size of any single entry.
    pub max_entry_uncompressed: u64,
    /// Uncompressed-to-compressed ratio of any single entry.
    pub max_entry_ratio: f64,
    /// Uncompressed-to-compressed ratio of the whole archive.
    pub max_total_ratio: f64,
}

impl ArchiveLimits {
    pub const DEFAULT: Self = Self {
        max_total_uncompressed: 4 * 1024 * 1024 * 1024,
        max_entry_uncompressed: 1024 * 1024 * 1024,
        max_entry_ratio: 500.0,
        max_total_ratio: 200.0,
    };
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Open a ZIP container and validate it against the limits.
///
/// Password-protected entries are reported as [`DocsieveError::Encrypted`]
/// here, before any structural parsing sees the archive.
pub fn open_guarded<'a>(
    data: &'a [u8],
    limits: &ArchiveLimits,
) -> Result<ZipArchive<std::io::Cursor<&'a [u8]>>> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(data))?;
    validate_archive(&mut archive, limits)?;
    Ok(archive)
}

/// Validate an already-open archive's central directory against the limits.
///
/// Only raw entry metadata is inspected; nothing is decompressed.
pub fn validate_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, limits: &ArchiveLimits) -> Result<()> {
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.is_dir() {
            continue;
        }
        if entry.encrypted() {
            return Err(DocsieveError::encrypted(format!(
                "archive entry '{}' is password-protected",
                entry.name()
            )));
        }

        let uncompressed = entry.size();
        let compressed = entry.compressed_size();

        if uncompressed > limits.max_entry_uncompressed {
            warn!(entry = entry.name(), size = uncompressed, "archive entry exceeds size limit");
            return Err(DocsieveError::resource_limit(format!(
                "archive entry '{}' declares {} bytes (limit {})",
                entry.name(),
                uncompressed,
                limits.max_entry_uncompressed
            )));
        }

        if uncompressed > 0 {
            if compressed == 0 {
                return Err(DocsieveError::resource_limit(format!(
                    "archive entry '{}' declares content but zero compressed size",
                    entry.name()
                )));
            }
            let ratio = uncompressed as f64 / compressed as f64;
            if ratio > limits.max_entry_ratio {
                warn!(entry = entry.name(), ratio, "archive entry compression ratio exceeds limit");
                return Err(DocsieveError::resource_limit(format!(
                    "archive entry '{}' compression ratio {:.1} exceeds {:.1}",
                    entry.name(),
                    ratio,
                    limits.max_entry_ratio
                )));
            }
        }

        total_uncompressed = total_uncompressed.saturating_add(uncompressed);
        total_compressed = total_compressed.saturating_add(compressed);

        if total_uncompressed > limits.max_total_uncompressed {
            return Err(DocsieveError::resource_limit(format!(
                "archive declares {} uncompressed bytes in total (limit {})",
                total_uncompressed, limits.max_total_uncompressed
            )));
        }
    }

    if total_uncompressed > 0 {
        if total_compressed == 0 {
            return Err(DocsieveError::resource_limit(
                "archive declares content but zero total compressed size",
            ));
        }
        let ratio = total_uncompressed as f64 / total_compressed as f64;
        if ratio > limits.max_total_ratio {
            return Err(DocsieveError::resource_limit(format!(
                "archive total compression ratio {:.1} exceeds {:.1}",
                ratio, limits.max_total_ratio
            )));
        }
    }

    Ok(())
}

/// Read an entry's bytes while enforcing its declared size.
///
/// Reads at most one byte past `declared` (capped by the entry limit) so a
/// header that under-declares is caught without decompressing the excess.
pub fn read_guarded<R: Read>(reader: R, declared: u64, limits: &ArchiveLimits) -> Result<Vec<u8>> {
    let cap = declared.min(limits.max_entry_uncompressed).saturating_add(1);
    let mut buf = Vec::with_capacity(usize::try_from(cap.min(1024 * 1024)).unwrap_or(0));
    reader.take(cap).read_to_end(&mut buf)?;

    let actual = buf.len() as u64;
    if actual > declared {
        return Err(DocsieveError::resource_limit(format!(
            "archive entry produced more than its declared {declared} bytes"
        )));
    }
    if actual > limits.max_entry_uncompressed {
        return Err(DocsieveError::resource_limit(format!(
            "archive entry exceeds {} bytes uncompressed",
            limits.max_entry_uncompressed
        )));
    }
    Ok(buf)
}

/// Read a named entry from a guarded archive, honoring the read limits.
pub fn read_entry_by_name<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limits: &ArchiveLimits,
) -> Result<Vec<u8>> {
    let entry = archive.by_name(name)?;
    let declared = entry.size();
    read_guarded(entry, declared, limits)
}
