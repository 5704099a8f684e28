//! Pre-parse password-protection probes.
//!
//! Each probe answers a narrow question about one container family without
//! fully parsing it, so protected files fail fast with
//! [`Encrypted`](crate::DocsieveError::Encrypted) instead of surfacing as a
//! confusing parse error (or worse, partial content). A probe returning
//! false means "not positively protected", not "guaranteed clean": actual
//! parsing still runs afterwards and reports its own failures.

use tracing::debug;

use crate::guards::ole::{CompoundFile, is_cfb};

#[cfg(any(feature = "office", feature = "excel"))]
use crate::error::Result;
#[cfg(any(feature = "office", feature = "excel"))]
use crate::guards::archive::{ArchiveLimits, read_guarded};

/// Streams an OLE wrapper carries when an OOXML package is encrypted.
///
/// Agile and standard encryption both rewrap the package in a compound file
/// with these streams, so their presence is the protection signal.
const OLE_ENCRYPTION_STREAMS: [&str; 3] = ["EncryptionInfo", "EncryptedPackage", "DataSpaces"];

/// BIFF record id marking a password-protected workbook.
const BIFF_FILEPASS: u16 = 0x002F;

/// Upper bound on how much of a workbook stream the FILEPASS scan reads.
///
/// FILEPASS must appear near the head of the stream, right after BOF, but a
/// generous bound keeps the scan robust against padding.
const BIFF_SCAN_LIMIT: usize = 1024 * 1024;

/// Cap on the ODF manifest read; real manifests are a few KiB.
#[cfg(any(feature = "office", feature = "excel"))]
const MANIFEST_READ_LIMIT: u64 = 4 * 1024 * 1024;

/// Whether the bytes are an encrypted OOXML document (docx/xlsx/pptx).
///
/// A plaintext OOXML file is a ZIP, so merely being an OLE container is
/// already suspicious; the stream check confirms it.
pub fn ooxml_encrypted(data: &[u8]) -> bool {
    if !is_cfb(data) {
        return false;
    }
    match CompoundFile::parse(data) {
        Ok(cf) => {
            let encrypted = OLE_ENCRYPTION_STREAMS.iter().any(|s| cf.has_stream(s));
            if encrypted {
                debug!("OLE wrapper carries encryption streams");
            }
            encrypted
        }
        // Unparseable container: let the real parser produce the error.
        Err(_) => false,
    }
}

/// Whether the bytes are an encrypted OpenDocument file (odt/odp/ods).
///
/// ODF keeps the ZIP readable and encrypts entry payloads, declaring the
/// algorithm per entry in `META-INF/manifest.xml`.
#[cfg(any(feature = "office", feature = "excel"))]
pub fn odf_encrypted(data: &[u8]) -> Result<bool> {
    let mut archive = match zip::ZipArchive::new(std::io::Cursor::new(data)) {
        Ok(archive) => archive,
        Err(_) => return Ok(false),
    };
    let manifest = match archive.by_name("META-INF/manifest.xml") {
        Ok(entry) => {
            let declared = entry.size();
            read_guarded(entry, declared.min(MANIFEST_READ_LIMIT), &ArchiveLimits::DEFAULT)?
        }
        Err(_) => return Ok(false),
    };
    let manifest = String::from_utf8_lossy(&manifest);
    Ok(manifest.contains("encryption-data")
        || manifest.contains("manifest:encrypted")
        || manifest.contains("manifest:algorithm"))
}

/// Whether the bytes are a password-protected legacy Excel workbook.
///
/// Scans the BIFF record stream for a FILEPASS record, which precedes any
/// sheet data in protected workbooks.
pub fn xls_encrypted(data: &[u8]) -> bool {
    if !is_cfb(data) {
        return false;
    }
    let cf = match CompoundFile::parse(data) {
        Ok(cf) => cf,
        Err(_) => return false,
    };
    let stream = ["Workbook", "Book"].into_iter().find(|s| cf.has_stream(s));
    let Some(stream) = stream else {
        return false;
    };
    let Ok(records) = cf.read_stream_prefix(stream, BIFF_SCAN_LIMIT) else {
        return false;
    };
    has_filepass_record(&records)
}

fn has_filepass_record(data: &[u8]) -> bool {
    let mut offset = 0usize;
    while offset + 4 <= data.len() {
        let record_id = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let record_len = u16::from_le_bytes([data[offset + 2], data[offset + 3]]) as usize;
        if record_id == BIFF_FILEPASS {
            debug!("workbook stream carries a FILEPASS record");
            return true;
        }
        offset += 4 + record_len;
    }
    false
}
