//! Extraction entry points.
//!
//! Control flow: route the identifier to an extractor, let the extractor run
//! its pre-parse guards, then stream out typed results. This module is the
//! single boundary where unexpected faults are wrapped into
//! [`ExtractionFailed`](crate::DocsieveError::ExtractionFailed); the specific
//! taxonomy conditions (unsupported, encrypted, resource limit, parse
//! failure) always pass through unchanged.

use std::path::Path;

use tracing::info;

use crate::core::router;
use crate::error::{DocsieveError, Result};
use crate::extraction::ContentStream;
use crate::types::DocumentContent;

/// Extract all results from an in-memory byte buffer.
///
/// Routing uses `path_hint` when given; without a hint the content itself is
/// sniffed for a recognizable signature. The returned stream is lazy and
/// forward-only (see [`ContentStream`]).
pub fn extract_bytes<'a>(data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
    let extractor = match path_hint {
        Some(path) => router::resolve(path)?,
        None => {
            let mime = infer::get(data)
                .map(|kind| kind.mime_type())
                .ok_or_else(|| DocsieveError::UnsupportedFormat("unrecognized content without path hint".into()))?;
            router::resolve_mime(mime)?
        }
    };
    info!(path = path_hint.unwrap_or("<bytes>"), size = data.len(), "extracting");
    extractor
        .extract(data, path_hint)
        .map_err(|e| e.into_boundary_error())
}

/// Read a file and extract all its results, fully materialized.
///
/// Fails on the first faulty item. Use [`extract_bytes`] directly to stream
/// large multi-item containers or to keep earlier items when a later one
/// fails.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Vec<DocumentContent>> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let hint = path.to_string_lossy();
    extract_bytes(&data, Some(hint.as_ref()))?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bytes_plain_text() {
        let results: Vec<_> = extract_bytes(b"hello world", Some("note.txt"))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].full_text(), "hello world");
    }

    #[test]
    fn test_unsupported_extension_fails_before_extraction() {
        let err = extract_bytes(b"data", Some("blob.xyz")).unwrap_err();
        assert!(matches!(err, DocsieveError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_sniffing_without_path_hint() {
        // %PDF magic is recognized even without any identifier.
        #[cfg(feature = "pdf")]
        {
            let sniffed = infer::get(b"%PDF-1.7\n").map(|k| k.mime_type());
            assert_eq!(sniffed, Some("application/pdf"));
        }

        let err = extract_bytes(b"\x00\x01\x02\x03", None).unwrap_err();
        assert!(matches!(err, DocsieveError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "from disk").unwrap();

        let results = extract_file(&path).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].full_text(), "from disk");
        assert_eq!(results[0].metadata().filename.as_deref(), Some("sample.txt"));
    }

    #[test]
    fn test_extract_file_missing_is_io_error() {
        let err = extract_file("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, DocsieveError::Io(_)));
    }
}
