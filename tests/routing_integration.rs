//! End-to-end routing behavior through the public API.

use docsieve::{DocsieveError, DocumentContent, extract_bytes, is_supported};

#[test]
fn test_extension_is_case_insensitive() {
    let results: Vec<_> = extract_bytes(b"shouting", Some("NOTES.TXT"))
        .unwrap()
        .collect::<docsieve::Result<_>>()
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].full_text(), "shouting");
}

#[test]
fn test_aliases_reach_the_same_extractor() {
    for name in ["a.md", "a.markdown", "a.csv", "a.log"] {
        assert!(is_supported(name), "{name} should be supported");
        let results: Vec<_> = extract_bytes(b"body", Some(name)).unwrap().collect();
        assert!(matches!(results[0], Ok(DocumentContent::Text(_))));
    }
}

#[test]
fn test_explicit_extension_beats_content() {
    // The bytes look like a PDF, but the caller said .txt; the identifier
    // wins and the content is treated as plain text.
    let results: Vec<_> = extract_bytes(b"%PDF-1.7 not really", Some("note.txt"))
        .unwrap()
        .collect::<docsieve::Result<_>>()
        .unwrap();
    assert!(matches!(results[0], DocumentContent::Text(_)));
    assert!(results[0].full_text().starts_with("%PDF-1.7"));
}

#[test]
fn test_unsupported_carries_the_rejected_identifier() {
    let err = extract_bytes(b"data", Some("firmware.xyz")).unwrap_err();
    match err {
        DocsieveError::UnsupportedFormat(id) => assert_eq!(id, "xyz"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!is_supported("firmware.xyz"));
}

#[test]
fn test_support_check_does_no_io() {
    assert!(is_supported("/no/such/volume/report.docx") || !cfg!(feature = "office"));
    assert!(is_supported("/no/such/volume/notes.txt"));
    assert!(!is_supported("/no/such/volume/mystery"));
}

#[test]
fn test_metadata_reflects_the_hint() {
    let results: Vec<_> = extract_bytes(b"x", Some("inbox/2024/note.txt"))
        .unwrap()
        .collect::<docsieve::Result<_>>()
        .unwrap();
    let meta = results[0].metadata();
    assert_eq!(meta.filename.as_deref(), Some("note.txt"));
    assert_eq!(meta.extension.as_deref(), Some("txt"));
}
