//! Format routing: map a file identifier to an extractor.
//!
//! Resolution is extension-first, deliberately: MIME guessing varies by
//! platform and must never override an explicit, unambiguous extension. Only
//! when the extension resolves nothing does the MIME table get a say.
//!
//! The registry is process-wide and write-once: entries are fixed at first
//! access, and each extractor is constructed lazily on its first resolution
//! so unused backends never pay an initialization cost. Resolution is a pure
//! function of the identifier - no I/O, the file does not need to exist.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use tracing::debug;

use crate::error::{DocsieveError, Result};
use crate::extraction::Extractor;
use crate::extraction::text::TextExtractor;

#[cfg(feature = "archives")]
use crate::extraction::archive::ArchiveExtractor;
#[cfg(feature = "email")]
use crate::extraction::email::{EmlExtractor, MboxExtractor};
#[cfg(feature = "html")]
use crate::extraction::html::HtmlExtractor;
#[cfg(feature = "office")]
use crate::extraction::office::{DocxExtractor, PptxExtractor};
#[cfg(feature = "office")]
use crate::extraction::opendoc::{OdpExtractor, OdtExtractor};
#[cfg(feature = "pdf")]
use crate::extraction::pdf::PdfExtractor;
#[cfg(feature = "excel")]
use crate::extraction::spreadsheet::{SpreadsheetExtractor, SpreadsheetKind};

/// Canonical format key an identifier resolves to.
///
/// Aliases and macro-enabled variants collapse onto these keys (htm -> Html,
/// docm -> Docx, xlsm -> Xlsx, ...). A key existing here does not by itself
/// mean the format is supported: support additionally requires a registry
/// entry, which depends on the enabled cargo features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Text,
    Html,
    Docx,
    Pptx,
    Odt,
    Odp,
    Xlsx,
    Xls,
    Ods,
    Pdf,
    Eml,
    Mbox,
    Zip,
}

impl FileType {
    /// Map a normalized (lowercase, dot-free) extension to its canonical key.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" | "csv" | "tsv" | "md" | "markdown" | "json" | "log" => Some(Self::Text),
            "html" | "htm" => Some(Self::Html),
            "docx" | "docm" => Some(Self::Docx),
            "pptx" | "pptm" => Some(Self::Pptx),
            "odt" => Some(Self::Odt),
            "odp" => Some(Self::Odp),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "ods" => Some(Self::Ods),
            "pdf" => Some(Self::Pdf),
            "eml" => Some(Self::Eml),
            "mbox" => Some(Self::Mbox),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Map a MIME essence string to its canonical key.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "text/plain" | "text/csv" | "text/tab-separated-values" | "text/markdown" | "application/json" => {
                Some(Self::Text)
            }
            "text/html" => Some(Self::Html),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some(Self::Docx),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => Some(Self::Pptx),
            "application/vnd.oasis.opendocument.text" => Some(Self::Odt),
            "application/vnd.oasis.opendocument.presentation" => Some(Self::Odp),
            "application/vnd.oasis.opendocument.spreadsheet" => Some(Self::Ods),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel.sheet.macroEnabled.12" => Some(Self::Xlsx),
            "application/vnd.ms-excel" => Some(Self::Xls),
            "application/pdf" => Some(Self::Pdf),
            "message/rfc822" => Some(Self::Eml),
            "application/mbox" => Some(Self::Mbox),
            "application/zip" | "application/x-zip-compressed" => Some(Self::Zip),
            _ => None,
        }
    }
}

struct Registration {
    build: fn() -> Box<dyn Extractor>,
    cell: OnceCell<Box<dyn Extractor>>,
}

impl Registration {
    const fn new(build: fn() -> Box<dyn Extractor>) -> Self {
        Self {
            build,
            cell: OnceCell::new(),
        }
    }

    fn get(&self) -> &dyn Extractor {
        self.cell.get_or_init(|| (self.build)()).as_ref()
    }
}

static REGISTRY: Lazy<HashMap<FileType, Registration>> = Lazy::new(|| {
    let mut m: HashMap<FileType, Registration> = HashMap::new();

    m.insert(FileType::Text, Registration::new(|| Box::new(TextExtractor)));

    #[cfg(feature = "html")]
    m.insert(FileType::Html, Registration::new(|| Box::new(HtmlExtractor)));

    #[cfg(feature = "office")]
    {
        m.insert(FileType::Docx, Registration::new(|| Box::new(DocxExtractor)));
        m.insert(FileType::Pptx, Registration::new(|| Box::new(PptxExtractor)));
        m.insert(FileType::Odt, Registration::new(|| Box::new(OdtExtractor)));
        m.insert(FileType::Odp, Registration::new(|| Box::new(OdpExtractor)));
    }

    #[cfg(feature = "excel")]
    {
        m.insert(
            FileType::Xlsx,
            Registration::new(|| Box::new(SpreadsheetExtractor::new(SpreadsheetKind::Xlsx))),
        );
        m.insert(
            FileType::Xls,
            Registration::new(|| Box::new(SpreadsheetExtractor::new(SpreadsheetKind::Xls))),
        );
        m.insert(
            FileType::Ods,
            Registration::new(|| Box::new(SpreadsheetExtractor::new(SpreadsheetKind::Ods))),
        );
    }

    #[cfg(feature = "pdf")]
    m.insert(FileType::Pdf, Registration::new(|| Box::new(PdfExtractor)));

    #[cfg(feature = "email")]
    {
        m.insert(FileType::Eml, Registration::new(|| Box::new(EmlExtractor)));
        m.insert(FileType::Mbox, Registration::new(|| Box::new(MboxExtractor)));
    }

    #[cfg(feature = "archives")]
    m.insert(FileType::Zip, Registration::new(|| Box::new(ArchiveExtractor)));

    m
});

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Resolve a path-like identifier to a canonical format key.
///
/// Extension first; MIME guess from the path only as a fallback.
pub fn file_type_for_path(path: &str) -> Option<FileType> {
    if let Some(ext) = extension_of(path) {
        if let Some(file_type) = FileType::from_extension(&ext) {
            debug!(path, ?file_type, "resolved file type from extension");
            return Some(file_type);
        }
    }
    let guessed = mime_guess::from_path(path).first()?;
    let file_type = FileType::from_mime(guessed.essence_str());
    if let Some(file_type) = file_type {
        debug!(path, mime = guessed.essence_str(), ?file_type, "resolved file type from MIME guess");
    }
    file_type
}

/// Resolve a path-like identifier to its extractor.
pub fn resolve(path: &str) -> Result<&'static dyn Extractor> {
    let file_type = file_type_for_path(path)
        .ok_or_else(|| DocsieveError::UnsupportedFormat(identifier_of(path)))?;
    resolve_type(file_type).ok_or_else(|| DocsieveError::UnsupportedFormat(identifier_of(path)))
}

/// Resolve an explicit MIME type to its extractor.
pub fn resolve_mime(mime: &str) -> Result<&'static dyn Extractor> {
    FileType::from_mime(mime)
        .and_then(resolve_type)
        .ok_or_else(|| DocsieveError::UnsupportedFormat(mime.to_string()))
}

/// Resolve a canonical key to its extractor, if one is registered.
pub fn resolve_type(file_type: FileType) -> Option<&'static dyn Extractor> {
    REGISTRY.get(&file_type).map(Registration::get)
}

/// Whether a supporting extractor is registered for this identifier.
///
/// Pure identifier check: no I/O, the file does not need to exist.
pub fn is_supported(path: &str) -> bool {
    file_type_for_path(path)
        .map(|ft| REGISTRY.contains_key(&ft))
        .unwrap_or(false)
}

fn identifier_of(path: &str) -> String {
    extension_of(path).unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_resolution_is_case_insensitive() {
        assert_eq!(file_type_for_path("Report.DOCX"), Some(FileType::Docx));
        assert_eq!(file_type_for_path("report.docx"), Some(FileType::Docx));
        assert_eq!(file_type_for_path("DATA.Csv"), Some(FileType::Text));
    }

    #[test]
    fn test_aliases_collapse_to_canonical_key() {
        assert_eq!(file_type_for_path("page.htm"), file_type_for_path("page.html"));
        assert_eq!(file_type_for_path("notes.markdown"), file_type_for_path("notes.md"));
        assert_eq!(file_type_for_path("macro.docm"), Some(FileType::Docx));
        assert_eq!(file_type_for_path("macro.xlsm"), Some(FileType::Xlsx));
        assert_eq!(file_type_for_path("macro.pptm"), Some(FileType::Pptx));
    }

    #[test]
    fn test_repeated_resolution_yields_same_extractor() {
        let first = resolve("a.txt").unwrap() as *const dyn Extractor;
        let second = resolve("b.txt").unwrap() as *const dyn Extractor;
        assert!(std::ptr::addr_eq(first, second));
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        assert!(!is_supported("firmware.xyz"));
        let err = resolve("firmware.xyz").map(|_| ()).unwrap_err();
        match err {
            DocsieveError::UnsupportedFormat(id) => assert_eq!(id, "xyz"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_extension_is_unsupported() {
        assert!(!is_supported("README"));
        assert!(resolve("Makefile").is_err());
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported("a.txt"));
        assert!(is_supported("b.json"));
        #[cfg(feature = "pdf")]
        assert!(is_supported("c.pdf"));
        #[cfg(feature = "email")]
        {
            assert!(is_supported("d.eml"));
            assert!(is_supported("inbox.mbox"));
        }
        #[cfg(feature = "archives")]
        assert!(is_supported("bundle.zip"));
    }

    #[test]
    fn test_mime_resolution() {
        assert_eq!(FileType::from_mime("text/plain"), Some(FileType::Text));
        assert_eq!(FileType::from_mime("application/pdf"), Some(FileType::Pdf));
        assert_eq!(FileType::from_mime("application/octet-stream"), None);
        assert!(resolve_mime("text/plain").is_ok());
        assert!(resolve_mime("application/x-frobnicator").is_err());
    }

    #[test]
    fn test_mime_fallback_resolves_unlisted_extension() {
        // "text" is not in the extension table, but the MIME guess for the
        // path (text/plain) still routes it to the text extractor.
        assert_eq!(FileType::from_extension("text"), None);
        assert_eq!(file_type_for_path("notes.text"), Some(FileType::Text));
        assert!(is_supported("notes.text"));
        assert!(resolve("notes.text").is_ok());
    }

    #[test]
    fn test_resolution_performs_no_io() {
        // Paths that cannot exist still resolve purely from the identifier.
        assert!(is_supported("/nonexistent/dir/that/is/not/real/file.txt"));
    }
}
