//! PDF extractor, backed by lopdf.
//!
//! Encryption handling: a PDF with an `/Encrypt` dictionary is only
//! rejected when it is genuinely unreadable. lopdf applies standard
//! empty-password decryption while loading, so "encrypted" files with an
//! empty owner password still extract; a load or text-extraction failure on
//! an Encrypt-bearing document is what maps to
//! [`Encrypted`](crate::DocsieveError::Encrypted).

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::types::{DocumentContent, FileMetadata, Page, PdfContent};

/// How far from the end of the file the raw `/Encrypt` scan looks.
///
/// The encryption dictionary is referenced from the trailer, which sits at
/// the end of the file (or of each incremental update).
const TRAILER_SCAN_WINDOW: usize = 4096;

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let encrypt_marker = trailer_mentions_encrypt(data);

        let doc = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(e) if encrypt_marker => {
                debug!(error = %e, "failed to load PDF that declares /Encrypt");
                return Err(DocsieveError::encrypted("PDF is password-protected"));
            }
            Err(e) => {
                return Err(DocsieveError::parsing(format!("failed to load PDF: {e}")));
            }
        };

        let has_encrypt = doc.trailer.get(b"Encrypt").is_ok();
        let page_map = doc.get_pages();

        let mut pages = Vec::with_capacity(page_map.len());
        for (&page_number, _) in &page_map {
            match doc.extract_text(&[page_number]) {
                Ok(text) => pages.push(Page {
                    number: page_number as usize,
                    text: text.trim().to_string(),
                }),
                Err(e) if has_encrypt => {
                    debug!(page = page_number, error = %e, "text extraction failed on /Encrypt-bearing PDF");
                    return Err(DocsieveError::encrypted("PDF is password-protected"));
                }
                Err(e) => {
                    debug!(page = page_number, error = %e, "page text extraction failed");
                    pages.push(Page {
                        number: page_number as usize,
                        text: String::new(),
                    });
                }
            }
        }

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        apply_info_dictionary(&doc, &mut metadata);
        metadata.insert_extra("page_count", pages.len());

        Ok(ContentStream::one(DocumentContent::Pdf(PdfContent { metadata, pages })))
    }
}

/// Raw scan for an `/Encrypt` key near the end of the file.
///
/// Used to classify load failures: a parser error on a document whose
/// trailer region mentions `/Encrypt` is protection, not corruption.
fn trailer_mentions_encrypt(data: &[u8]) -> bool {
    let start = data.len().saturating_sub(TRAILER_SCAN_WINDOW);
    data[start..].windows(8).any(|w| w == b"/Encrypt")
}

fn apply_info_dictionary(doc: &Document, metadata: &mut FileMetadata) {
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return;
    };

    metadata.author = dict_string(doc, info, b"Author").or(metadata.author.take());
    metadata.created = dict_string(doc, info, b"CreationDate").or(metadata.created.take());
    metadata.modified = dict_string(doc, info, b"ModDate").or(metadata.modified.take());
    if let Some(title) = dict_string(doc, info, b"Title") {
        metadata.insert_extra("title", title);
    }
    if let Some(producer) = dict_string(doc, info, b"Producer") {
        metadata.insert_extra("producer", producer);
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn dict_string(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::String(bytes, _) => {
            let text = decode_pdf_string(bytes);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE (with BOM) or PDFDocEncoding,
/// which is close enough to Latin-1 for metadata purposes.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_encrypt_scan() {
        let mut pdf = b"%PDF-1.4 content content".to_vec();
        assert!(!trailer_mentions_encrypt(&pdf));
        pdf.extend_from_slice(b"trailer << /Encrypt 5 0 R /Root 1 0 R >>");
        assert!(trailer_mentions_encrypt(&pdf));
    }

    #[test]
    fn test_encrypt_scan_only_looks_at_the_tail() {
        let mut pdf = b"/Encrypt mentioned early".to_vec();
        pdf.extend(std::iter::repeat_n(b' ', TRAILER_SCAN_WINDOW + 64));
        assert!(!trailer_mentions_encrypt(&pdf));
    }

    #[test]
    fn test_decode_utf16_metadata_string() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Märchen".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Märchen");
        assert_eq!(decode_pdf_string(b"plain"), "plain");
    }

    #[test]
    fn test_garbage_is_parsing_error() {
        let err = PdfExtractor.extract(b"not a pdf at all", Some("x.pdf")).unwrap_err();
        assert!(matches!(err, DocsieveError::Parsing { .. }));
    }

    // Minimal one-page PDF with a Helvetica "Hello" content stream.
    fn build_minimal_pdf() -> Vec<u8> {
        let objects: Vec<(u32, String)> = vec![
            (1, "<< /Type /Catalog /Pages 2 0 R >>".into()),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".into()),
            (
                3,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
                 /Resources << /Font << /F1 5 0 R >> >> >>"
                    .into(),
            ),
            (
                4,
                {
                    let stream = "BT /F1 24 Tf 72 720 Td (Hello) Tj ET";
                    format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream)
                },
            ),
            (5, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".into()),
        ];

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (id, body) in &objects {
            offsets.push(out.len());
            out.extend_from_slice(format!("{id} 0 obj\n{body}\nendobj\n").as_bytes());
        }
        let xref_pos = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_pos
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_single_page_text_extraction() {
        let bytes = build_minimal_pdf();
        let mut stream = PdfExtractor.extract(&bytes, Some("hello.pdf")).unwrap();
        let result = stream.next().unwrap().unwrap();
        assert!(stream.next().is_none());

        let DocumentContent::Pdf(pdf) = &result else {
            panic!("expected pdf variant");
        };
        assert_eq!(pdf.pages.len(), 1);
        assert_eq!(pdf.pages[0].number, 1);
        assert!(pdf.pages[0].text.contains("Hello"));
        assert_eq!(result.metadata().extra["page_count"], 1);

        let units: Vec<usize> = result.units().map(|u| u.index).collect();
        assert_eq!(units, vec![1]);
    }
}
