//! HTML extractor.
//!
//! Converts the markup to markdown so downstream consumers get readable
//! text with structure (headings, lists, links) preserved, instead of a
//! tag-stripped soup.

use html_to_markdown_rs::convert;

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::types::{DocumentContent, FileMetadata, HtmlContent};

pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let html = String::from_utf8_lossy(data);
        let text = convert(&html, None)
            .map_err(|e| DocsieveError::parsing(format!("HTML to markdown conversion failed: {e}")))?;
        let mut metadata = FileMetadata::from_path_hint(path_hint);
        if let Some(title) = document_title(&html) {
            metadata.insert_extra("title", title);
        }
        Ok(ContentStream::one(DocumentContent::Html(HtmlContent {
            metadata,
            text: text.trim().to_string(),
        })))
    }
}

/// The `<title>` element's text, if the document has one.
fn document_title(html: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets valid in the original string.
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = lower[open..].find('>')? + open + 1;
    let end = lower[start..].find("</title")? + start;
    let title = html[start..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let html = b"<html><body><h1>Title</h1><p>First paragraph.</p></body></html>";
        let mut stream = HtmlExtractor.extract(html, Some("page.html")).unwrap();
        let result = stream.next().unwrap().unwrap();
        assert!(stream.next().is_none());

        let text = result.full_text();
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph."));
        assert_eq!(result.units().count(), 1);
    }

    #[test]
    fn test_tags_do_not_leak_into_text() {
        let html = b"<p>visible <b>bold</b> text</p>";
        let mut stream = HtmlExtractor.extract(html, None).unwrap();
        let result = stream.next().unwrap().unwrap();
        let text = result.full_text();
        assert!(text.contains("visible"));
        assert!(!text.contains("<p>"));
        assert!(!text.contains("</b>"));
    }

    #[test]
    fn test_title_lands_in_metadata() {
        let html = b"<html><head><TITLE>Landing Page</TITLE></head><body><p>x</p></body></html>";
        let mut stream = HtmlExtractor.extract(html, None).unwrap();
        let result = stream.next().unwrap().unwrap();
        assert_eq!(result.metadata().extra["title"], "Landing Page");
    }

    #[test]
    fn test_missing_title_stays_absent() {
        assert_eq!(document_title("<p>no head</p>"), None);
        assert_eq!(document_title("<title>   </title>"), None);
    }

    #[test]
    fn test_metadata_from_hint() {
        let mut stream = HtmlExtractor.extract(b"<p>x</p>", Some("docs/index.htm")).unwrap();
        let result = stream.next().unwrap().unwrap();
        assert_eq!(result.metadata().filename.as_deref(), Some("index.htm"));
        assert_eq!(result.metadata().extension.as_deref(), Some("htm"));
    }
}
