//! Content model shared by every format family.
//!
//! Each extractor produces a [`DocumentContent`] value: a tagged union with
//! one variant per format family. Regardless of variant, every result
//! satisfies the same capability set - enumerate text [`Unit`]s, [`Image`]s
//! and [`Table`]s, expose one [`FileMetadata`], and serialize to/from a
//! JSON-safe structure (see [`crate::serialization`]).
//!
//! Results are constructed entirely during one extraction call and are
//! read-only afterwards; none of these types hold on to the input stream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serde adapter for optional binary payloads.
///
/// Encodes `Some(bytes)` as a base64 string and `None` as an explicit JSON
/// null. The key is always emitted so the serialized schema stays stable
/// whether or not binary payloads were included.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(de::Error::custom))
            .transpose()
    }
}

/// File-level metadata, populated once at extraction start.
///
/// Fields default to absent rather than empty string when unknown.
/// Format-specific properties (title, page counts, sheet names, ...) live in
/// `extra` so the common shape stays identical across families.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,

    /// Author or creator, when the format records one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Creation timestamp as recorded by the source format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// Last-modification timestamp as recorded by the source format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,

    /// Format-specific extra fields (title, page_count, sheet_names, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FileMetadata {
    /// Populate the path-derived fields from an optional path hint.
    ///
    /// The file does not need to exist; the hint alone is enough.
    pub fn from_path_hint(path_hint: Option<&str>) -> Self {
        let mut metadata = Self::default();
        if let Some(hint) = path_hint {
            let path = Path::new(hint);
            metadata.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
            metadata.extension = path.extension().map(|e| e.to_string_lossy().into_owned());
            metadata.path = Some(hint.to_string());
            metadata.folder_path = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_string_lossy().into_owned());
        }
        metadata
    }

    /// Insert a format-specific extra field, skipping empty string values so
    /// unknown stays absent instead of empty.
    pub fn insert_extra<V: Into<serde_json::Value>>(&mut self, key: &str, value: V) {
        let value = value.into();
        if let serde_json::Value::String(s) = &value {
            if s.is_empty() {
                return;
            }
        }
        self.extra.insert(key.to_string(), value);
    }
}

/// One logical chunk of text: a page, slide, sheet, or whole-document body.
///
/// `index` is 1-based and follows the natural reading order of the source
/// format. Formats without internal structure yield exactly one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    pub index: usize,

    /// Sheet name, slide title, or similar, when the format has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub text: String,
}

/// An embedded image.
///
/// The binary payload is either fully present or fully absent - never
/// truncated. `(unit_index, image_index)` is unique within its owning result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    /// 1-based index of the owning unit, or `None` for formats where images
    /// are document-level (e.g. word-processing bodies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_index: Option<usize>,

    /// 1-based sequential image number.
    pub image_index: usize,

    pub content_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Raw image bytes; base64 in the serialized form, or null when encoded
    /// with binary payloads excluded.
    #[serde(with = "base64_bytes")]
    pub data: Option<Vec<u8>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A table as row-major cell strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_index: Option<usize>,

    /// 1-based sequential table number.
    pub table_index: usize,

    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Table dimension as `(rows, columns)`.
    ///
    /// The column count is derived as the maximum row length so it can never
    /// desynchronize from the data.
    pub fn dim(&self) -> (usize, usize) {
        let rows = self.rows.len();
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (rows, columns)
    }
}

/// Plain-text family payload (txt, csv, tsv, md, json).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub metadata: FileMetadata,
    pub text: String,
}

/// HTML payload: markdown-converted body text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlContent {
    pub metadata: FileMetadata,
    pub text: String,
}

/// Word-processing family payload (docx, odt).
///
/// These formats have no per-page representation in the file, so the whole
/// body is a single unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordDocumentContent {
    pub metadata: FileMetadata,
    pub paragraphs: Vec<String>,
    pub tables: Vec<Table>,
    pub images: Vec<Image>,
}

/// One worksheet of a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Tab-separated textual rendering of the sheet.
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Spreadsheet family payload (xlsx, xlsm, xls, ods).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadsheetContent {
    pub metadata: FileMetadata,
    /// Sheets in workbook order.
    pub sheets: Vec<Sheet>,
}

/// One slide of a presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slide {
    /// 1-based slide number in deck order.
    pub number: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub text: String,
    pub tables: Vec<Table>,
    pub images: Vec<Image>,
}

/// Presentation family payload (pptx, odp).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationContent {
    pub metadata: FileMetadata,
    pub slides: Vec<Slide>,
}

/// One PDF page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
}

/// PDF family payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfContent {
    pub metadata: FileMetadata,
    pub pages: Vec<Page>,
}

/// A parsed email address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
}

/// An email attachment record.
///
/// Attachment bytes are subject to the same binary-payload elision as image
/// data when encoding without binaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    pub content_type: String,

    #[serde(with = "base64_bytes")]
    pub data: Option<Vec<u8>>,
}

/// Email family payload (eml, and each message of an mbox).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailContent {
    pub metadata: FileMetadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<EmailAddress>,

    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_plain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,

    pub attachments: Vec<EmailAttachment>,
}

impl EmailContent {
    /// The preferred message body: plain text if present, otherwise HTML.
    pub fn body(&self) -> &str {
        self.body_plain
            .as_deref()
            .filter(|b| !b.is_empty())
            .or(self.body_html.as_deref())
            .unwrap_or("")
    }
}

/// Extraction result: one tagged variant per format family.
///
/// The serialized form carries a stable `type` discriminator so the decoder
/// can dispatch to the correct variant (see [`crate::serialization`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentContent {
    Text(TextContent),
    Html(HtmlContent),
    Document(WordDocumentContent),
    Spreadsheet(SpreadsheetContent),
    Presentation(PresentationContent),
    Pdf(PdfContent),
    Email(EmailContent),
}

impl DocumentContent {
    /// File metadata for this result.
    pub fn metadata(&self) -> &FileMetadata {
        match self {
            Self::Text(c) => &c.metadata,
            Self::Html(c) => &c.metadata,
            Self::Document(c) => &c.metadata,
            Self::Spreadsheet(c) => &c.metadata,
            Self::Presentation(c) => &c.metadata,
            Self::Pdf(c) => &c.metadata,
            Self::Email(c) => &c.metadata,
        }
    }

    /// Iterate the text units in natural reading order.
    ///
    /// PDFs yield one unit per page, presentations one per slide,
    /// spreadsheets one per sheet; formats without internal structure yield
    /// exactly one unit. Unit indices are 1-based.
    pub fn units(&self) -> Box<dyn Iterator<Item = Unit> + '_> {
        match self {
            Self::Text(c) => Box::new(std::iter::once(Unit {
                index: 1,
                label: None,
                text: c.text.clone(),
            })),
            Self::Html(c) => Box::new(std::iter::once(Unit {
                index: 1,
                label: None,
                text: c.text.clone(),
            })),
            Self::Document(c) => Box::new(std::iter::once(Unit {
                index: 1,
                label: None,
                text: c.paragraphs.join("\n"),
            })),
            Self::Spreadsheet(c) => Box::new(c.sheets.iter().enumerate().map(|(i, sheet)| Unit {
                index: i + 1,
                label: Some(sheet.name.clone()),
                text: sheet.text(),
            })),
            Self::Presentation(c) => Box::new(c.slides.iter().map(|slide| Unit {
                index: slide.number,
                label: slide.title.clone(),
                text: slide.text.clone(),
            })),
            Self::Pdf(c) => Box::new(c.pages.iter().map(|page| Unit {
                index: page.number,
                label: None,
                text: page.text.clone(),
            })),
            Self::Email(c) => Box::new(std::iter::once(Unit {
                index: 1,
                label: c.subject.clone(),
                text: c.body().to_string(),
            })),
        }
    }

    /// Iterate the embedded images of this result.
    pub fn images(&self) -> Box<dyn Iterator<Item = &Image> + '_> {
        match self {
            Self::Document(c) => Box::new(c.images.iter()),
            Self::Presentation(c) => Box::new(c.slides.iter().flat_map(|s| s.images.iter())),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Iterate the tables of this result.
    ///
    /// Spreadsheet sheets are exposed as one table each, derived on demand.
    pub fn tables(&self) -> Box<dyn Iterator<Item = Table> + '_> {
        match self {
            Self::Document(c) => Box::new(c.tables.iter().cloned()),
            Self::Presentation(c) => Box::new(c.slides.iter().flat_map(|s| s.tables.iter().cloned())),
            Self::Spreadsheet(c) => Box::new(c.sheets.iter().enumerate().map(|(i, sheet)| Table {
                unit_index: Some(i + 1),
                table_index: i + 1,
                rows: sheet.rows.clone(),
            })),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Single concatenated text view over all units, newline-joined.
    pub fn full_text(&self) -> String {
        let parts: Vec<String> = self.units().map(|u| u.text).collect();
        parts.join("\n")
    }

    /// Encode to a JSON-safe structure. See [`crate::serialization::to_json`].
    pub fn to_json(&self, options: &crate::serialization::EncodeOptions) -> crate::Result<serde_json::Value> {
        crate::serialization::to_json(self, options)
    }

    /// Decode a structure produced by [`Self::to_json`] back into a typed
    /// result. See [`crate::serialization::from_json`].
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        crate::serialization::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_path_hint() {
        let meta = FileMetadata::from_path_hint(Some("/data/reports/q3.docx"));
        assert_eq!(meta.filename.as_deref(), Some("q3.docx"));
        assert_eq!(meta.extension.as_deref(), Some("docx"));
        assert_eq!(meta.folder_path.as_deref(), Some("/data/reports"));
    }

    #[test]
    fn test_metadata_without_hint_stays_absent() {
        let meta = FileMetadata::from_path_hint(None);
        assert!(meta.filename.is_none());
        assert!(meta.extension.is_none());
        assert!(meta.path.is_none());
    }

    #[test]
    fn test_insert_extra_skips_empty_strings() {
        let mut meta = FileMetadata::default();
        meta.insert_extra("title", "");
        meta.insert_extra("author_hint", "alice");
        assert!(!meta.extra.contains_key("title"));
        assert_eq!(meta.extra["author_hint"], "alice");
    }

    #[test]
    fn test_table_dim_uses_max_row_length() {
        let table = Table {
            unit_index: None,
            table_index: 1,
            rows: vec![
                vec!["a".into(), "b".into()],
                vec!["c".into(), "d".into(), "e".into()],
                vec!["f".into()],
            ],
        };
        assert_eq!(table.dim(), (3, 3));
    }

    #[test]
    fn test_empty_table_dim() {
        let table = Table::default();
        assert_eq!(table.dim(), (0, 0));
    }

    #[test]
    fn test_pdf_units_in_page_order() {
        let content = DocumentContent::Pdf(PdfContent {
            metadata: FileMetadata::default(),
            pages: vec![
                Page { number: 1, text: "one".into() },
                Page { number: 2, text: "two".into() },
                Page { number: 3, text: "three".into() },
            ],
        });
        let indices: Vec<usize> = content.units().map(|u| u.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(content.full_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_spreadsheet_units_labelled_by_sheet() {
        let content = DocumentContent::Spreadsheet(SpreadsheetContent {
            metadata: FileMetadata::default(),
            sheets: vec![
                Sheet {
                    name: "Revenue".into(),
                    rows: vec![vec!["a".into(), "b".into()]],
                },
                Sheet {
                    name: "Costs".into(),
                    rows: vec![vec!["c".into()]],
                },
            ],
        });
        let units: Vec<Unit> = content.units().collect();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].label.as_deref(), Some("Revenue"));
        assert_eq!(units[0].text, "a\tb");
        assert_eq!(units[1].index, 2);

        let tables: Vec<Table> = content.tables().collect();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].dim(), (1, 2));
    }

    #[test]
    fn test_email_body_prefers_plain_text() {
        let mut email = EmailContent::default();
        email.body_html = Some("<p>hi</p>".into());
        assert_eq!(email.body(), "<p>hi</p>");
        email.body_plain = Some("hi".into());
        assert_eq!(email.body(), "hi");
    }

    #[test]
    fn test_single_unit_formats_have_one_unit() {
        let content = DocumentContent::Text(TextContent {
            metadata: FileMetadata::default(),
            text: "hello".into(),
        });
        assert_eq!(content.units().count(), 1);
        assert_eq!(content.images().count(), 0);
        assert_eq!(content.tables().count(), 0);
    }
}
