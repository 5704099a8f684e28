//! Spreadsheet extractor (xlsx/xlsm, legacy xls, ods), backed by calamine.
//!
//! Each registered extension gets its own [`SpreadsheetKind`] so the right
//! calamine reader and the right encryption probe run; the processing after
//! the workbook is open is shared.

use std::io::Cursor;

use calamine::{Data, Range, Reader};

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::guards::archive::{ArchiveLimits, open_guarded};
use crate::guards::encryption::{odf_encrypted, ooxml_encrypted, xls_encrypted};
use crate::types::{DocumentContent, FileMetadata, Sheet, SpreadsheetContent};

/// Which container family a spreadsheet identifier mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Xls,
    Ods,
}

pub struct SpreadsheetExtractor {
    kind: SpreadsheetKind,
}

impl SpreadsheetExtractor {
    pub fn new(kind: SpreadsheetKind) -> Self {
        Self { kind }
    }
}

impl Extractor for SpreadsheetExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let sheets = match self.kind {
            SpreadsheetKind::Xlsx => {
                if ooxml_encrypted(data) {
                    return Err(DocsieveError::encrypted("workbook is password-protected"));
                }
                drop(open_guarded(data, &ArchiveLimits::DEFAULT)?);
                let workbook = calamine::Xlsx::new(Cursor::new(data))
                    .map_err(|e| DocsieveError::parsing(format!("failed to parse XLSX workbook: {e}")))?;
                read_sheets(workbook)
            }
            SpreadsheetKind::Xls => {
                if xls_encrypted(data) {
                    return Err(DocsieveError::encrypted("workbook is password-protected"));
                }
                let workbook = calamine::Xls::new(Cursor::new(data))
                    .map_err(|e| DocsieveError::parsing(format!("failed to parse XLS workbook: {e}")))?;
                read_sheets(workbook)
            }
            SpreadsheetKind::Ods => {
                if odf_encrypted(data)? {
                    return Err(DocsieveError::encrypted("spreadsheet is encrypted"));
                }
                drop(open_guarded(data, &ArchiveLimits::DEFAULT)?);
                let workbook = calamine::Ods::new(Cursor::new(data))
                    .map_err(|e| DocsieveError::parsing(format!("failed to parse ODS workbook: {e}")))?;
                read_sheets(workbook)
            }
        };

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        metadata.insert_extra("sheet_count", sheets.len());
        let names: Vec<serde_json::Value> = sheets.iter().map(|s| s.name.clone().into()).collect();
        metadata.insert_extra("sheet_names", names);

        Ok(ContentStream::one(DocumentContent::Spreadsheet(SpreadsheetContent {
            metadata,
            sheets,
        })))
    }
}

fn read_sheets<RS, R>(mut workbook: R) -> Vec<Sheet>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
{
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in &names {
        if let Ok(range) = workbook.worksheet_range(name) {
            sheets.push(Sheet {
                name: name.clone(),
                rows: range_rows(&range),
            });
        }
    }
    sheets
}

fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range.rows().map(|row| row.iter().map(cell_text).collect()).collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("{dt:?}"),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR: {e:?}"),
    }
}
