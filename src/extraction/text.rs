//! Plain-text family extractor (txt, csv, tsv, md, json, log).
//!
//! These formats have no internal structure worth modelling, so the whole
//! body is one unit. Decoding is lenient: a byte-order mark selects UTF-16
//! when present, everything else is treated as UTF-8 with replacement.

use crate::error::Result;
use crate::extraction::{ContentStream, Extractor};
use crate::types::{DocumentContent, FileMetadata, TextContent};

pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let text = decode_text(data);
        let metadata = FileMetadata::from_path_hint(path_hint);
        Ok(ContentStream::one(DocumentContent::Text(TextContent { metadata, text })))
    }
}

fn decode_text(data: &[u8]) -> String {
    if let Some(rest) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(data).into_owned()
}

fn decode_utf16(data: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data.chunks_exact(2).map(|c| combine([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}
