//! OpenDocument extractors: text documents (odt) and presentations (odp).
//!
//! Same container discipline as the OOXML extractors - manifest-based
//! encryption probe first, then the guarded ZIP open - but the content lives
//! in a single `content.xml` part and document metadata in `meta.xml`.

use std::io::{Cursor, Read, Seek};

use roxmltree::{Document, Node};
use zip::ZipArchive;

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::guards::archive::{ArchiveLimits, open_guarded, read_entry_by_name};
use crate::guards::encryption::odf_encrypted;
use crate::types::{
    DocumentContent, FileMetadata, Image, PresentationContent, Slide, Table, WordDocumentContent,
};

pub struct OdtExtractor;

impl Extractor for OdtExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let mut archive = open_package(data)?;
        let content = read_content_xml(&mut archive)?;
        let doc = parse_xml(&content)?;

        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();
        for node in doc.root_element().descendants() {
            match node.tag_name().name() {
                "p" | "h" if !inside_table(node) => {
                    let text = node_text(node);
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                }
                "table" if !inside_table(node) => {
                    tables.push(Table {
                        unit_index: None,
                        table_index: tables.len() + 1,
                        rows: table_rows(node),
                    });
                }
                _ => {}
            }
        }

        let images = picture_images(&mut archive, None)?;

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        apply_meta_xml(&mut archive, &mut metadata)?;

        Ok(ContentStream::one(DocumentContent::Document(WordDocumentContent {
            metadata,
            paragraphs,
            tables,
            images,
        })))
    }
}

pub struct OdpExtractor;

impl Extractor for OdpExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let mut archive = open_package(data)?;
        let content = read_content_xml(&mut archive)?;
        let doc = parse_xml(&content)?;

        let mut slides = Vec::new();
        for page in doc.root_element().descendants().filter(|n| n.tag_name().name() == "page") {
            let number = slides.len() + 1;

            let mut lines = Vec::new();
            let mut title = None;
            let mut tables = Vec::new();
            for node in page.descendants() {
                match node.tag_name().name() {
                    "frame" => {
                        let text = frame_text(node);
                        if text.is_empty() {
                            continue;
                        }
                        if title.is_none() && frame_class(node) == Some("title") {
                            title = Some(text.clone());
                        }
                        lines.push(text);
                    }
                    "table" => {
                        tables.push(Table {
                            unit_index: Some(number),
                            table_index: tables.len() + 1,
                            rows: table_rows(node),
                        });
                    }
                    _ => {}
                }
            }

            slides.push(Slide {
                number,
                title,
                text: lines.join("\n"),
                tables,
                images: Vec::new(),
            });
        }

        // ODF keeps media deck-level under Pictures/; attach them to the
        // first slide.
        let deck_images = picture_images(&mut archive, Some(1))?;
        if let Some(first) = slides.first_mut() {
            first.images = deck_images;
        }

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        apply_meta_xml(&mut archive, &mut metadata)?;
        metadata.insert_extra("slide_count", slides.len());

        Ok(ContentStream::one(DocumentContent::Presentation(PresentationContent {
            metadata,
            slides,
        })))
    }
}

fn open_package(data: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    if odf_encrypted(data)? {
        return Err(DocsieveError::encrypted("OpenDocument file is encrypted"));
    }
    open_guarded(data, &ArchiveLimits::DEFAULT)
}

fn read_content_xml<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    if archive.by_name("content.xml").is_err() {
        return Err(DocsieveError::parsing("OpenDocument package has no content.xml"));
    }
    let bytes = read_entry_by_name(archive, "content.xml", &ArchiveLimits::DEFAULT)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_xml(xml: &str) -> Result<Document<'_>> {
    Document::parse(xml).map_err(|e| DocsieveError::parsing(format!("failed to parse content.xml: {e}")))
}

fn inside_table(node: Node<'_, '_>) -> bool {
    node.ancestors().skip(1).any(|a| a.tag_name().name() == "table")
}

/// All character data below a node, ODF line breaks and tabs included.
fn node_text(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.descendants() {
        match child.tag_name().name() {
            "line-break" => out.push('\n'),
            "tab" => out.push('\t'),
            "s" => out.push(' '),
            _ => {
                if child.is_text() {
                    if let Some(text) = child.text() {
                        out.push_str(text);
                    }
                }
            }
        }
    }
    out.trim().to_string()
}

/// The `presentation:class` attribute, matched by local name since the
/// namespace prefix varies by producer.
fn frame_class<'a>(frame: Node<'a, '_>) -> Option<&'a str> {
    frame
        .attributes()
        .find(|a| a.name() == "class")
        .map(|a| a.value())
}

fn frame_text(frame: Node<'_, '_>) -> String {
    let mut lines = Vec::new();
    for paragraph in frame.descendants().filter(|n| n.tag_name().name() == "p") {
        let text = node_text(paragraph);
        if !text.is_empty() {
            lines.push(text);
        }
    }
    lines.join("\n")
}

fn table_rows(table: Node<'_, '_>) -> Vec<Vec<String>> {
    table
        .descendants()
        .filter(|n| n.tag_name().name() == "table-row")
        .map(|row| {
            row.descendants()
                .filter(|n| n.tag_name().name() == "table-cell")
                .map(node_text)
                .collect()
        })
        .collect()
}

/// Media entries under `Pictures/`, in name order.
fn picture_images<R: Read + Seek>(archive: &mut ZipArchive<R>, unit_index: Option<usize>) -> Result<Vec<Image>> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("Pictures/") && !n.ends_with('/'))
        .map(str::to_string)
        .collect();
    names.sort();

    let mut images = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let data = read_entry_by_name(archive, name, &ArchiveLimits::DEFAULT)?;
        images.push(Image {
            unit_index,
            image_index: i + 1,
            content_type: mime_guess::from_path(name).first_or_octet_stream().essence_str().to_string(),
            width: None,
            height: None,
            data: Some(data),
            caption: None,
            description: None,
        });
    }
    Ok(images)
}

/// Fold meta.xml into the file metadata. The part is optional.
fn apply_meta_xml<R: Read + Seek>(archive: &mut ZipArchive<R>, metadata: &mut FileMetadata) -> Result<()> {
    if archive.by_name("meta.xml").is_err() {
        return Ok(());
    }
    let bytes = read_entry_by_name(archive, "meta.xml", &ArchiveLimits::DEFAULT)?;
    let xml = String::from_utf8_lossy(&bytes).into_owned();
    let doc =
        Document::parse(&xml).map_err(|e| DocsieveError::parsing(format!("failed to parse meta.xml: {e}")))?;
    let root = doc.root_element();

    metadata.author = element_text(root, "creator")
        .or_else(|| element_text(root, "initial-creator"))
        .or(metadata.author.take());
    metadata.created = element_text(root, "creation-date").or(metadata.created.take());
    metadata.modified = element_text(root, "date").or(metadata.modified.take());
    if let Some(title) = element_text(root, "title") {
        metadata.insert_extra("title", title);
    }
    Ok(())
}

fn element_text(root: Node<'_, '_>, local_name: &str) -> Option<String> {
    root.descendants()
        .find(|n| n.tag_name().name() == local_name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
