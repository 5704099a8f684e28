//! OOXML extractors: Word documents (docx/docm) and PowerPoint
//! presentations (pptx/pptm).
//!
//! An OOXML file is a ZIP of XML parts. Extraction opens the package through
//! the archive guard, checks the encryption probe first (an encrypted OOXML
//! file is an OLE wrapper, not a ZIP), then walks the part XML with
//! namespace-agnostic local-name matching - producers disagree on prefixes
//! but not on local names.

use std::io::{Cursor, Read, Seek};

use roxmltree::{Document, Node};
use zip::ZipArchive;

use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::guards::archive::{ArchiveLimits, open_guarded, read_entry_by_name};
use crate::guards::encryption::ooxml_encrypted;
use crate::types::{
    DocumentContent, FileMetadata, Image, PresentationContent, Slide, Table, WordDocumentContent,
};

pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let mut archive = open_package(data)?;

        let document_xml = read_part(&mut archive, "word/document.xml")?
            .ok_or_else(|| DocsieveError::parsing("OOXML package has no word/document.xml"))?;
        let doc = parse_xml(&document_xml, "word/document.xml")?;

        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();
        for node in doc.root_element().descendants() {
            match node.tag_name().name() {
                "p" if !inside_table(node) => {
                    let text = runs_text(node);
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                }
                "tbl" if !inside_table(node) => {
                    tables.push(Table {
                        unit_index: None,
                        table_index: tables.len() + 1,
                        rows: table_rows(node),
                    });
                }
                _ => {}
            }
        }

        let images = media_images(&mut archive, "word/media/", None)?;

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        apply_core_properties(&mut archive, &mut metadata)?;

        Ok(ContentStream::one(DocumentContent::Document(WordDocumentContent {
            metadata,
            paragraphs,
            tables,
            images,
        })))
    }
}

pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        let mut archive = open_package(data)?;

        let mut slide_parts: Vec<(usize, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<usize>()
                    .ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        slide_parts.sort();

        let mut slides = Vec::with_capacity(slide_parts.len());
        for (position, (_, part)) in slide_parts.iter().enumerate() {
            let number = position + 1;
            let xml = read_part(&mut archive, part)?
                .ok_or_else(|| DocsieveError::parsing(format!("slide part '{part}' vanished from package")))?;
            let doc = parse_xml(&xml, part)?;
            let root = doc.root_element();

            let mut lines = Vec::new();
            let mut title = None;
            let mut tables = Vec::new();
            for node in root.descendants() {
                match node.tag_name().name() {
                    "sp" => {
                        let text = shape_text(node);
                        if text.is_empty() {
                            continue;
                        }
                        if title.is_none() && is_title_shape(node) {
                            title = Some(text.clone());
                        }
                        lines.push(text);
                    }
                    "tbl" => {
                        tables.push(Table {
                            unit_index: Some(number),
                            table_index: tables.len() + 1,
                            rows: table_rows(node),
                        });
                    }
                    _ => {}
                }
            }

            let images = slide_images(&mut archive, part, number)?;

            slides.push(Slide {
                number,
                title,
                text: lines.join("\n"),
                tables,
                images,
            });
        }

        let mut metadata = FileMetadata::from_path_hint(path_hint);
        apply_core_properties(&mut archive, &mut metadata)?;
        metadata.insert_extra("slide_count", slides.len());

        Ok(ContentStream::one(DocumentContent::Presentation(PresentationContent {
            metadata,
            slides,
        })))
    }
}

/// Open an OOXML package: encryption probe first, then the guarded ZIP open.
fn open_package(data: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    if ooxml_encrypted(data) {
        return Err(DocsieveError::encrypted("OOXML document is password-protected"));
    }
    open_guarded(data, &ArchiveLimits::DEFAULT)
}

/// Read an XML part as a string, `None` when the part does not exist.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(_) => {}
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let bytes = read_entry_by_name(archive, name, &ArchiveLimits::DEFAULT)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn parse_xml<'a>(xml: &'a str, part: &str) -> Result<Document<'a>> {
    Document::parse(xml).map_err(|e| DocsieveError::parsing(format!("failed to parse {part}: {e}")))
}

fn inside_table(node: Node<'_, '_>) -> bool {
    node.ancestors().skip(1).any(|a| a.tag_name().name() == "tbl")
}

/// Concatenated run text (`w:t` / `a:t`) below a node, with explicit breaks
/// and tabs rendered as whitespace.
fn runs_text(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.descendants() {
        match child.tag_name().name() {
            "t" => {
                if let Some(text) = child.text() {
                    out.push_str(text);
                }
            }
            "br" => out.push('\n'),
            "tab" => out.push('\t'),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// One text line per paragraph inside a drawing shape.
fn shape_text(shape: Node<'_, '_>) -> String {
    let mut lines = Vec::new();
    for paragraph in shape.descendants().filter(|n| n.tag_name().name() == "p") {
        let text = runs_text(paragraph);
        if !text.is_empty() {
            lines.push(text);
        }
    }
    lines.join("\n")
}

/// Whether a shape is the slide's title placeholder.
fn is_title_shape(shape: Node<'_, '_>) -> bool {
    shape
        .descendants()
        .filter(|n| n.tag_name().name() == "ph")
        .filter_map(|n| n.attribute("type"))
        .any(|t| t == "title" || t == "ctrTitle")
}

fn table_rows(table: Node<'_, '_>) -> Vec<Vec<String>> {
    table
        .descendants()
        .filter(|n| n.tag_name().name() == "tr")
        .map(|row| {
            row.descendants()
                .filter(|n| n.tag_name().name() == "tc")
                .map(runs_text)
                .collect()
        })
        .collect()
}

/// Collect embedded media entries under `prefix` as images, in name order.
fn media_images<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    prefix: &str,
    unit_index: Option<usize>,
) -> Result<Vec<Image>> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && !n.ends_with('/'))
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

/// Images referenced by one slide, located through its relationships part.
fn slide_images<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    slide_part: &str,
    slide_number: usize,
) -> Result<Vec<Image>> {
    let rels_part = match slide_part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => return Ok(Vec::new()),
    };
    let Some(xml) = read_part(archive, &rels_part)? else {
        return Ok(Vec::new());
    };
    let doc = parse_xml(&xml, &rels_part)?;

    let mut targets: Vec<String> = doc
        .root_element()
        .descendants()
        .filter(|n| n.tag_name().name() == "Relationship")
        .filter(|n| n.attribute("Type").is_some_and(|t| t.ends_with("/image")))
        .filter_map(|n| n.attribute("Target"))
        .map(|target| target.replace("../", "ppt/"))
        .collect();
    targets.sort();

    let mut images = Vec::with_capacity(targets.len());
    for (i, target) in targets.iter().enumerate() {
        let Some(bytes) = read_optional_bytes(archive, target)? else {
            continue;
        };
        images.push(Image {
            unit_index: Some(slide_number),
            image_index: i + 1,
            content_type: mime_guess::from_path(target).first_or_octet_stream().essence_str().to_string(),
            width: None,
            height: None,
            data: Some(bytes),
            caption: None,
            description: None,
        });
    }
    Ok(images)
}

fn read_optional_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(_) => {}
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    read_entry_by_name(archive, name, &ArchiveLimits::DEFAULT).map(Some)
}

/// Fold docProps/core.xml into the file metadata. The part is optional.
fn apply_core_properties<R: Read + Seek>(archive: &mut ZipArchive<R>, metadata: &mut FileMetadata) -> Result<()> {
    let Some(xml) = read_part(archive, "docProps/core.xml")? else {
        return Ok(());
    };
    let doc = parse_xml(&xml, "docProps/core.xml")?;
    let root = doc.root_element();

    metadata.author = element_text(root, "creator").or(metadata.author.take());
    metadata.created = element_text(root, "created").or(metadata.created.take());
    metadata.modified = element_text(root, "modified").or(metadata.modified.take());
    if let Some(title) = element_text(root, "title") {
        metadata.insert_extra("title", title);
    }
    if let Some(subject) = element_text(root, "subject") {
        metadata.insert_extra("subject", subject);
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
