//! Guards must fire before any content is produced: an encrypted or
//! bomb-like input yields an error and zero results, never partial output.

#![cfg(feature = "archives")]

use std::io::{Cursor, Write};

use docsieve::{DocsieveError, extract_bytes};
use zip::write::{SimpleFileOptions, ZipWriter};

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

#[cfg(feature = "office")]
#[test]
fn test_encrypted_odt_is_rejected_before_parsing() {
    // Manifest declares encrypted entries; content.xml is deliberately
    // absent so reaching the parser would produce a different error.
    let manifest = r#"<?xml version="1.0"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
  <manifest:file-entry manifest:full-path="content.xml">
    <manifest:encryption-data manifest:checksum-type="SHA1/1K"/>
  </manifest:file-entry>
</manifest:manifest>"#;
    let bytes = build_zip(&[("mimetype", b"application/vnd.oasis.opendocument.text"), (
        "META-INF/manifest.xml",
        manifest.as_bytes(),
    )]);

    let err = extract_bytes(&bytes, Some("letter.odt")).unwrap_err();
    assert!(matches!(err, DocsieveError::Encrypted { .. }), "got: {err:?}");
}

#[cfg(feature = "excel")]
#[test]
fn test_encrypted_ods_is_rejected_before_parsing() {
    let manifest = r#"<?xml version="1.0"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
  <manifest:file-entry manifest:full-path="content.xml">
    <manifest:encryption-data/>
  </manifest:file-entry>
</manifest:manifest>"#;
    let bytes = build_zip(&[("META-INF/manifest.xml", manifest.as_bytes())]);

    let err = extract_bytes(&bytes, Some("book.ods")).unwrap_err();
    assert!(matches!(err, DocsieveError::Encrypted { .. }), "got: {err:?}");
}

#[test]
fn test_high_ratio_archive_is_a_resource_limit() {
    // A megabyte of zeros compresses far past the allowed ratio.
    let zeros = vec![0u8; 1024 * 1024];
    let bytes = build_zip(&[("innocent.txt", zeros.as_slice())]);

    let err = extract_bytes(&bytes, Some("bundle.zip")).unwrap_err();
    assert!(matches!(err, DocsieveError::ResourceLimit { .. }), "got: {err:?}");
}

#[test]
fn test_many_small_entries_alone_are_fine() {
    // Entry count is never a rejection criterion on its own.
    let entries: Vec<(String, Vec<u8>)> = (0..300)
        .map(|i| (format!("f{i}.txt"), format!("content {i}").into_bytes()))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_slice()))
        .collect();
    let bytes = build_zip(&borrowed);

    let results: Vec<_> = extract_bytes(&bytes, Some("many.zip")).unwrap().collect();
    assert_eq!(results.len(), 300);
    assert!(results.iter().all(Result::is_ok));
}

#[test]
fn test_guarded_failure_yields_zero_results() {
    let zeros = vec![0u8; 1024 * 1024];
    let bytes = build_zip(&[("a.txt", b"visible".as_slice()), ("bomb.bin", zeros.as_slice())]);

    // The guard validates the whole directory up front, so not even the
    // harmless first entry comes out.
    assert!(extract_bytes(&bytes, Some("mixed.zip")).is_err());
}

const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FREESECT: u32 = 0xFFFF_FFFF;

/// Minimal valid v3 compound file holding one stream in the mini stream.
/// Enough structure for the OLE encryption probes to find the stream.
fn build_cfb(stream_name: &str, stream_bytes: &[u8]) -> Vec<u8> {
    let sector = 512usize;
    // Layout: sector 0 = FAT, 1 = directory, 2 = mini FAT, 3 = mini stream.
    let mut data = vec![0u8; sector * 5];

    data[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    data[26..28].copy_from_slice(&3u16.to_le_bytes()); // major version
    data[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
    data[30..32].copy_from_slice(&9u16.to_le_bytes()); // 512-byte sectors
    data[32..34].copy_from_slice(&6u16.to_le_bytes()); // 64-byte mini sectors
    data[44..48].copy_from_slice(&1u32.to_le_bytes()); // one FAT sector
    data[48..52].copy_from_slice(&1u32.to_le_bytes()); // directory at sector 1
    data[56..60].copy_from_slice(&4096u32.to_le_bytes());
    data[60..64].copy_from_slice(&2u32.to_le_bytes()); // mini FAT at sector 2
    data[64..68].copy_from_slice(&1u32.to_le_bytes());
    data[68..72].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
    // Header DIFAT: FAT lives in sector 0.
    data[76..80].copy_from_slice(&0u32.to_le_bytes());
    for i in 1..109 {
        data[76 + i * 4..80 + i * 4].copy_from_slice(&FREESECT.to_le_bytes());
    }

    // FAT sector 0: sectors 0..=3 are each a single-sector chain.
    let fat_base = sector;
    for i in 0..4 {
        data[fat_base + i * 4..fat_base + i * 4 + 4].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
    }
    for i in 4..sector / 4 {
        data[fat_base + i * 4..fat_base + i * 4 + 4].copy_from_slice(&FREESECT.to_le_bytes());
    }

    // Directory sector 1: root entry + one stream entry.
    let dir_base = sector * 2;
    write_dir_entry(&mut data, dir_base, "Root Entry", 5, 3, 64);
    write_dir_entry(&mut data, dir_base + 128, stream_name, 2, 0, stream_bytes.len() as u32);

    // Mini FAT sector 2: mini sector 0 terminates.
    let mini_fat_base = sector * 3;
    data[mini_fat_base..mini_fat_base + 4].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
    for i in 1..sector / 4 {
        data[mini_fat_base + i * 4..mini_fat_base + i * 4 + 4].copy_from_slice(&FREESECT.to_le_bytes());
    }

    // Mini stream backing bytes live in sector 3.
    let mini_base = sector * 4;
    data[mini_base..mini_base + stream_bytes.len()].copy_from_slice(stream_bytes);

    data
}

fn write_dir_entry(data: &mut [u8], base: usize, name: &str, object_type: u8, start: u32, size: u32) {
    let utf16: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in utf16.iter().enumerate() {
        data[base + i * 2..base + i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    let name_len = (utf16.len() as u16 + 1) * 2;
    data[base + 64..base + 66].copy_from_slice(&name_len.to_le_bytes());
    data[base + 66] = object_type;
    data[base + 116..base + 120].copy_from_slice(&start.to_le_bytes());
    data[base + 120..base + 124].copy_from_slice(&size.to_le_bytes());
}

#[cfg(feature = "office")]
#[test]
fn test_encrypted_docx_is_rejected_before_parsing() {
    // Encrypted OOXML is an OLE wrapper carrying an EncryptionInfo stream,
    // not a ZIP; the probe must fire before the package opener runs.
    let bytes = build_cfb("EncryptionInfo", b"\x04\x00\x04\x00agile encryption descriptor");

    let err = extract_bytes(&bytes, Some("report.docx")).unwrap_err();
    assert!(matches!(err, DocsieveError::Encrypted { .. }), "got: {err:?}");
}

#[cfg(feature = "excel")]
#[test]
fn test_encrypted_xlsx_is_rejected_before_parsing() {
    let bytes = build_cfb("EncryptedPackage", b"\x00\x00\x00\x00\x00\x00\x00\x00ciphertext");

    let err = extract_bytes(&bytes, Some("book.xlsx")).unwrap_err();
    assert!(matches!(err, DocsieveError::Encrypted { .. }), "got: {err:?}");
}

#[cfg(feature = "excel")]
#[test]
fn test_encrypted_xls_is_rejected_before_parsing() {
    // BOF record, then the FILEPASS record that marks workbook protection.
    let mut workbook = Vec::new();
    workbook.extend_from_slice(&0x0809u16.to_le_bytes());
    workbook.extend_from_slice(&4u16.to_le_bytes());
    workbook.extend_from_slice(&[0u8; 4]);
    workbook.extend_from_slice(&0x002Fu16.to_le_bytes());
    workbook.extend_from_slice(&2u16.to_le_bytes());
    workbook.extend_from_slice(&[0u8; 2]);
    let bytes = build_cfb("Workbook", &workbook);

    let err = extract_bytes(&bytes, Some("ledger.xls")).unwrap_err();
    assert!(matches!(err, DocsieveError::Encrypted { .. }), "got: {err:?}");
}
