//! Bundles rendered register documents into a single downloadable archive.

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A rendered document ready for packaging; `name` encodes the document kind
/// and month key (e.g. `HACCP_Temperature_2025-10.pdf`).
pub struct RenderedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Write one flat archive entry per document. No directory nesting and no
/// compression-level knobs.
pub fn package(documents: &[RenderedDocument]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for document in documents {
        writer
            .start_file(document.name.as_str(), options)
            .with_context(|| format!("add archive entry {}", document.name))?;
        writer
            .write_all(&document.bytes)
            .with_context(|| format!("write archive entry {}", document.name))?;
    }
    let cursor = writer.finish().context("finalize archive")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_contains_one_entry_per_document() {
        let documents = vec![
            RenderedDocument {
                name: "HACCP_Temperature_2025-10.pdf".to_string(),
                bytes: b"%PDF-1.7 one".to_vec(),
            },
            RenderedDocument {
                name: "HACCP_Sanificazione_2025-10.pdf".to_string(),
                bytes: b"%PDF-1.7 two".to_vec(),
            },
        ];
        let bytes = package(&documents).expect("package");
        assert!(bytes.starts_with(b"PK"));

        let mut reader = zip::ZipArchive::new(Cursor::new(bytes)).expect("reopen archive");
        assert_eq!(reader.len(), 2);
        let names: Vec<String> = (0..reader.len())
            .map(|index| reader.by_index(index).expect("entry").name().to_string())
            .collect();
        assert!(names.contains(&"HACCP_Temperature_2025-10.pdf".to_string()));
        assert!(names.contains(&"HACCP_Sanificazione_2025-10.pdf".to_string()));
    }

    #[test]
    fn empty_input_still_yields_a_valid_archive() {
        let bytes = package(&[]).expect("package");
        let reader = zip::ZipArchive::new(Cursor::new(bytes)).expect("reopen archive");
        assert_eq!(reader.len(), 0);
    }
}
