use crate::chunking::{chunk_pages, ChunkerConfig, PageChunk};
use crate::error::IngestError;
use crate::extractor::extract_page_texts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List the `.pdf` files directly inside `folder` (non-recursive), sorted.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Derive the document identifier from the file stem, with spaces and
/// underscores replaced by hyphens.
pub fn document_name(path: &Path) -> Result<String, IngestError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;

    Ok(stem.replace([' ', '_'], "-"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_name: String,
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// One chunk ready for the store: unique id, display text, source page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub text: String,
    pub page_number: u32,
}

/// Assign ids of the form `{document_name}_p{page_number}-{chunk_index}`,
/// where `chunk_index` is the zero-based emission position over the whole
/// document (it does not reset per page).
pub fn chunk_records(document_name: &str, chunks: &[PageChunk]) -> Vec<ChunkRecord> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| ChunkRecord {
            chunk_id: format!("{}_p{}-{}", document_name, chunk.page_number, index),
            text: chunk.text.clone(),
            page_number: chunk.page_number,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub fingerprint: DocumentFingerprint,
    pub records: Vec<ChunkRecord>,
}

/// Extract, chunk, and label one PDF. Unreadable files are fatal for the
/// ingestion run and surface as-is.
pub fn ingest_file(path: &Path, config: ChunkerConfig) -> Result<IngestedDocument, IngestError> {
    let name = document_name(path)?;
    let checksum = digest_file(path)?;
    let pages = extract_page_texts(path)?;
    let chunks = chunk_pages(&pages, config)?;

    Ok(IngestedDocument {
        fingerprint: DocumentFingerprint {
            document_name: name.clone(),
            source_path: path.to_string_lossy().to_string(),
            checksum,
            ingested_at: Utc::now(),
        },
        records: chunk_records(&name, &chunks),
    })
}

#[cfg(test)]
mod tests {
    use super::{chunk_records, digest_file, discover_pdf_files, document_name};
    use crate::chunking::PageChunk;
    use std::collections::HashSet;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn discovery_ignores_nested_folders() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("b.PDF")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"text"))?;
        File::create(nested.join("c.pdf"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| path.parent() == Some(base)));
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.pdf");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn document_name_replaces_spaces_and_underscores() {
        let name = document_name(Path::new("/docs/annual report_2023 final.pdf")).unwrap();
        assert_eq!(name, "annual-report-2023-final");
    }

    #[test]
    fn chunk_ids_carry_page_and_global_index() {
        let chunks = vec![
            PageChunk {
                text: "[Page no. 1] \"a\"".to_string(),
                page_number: 1,
            },
            PageChunk {
                text: "[Page no. 1] \"b\"".to_string(),
                page_number: 1,
            },
            PageChunk {
                text: "[Page no. 2] \"c\"".to_string(),
                page_number: 2,
            },
        ];

        let records = chunk_records("manual", &chunks);
        let ids: Vec<&str> = records.iter().map(|record| record.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["manual_p1-0", "manual_p1-1", "manual_p2-2"]);

        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), records.len());
    }
}
