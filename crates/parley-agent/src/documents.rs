// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local document ingestion.
//!
//! Uploaded files are stored under the configured directory. The returned
//! record carries display data (title, category, summary) and the storage
//! path, which is the only thing kept in topic state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_config::model::DocumentsConfig;
use parley_core::types::{AdapterType, DocumentRecord, HealthStatus};
use parley_core::{DocumentIngestor, ParleyError, PluginAdapter};
use tracing::info;

pub struct LocalDocumentIngestor {
    storage_dir: PathBuf,
    summary_chars: usize,
}

impl LocalDocumentIngestor {
    pub fn new(config: &DocumentsConfig) -> Self {
        Self {
            storage_dir: PathBuf::from(&config.storage_dir),
            summary_chars: config.summary_chars,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

fn category_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "pdf",
        "txt" | "md" | "markdown" | "rst" => "text",
        "csv" | "tsv" | "json" | "jsonl" | "xml" | "yaml" | "yml" | "toml" => "data",
        "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "cpp" | "h" | "sh" => "code",
        "doc" | "docx" | "odt" | "rtf" => "office",
        _ => "other",
    }
}

/// Leading text with whitespace collapsed, cut at `max_chars`.
fn summarize(bytes: &[u8], max_chars: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                return "Empty document".to_string();
            }
            if collapsed.chars().count() > max_chars {
                let cut: String = collapsed.chars().take(max_chars).collect();
                format!("{cut}…")
            } else {
                collapsed
            }
        }
        Err(_) => format!("Binary document, {} bytes", bytes.len()),
    }
}

#[async_trait]
impl PluginAdapter for LocalDocumentIngestor {
    fn name(&self) -> &str {
        "local-documents"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentIngestion
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match tokio::fs::metadata(&self.storage_dir).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.storage_dir.display()
            ))),
            // Created on first upload.
            Err(_) => Ok(HealthStatus::Healthy),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentIngestor for LocalDocumentIngestor {
    async fn ingest(&self, file_name: &str, bytes: &[u8]) -> Result<DocumentRecord, ParleyError> {
        let safe_name = sanitize_file_name(file_name);
        let stored_name = format!("{}-{safe_name}", uuid::Uuid::new_v4().simple());
        let path = self.storage_dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.storage_dir)
            .await
            .map_err(ParleyError::storage)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(ParleyError::storage)?;

        let title = Path::new(&safe_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        let record = DocumentRecord {
            title,
            category: category_for(&safe_name).to_string(),
            summary: summarize(bytes, self.summary_chars),
            storage_path: path.to_string_lossy().into_owned(),
        };
        info!(
            path = %record.storage_path,
            category = %record.category,
            size = bytes.len(),
            "document stored"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingestor(dir: &tempfile::TempDir, summary_chars: usize) -> LocalDocumentIngestor {
        LocalDocumentIngestor::new(&DocumentsConfig {
            storage_dir: dir.path().join("docs").to_string_lossy().into_owned(),
            summary_chars,
        })
    }

    #[tokio::test]
    async fn stores_text_document_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(&dir, 20);

        let record = ingestor
            .ingest("Project Plan.md", b"# Plan\n\nShip   the bridge before Friday.")
            .await
            .unwrap();

        assert_eq!(record.title, "Project_Plan");
        assert_eq!(record.category, "text");
        assert_eq!(record.summary, "# Plan Ship the brid…");
        let stored = tokio::fs::read(&record.storage_path).await.unwrap();
        assert!(stored.starts_with(b"# Plan"));
        assert!(record.storage_path.ends_with("Project_Plan.md"));
    }

    #[tokio::test]
    async fn binary_document_gets_size_summary() {
        let dir = tempfile::tempdir().unwrap();
        let record = ingestor(&dir, 100)
            .ingest("scan.pdf", &[0xff, 0xfe, 0x00, 0x81])
            .await
            .unwrap();
        assert_eq!(record.category, "pdf");
        assert_eq!(record.summary, "Binary document, 4 bytes");
    }

    #[test]
    fn file_names_cannot_escape_the_directory() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "document");
        assert_eq!(category_for("data.CSV"), "data");
        assert_eq!(category_for("noext"), "other");
    }
}
