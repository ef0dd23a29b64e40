//! Batch processing with per-document partial failure.
//!
//! A document that cannot be read or parsed is logged, recorded as a failed
//! [`DocumentOutcome`], and the batch moves on to the next one.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use marksheet_core::{PdfBackend, SkipStats, StudentRecord};
use marksheet_parsing::MarkSheetExtractor;

use crate::archive::expand_archive;
use crate::{DocumentKind, extract_document};

/// A single document ready to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub path: PathBuf,
    /// Display name: the input path, or `bundle [entry]` for bundled documents.
    pub label: String,
}

/// Inputs with bundles expanded into scratch directories.
///
/// The scratch directories live as long as this value.
#[derive(Debug)]
pub struct PreparedDocuments {
    sources: Vec<DocumentSource>,
    failures: Vec<DocumentOutcome>,
    _scratch: Vec<TempDir>,
}

impl PreparedDocuments {
    /// Expand every bundle in `paths`; other paths become sources unchanged.
    pub fn prepare(paths: &[PathBuf]) -> Self {
        let mut prepared = Self {
            sources: Vec::new(),
            failures: Vec::new(),
            _scratch: Vec::new(),
        };
        for path in paths {
            if DocumentKind::from_path(path) == Some(DocumentKind::Archive) {
                prepared.add_bundle(path);
            } else {
                prepared.sources.push(DocumentSource {
                    path: path.clone(),
                    label: path.display().to_string(),
                });
            }
        }
        prepared
    }

    fn add_bundle(&mut self, path: &Path) {
        let label = path.display().to_string();
        let expanded = tempfile::tempdir()
            .map_err(|source| crate::IngestError::Io {
                path: std::env::temp_dir(),
                source,
            })
            .and_then(|scratch| expand_archive(path, scratch.path()).map(|docs| (scratch, docs)));

        match expanded {
            Ok((_, docs)) if docs.is_empty() => {
                self.fail(label, "bundle contains no PDF or text documents".to_string());
            }
            Ok((scratch, docs)) => {
                self.sources.extend(docs.into_iter().map(|doc| DocumentSource {
                    label: format!("{label} [{}]", doc.name),
                    path: doc.path,
                }));
                self._scratch.push(scratch);
            }
            Err(e) => self.fail(label, e.to_string()),
        }
    }

    fn fail(&mut self, label: String, reason: String) {
        tracing::warn!(document = %label, error = %reason, "skipping bundle");
        self.failures.push(DocumentOutcome {
            label,
            status: DocumentStatus::Failed(reason),
        });
    }

    pub fn sources(&self) -> &[DocumentSource] {
        &self.sources
    }

    /// Documents to parse plus bundles that already failed.
    pub fn len(&self) -> usize {
        self.sources.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentStatus {
    Parsed { students: usize, skipped: SkipStats },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutcome {
    pub label: String,
    pub status: DocumentStatus,
}

impl DocumentOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, DocumentStatus::Failed(_))
    }
}

/// Records from every parsed document plus one outcome per document.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Records in document order, then block order within each document.
    pub records: Vec<StudentRecord>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchResult {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn parsed(&self) -> usize {
        self.outcomes.len() - self.failures()
    }

    /// Append another batch after this one.
    pub fn extend(&mut self, other: BatchResult) {
        self.records.extend(other.records);
        self.outcomes.extend(other.outcomes);
    }
}

/// Parse every prepared document, continuing past failures.
///
/// `on_document` is called once per outcome, in order, including bundles
/// that failed to expand.
pub fn process_documents(
    prepared: &PreparedDocuments,
    extractor: &MarkSheetExtractor,
    backend: Option<&dyn PdfBackend>,
    on_document: &mut dyn FnMut(&DocumentOutcome),
) -> BatchResult {
    let mut batch = BatchResult::default();

    for failure in &prepared.failures {
        on_document(failure);
        batch.outcomes.push(failure.clone());
    }

    for source in &prepared.sources {
        let status = match extract_document(&source.path, extractor, backend) {
            Ok(result) => {
                tracing::info!(
                    document = %source.label,
                    students = result.records.len(),
                    blocks = result.skip_stats.total_blocks,
                    "parsed document"
                );
                let students = result.records.len();
                batch.records.extend(result.records);
                DocumentStatus::Parsed {
                    students,
                    skipped: result.skip_stats,
                }
            }
            Err(e) => {
                tracing::warn!(document = %source.label, error = %e, "skipping document");
                DocumentStatus::Failed(e.to_string())
            }
        };
        let outcome = DocumentOutcome {
            label: source.label.clone(),
            status,
        };
        on_document(&outcome);
        batch.outcomes.push(outcome);
    }

    batch
}
