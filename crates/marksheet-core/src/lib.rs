use std::path::Path;

use thiserror::Error;

pub mod aggregate;
pub mod catalog;
pub mod config_file;
pub mod page;
pub mod record;
pub mod rubric;
pub mod scoring;

// Re-export for convenience
pub use aggregate::{AggregatedStudent, AggregatedTable, AggregationKey, aggregate_records};
pub use catalog::{CatalogError, GradeLevel, Stream, Subject, SubjectCatalog};
pub use page::{ExtractionStrategy, MIN_PAGE_CHARS, PageContent, PageText, extract_page_text};
pub use record::{ExtractionResult, Mark, SkipStats, StudentRecord};
pub use rubric::{GradeBand, GradeRubric};
pub use scoring::{ApiSummary, ApiValue, BandCount, DistributionReport, ReportScope, score_column};

/// Errors produced by a [`PdfBackend`] while turning a document into text.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("document is encrypted: {0}")]
    Encrypted(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("no usable text on any of {pages} page(s)")]
    NoText { pages: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors provide the low-level text extraction step; segmentation and
/// field parsing live in `marksheet-parsing`. Backends are expected to apply
/// the per-page fallback chain in [`page::extract_page_text`].
pub trait PdfBackend: Send + Sync {
    /// Extract the full text content of a document, one page after another.
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;

    /// Extract each page separately, recording the strategy that produced it.
    ///
    /// The default treats the whole document as a single layout page.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, BackendError> {
        Ok(vec![PageText {
            text: self.extract_text(path)?,
            strategy: ExtractionStrategy::Layout,
        }])
    }
}
