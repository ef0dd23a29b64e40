use std::path::Path;

use thiserror::Error;

pub mod config;
pub mod extractor;
pub mod fields;
pub mod marks;
pub mod segment;
pub mod text_processing;

pub use config::{ListOverride, ParsingConfig, ParsingConfigBuilder};
pub use extractor::{BlockAnalysis, MarkSheetExtractor, ParsedBlock, SkipReason};
pub use fields::{IdentityField, IdentityFields};
pub use marks::{MarkHit, MarkStrategy, SubjectRow};
pub use segment::StudentBlocks;
// Re-export domain types from core (canonical definitions live there)
pub use marksheet_core::{
    BackendError, ExtractionResult, PdfBackend, SkipStats, StudentRecord, SubjectCatalog,
};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("backend error: {0}")]
    Backend(#[from] marksheet_core::BackendError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Extract student records from a PDF using the given backend for text extraction.
///
/// Pipeline:
/// 1. Extract text from the PDF via `backend`
/// 2. Normalize ligatures, exotic spaces and apostrophes
/// 3. Split the text into per-student blocks on "Roll No" anchors
/// 4. For each block, extract identity fields and subject marks
/// 5. Discard blocks without a roll number, a name, or any mark
pub fn extract_records(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    catalog: &SubjectCatalog,
) -> Result<ExtractionResult, ParsingError> {
    MarkSheetExtractor::new(catalog.clone())?.extract_via_backend(pdf_path, backend)
}
