use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use marksheet_core::PdfBackend;
use marksheet_parsing::{MarkSheetExtractor, ParsingError};

pub mod archive;
pub mod batch;
pub mod discover;
pub mod pipeline;

// Re-export domain types for convenience
pub use marksheet_core::{ExtractionResult, SkipStats, StudentRecord};
pub use archive::{BundledDocument, expand_archive, is_archive_path};
pub use batch::{
    BatchResult, DocumentOutcome, DocumentSource, DocumentStatus, PreparedDocuments,
    process_documents,
};
pub use discover::discover_documents;
pub use pipeline::{
    DocumentInspection, GradeRun, InspectedBlock, Pipeline, PipelineConfig, StreamOutcome,
    StreamsRun,
};

/// First bytes of every PDF file.
pub(crate) const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("parsing error: {0}")]
    Parsing(#[from] ParsingError),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a PDF (missing %PDF- header)", .0.display())]
    NotAPdf(PathBuf),
    #[error("bundle error: {0}")]
    Archive(String),
    #[error("{} is not a single document", .0.display())]
    Unsupported(PathBuf),
    #[error("PDF support not compiled in (enable the `pdf` feature of marksheet-ingest)")]
    NoPdfSupport,
    #[error("nothing processed: no document produced a student record")]
    NothingProcessed,
}

/// How a path is handled, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// Pre-extracted mark-sheet text.
    Text,
    /// A `.zip`, `.tar.gz` or `.tgz` bundle of documents.
    Archive,
}

impl DocumentKind {
    /// `None` for extensions that are not mark-sheet inputs.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if name.ends_with(".txt") {
            Some(DocumentKind::Text)
        } else if name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(DocumentKind::Archive)
        } else {
            None
        }
    }
}

/// The MuPDF backend when the `pdf` feature is enabled.
#[cfg(feature = "pdf")]
pub fn default_backend(min_page_chars: usize) -> Option<Box<dyn PdfBackend>> {
    Some(Box::new(
        marksheet_pdf_mupdf::MupdfBackend::new().with_min_page_chars(min_page_chars),
    ))
}

#[cfg(not(feature = "pdf"))]
pub fn default_backend(_min_page_chars: usize) -> Option<Box<dyn PdfBackend>> {
    None
}

/// Extract student records from one PDF or text document.
///
/// Dispatches on the file extension:
/// - `.txt` → read as already-extracted text
/// - anything else → checked for a PDF header, then passed to `backend`
///
/// Bundles must be expanded first (see [`archive::expand_archive`]).
pub fn extract_document(
    path: &Path,
    extractor: &MarkSheetExtractor,
    backend: Option<&dyn PdfBackend>,
) -> Result<ExtractionResult, IngestError> {
    match DocumentKind::from_path(path) {
        Some(DocumentKind::Text) => {
            let text = read_text(path)?;
            Ok(extractor.extract_from_text(&text))
        }
        Some(DocumentKind::Archive) => Err(IngestError::Unsupported(path.to_path_buf())),
        Some(DocumentKind::Pdf) | None => {
            let backend = backend.ok_or(IngestError::NoPdfSupport)?;
            ensure_pdf(path)?;
            Ok(extractor.extract_via_backend(path, backend)?)
        }
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Fail with [`IngestError::NotAPdf`] unless `path` starts with `%PDF-`.
pub(crate) fn ensure_pdf(path: &Path) -> Result<(), IngestError> {
    let io_err = |source: std::io::Error| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut header = Vec::with_capacity(PDF_MAGIC.len());
    std::fs::File::open(path)
        .map_err(io_err)?
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut header)
        .map_err(io_err)?;
    if header.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(IngestError::NotAPdf(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksheet_core::{BackendError, SubjectCatalog};

    struct EchoBackend;

    impl PdfBackend for EchoBackend {
        fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
            // Everything after the header line is treated as page text.
            let raw = std::fs::read_to_string(path)?;
            Ok(raw.lines().skip(1).collect::<Vec<_>>().join("\n"))
        }
    }

    fn extractor() -> MarkSheetExtractor {
        MarkSheetExtractor::new(SubjectCatalog::class10()).unwrap()
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path(Path::new("a/B.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("b.txt")), Some(DocumentKind::Text));
        assert_eq!(
            DocumentKind::from_path(Path::new("c.tar.gz")),
            Some(DocumentKind::Archive)
        );
        assert_eq!(DocumentKind::from_path(Path::new("d.csv")), None);
        assert_eq!(DocumentKind::from_path(Path::new("/")), None);
    }

    #[test]
    fn test_extract_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.txt");
        std::fs::write(&path, "Roll No: 1\nCandidate Name: A B\n184 ENGLISH 080 A2\n").unwrap();
        let result = extract_document(&path, &extractor(), None).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].mark("184"), Some(80));
    }

    #[test]
    fn test_pdf_magic_check() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, "Roll No: 1\n").unwrap();
        let err = extract_document(&fake, &extractor(), Some(&EchoBackend)).unwrap_err();
        assert!(matches!(err, IngestError::NotAPdf(_)));

        let real = dir.path().join("real.pdf");
        std::fs::write(&real, "%PDF-1.7\nRoll No: 1\nCandidate Name: A B\n184 ENGLISH 080 A2\n")
            .unwrap();
        let result = extract_document(&real, &extractor(), Some(&EchoBackend)).unwrap();
        assert_eq!(result.records.len(), 1);
    }

    #[test]
    fn test_pdf_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.pdf");
        std::fs::write(&path, "%PDF-1.7\n").unwrap();
        assert!(matches!(
            extract_document(&path, &extractor(), None),
            Err(IngestError::NoPdfSupport)
        ));
    }

    #[test]
    fn test_missing_document_is_io_error() {
        let err = extract_document(Path::new("/nonexistent/sheet.txt"), &extractor(), None)
            .unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/sheet.txt"));
    }
}
