//! End-to-end runs: discover → parse → aggregate → score.

use std::path::{Path, PathBuf};

use marksheet_core::page::{self, ExtractionStrategy, PageText};
use marksheet_core::{
    AggregatedTable, AggregationKey, ApiSummary, GradeLevel, GradeRubric, PdfBackend, Stream,
    SubjectCatalog, aggregate_records,
};
use marksheet_parsing::text_processing::normalize_text;
use marksheet_parsing::{BlockAnalysis, MarkSheetExtractor, ParsedBlock, ParsingConfig, ParsingError};

use crate::batch::{BatchResult, DocumentOutcome, PreparedDocuments, process_documents};
use crate::discover::discover_documents;
use crate::{DocumentKind, IngestError, ensure_pdf, read_text};

/// Everything a run is parameterized by.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub grade: GradeLevel,
    pub catalog: SubjectCatalog,
    pub rubric: GradeRubric,
    pub key: AggregationKey,
    pub parsing: ParsingConfig,
}

impl PipelineConfig {
    /// Built-in catalog and the standard rubric for `grade`.
    pub fn for_grade(grade: GradeLevel) -> Self {
        Self {
            grade,
            catalog: SubjectCatalog::for_grade(grade),
            rubric: GradeRubric::standard(),
            key: AggregationKey::default(),
            parsing: ParsingConfig::default(),
        }
    }

    pub fn with_key(mut self, key: AggregationKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_parsing(mut self, parsing: ParsingConfig) -> Self {
        self.parsing = parsing;
        self
    }
}

/// Output of one grade run.
#[derive(Debug, Clone)]
pub struct GradeRun {
    pub batch: BatchResult,
    pub table: AggregatedTable,
    pub summary: ApiSummary,
}

/// One stream of a multi-stream run.
#[derive(Debug)]
pub struct StreamOutcome {
    pub stream: Stream,
    pub result: Result<GradeRun, IngestError>,
}

/// Per-stream results plus all streams' records scored together.
#[derive(Debug)]
pub struct StreamsRun {
    pub streams: Vec<StreamOutcome>,
    /// `None` when no stream produced a record.
    pub combined: Option<GradeRun>,
}

/// Blocks and pages of a single document, for dry runs.
#[derive(Debug, Clone)]
pub struct DocumentInspection {
    pub pages: Vec<PageText>,
    pub blocks: Vec<InspectedBlock>,
}

#[derive(Debug, Clone)]
pub struct InspectedBlock {
    pub text: String,
    pub analysis: BlockAnalysis,
    pub parsed: ParsedBlock,
}

/// A configured extraction pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    extractor: MarkSheetExtractor,
    backend: Option<Box<dyn PdfBackend>>,
}

impl Pipeline {
    /// `backend` may be `None` when only text documents will be processed.
    pub fn new(config: PipelineConfig, backend: Option<Box<dyn PdfBackend>>) -> Result<Self, IngestError> {
        let extractor =
            MarkSheetExtractor::with_config(config.catalog.clone(), config.parsing.clone())?;
        Ok(Self {
            config,
            extractor,
            backend,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover documents under `inputs` and expand bundles.
    pub fn prepare(&self, inputs: &[PathBuf]) -> PreparedDocuments {
        PreparedDocuments::prepare(&discover_documents(inputs))
    }

    pub fn process(
        &self,
        prepared: &PreparedDocuments,
        on_document: &mut dyn FnMut(&DocumentOutcome),
    ) -> BatchResult {
        process_documents(prepared, &self.extractor, self.backend.as_deref(), on_document)
    }

    /// Aggregate and score a batch. Fails when the batch holds no records.
    pub fn score(&self, batch: BatchResult) -> Result<GradeRun, IngestError> {
        if batch.records.is_empty() {
            return Err(IngestError::NothingProcessed);
        }
        let table = aggregate_records(batch.records.iter().cloned(), &self.config.catalog, self.config.key);
        let summary = ApiSummary::compute(&table, &self.config.rubric);
        tracing::info!(
            grade = %self.config.grade,
            students = table.len(),
            documents = batch.outcomes.len(),
            failures = batch.failures(),
            "scored batch"
        );
        Ok(GradeRun {
            batch,
            table,
            summary,
        })
    }

    /// Prepare, process and score `inputs`.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        on_document: &mut dyn FnMut(&DocumentOutcome),
    ) -> Result<GradeRun, IngestError> {
        let prepared = self.prepare(inputs);
        let batch = self.process(&prepared, on_document);
        self.score(batch)
    }

    /// Score each stream on its own, then all streams together.
    ///
    /// A failing stream is reported in its [`StreamOutcome`] and does not
    /// affect the others.
    pub fn run_streams(&self, streams: &[(Stream, PathBuf)]) -> StreamsRun {
        let mut combined = BatchResult::default();
        let mut outcomes = Vec::new();

        for (stream, path) in streams {
            let prepared = self.prepare(std::slice::from_ref(path));
            let batch = self.process(&prepared, &mut |_| {});
            combined.extend(batch.clone());
            let result = self.score(batch);
            if let Err(e) = &result {
                tracing::warn!(%stream, error = %e, "stream produced no results");
            }
            outcomes.push(StreamOutcome {
                stream: *stream,
                result,
            });
        }

        StreamsRun {
            streams: outcomes,
            combined: self.score(combined).ok(),
        }
    }

    /// Extract and segment one document without aggregating, for dry runs.
    pub fn inspect(&self, path: &Path) -> Result<DocumentInspection, IngestError> {
        let pages = match DocumentKind::from_path(path) {
            Some(DocumentKind::Text) => vec![PageText {
                text: read_text(path)?,
                strategy: ExtractionStrategy::Layout,
            }],
            Some(DocumentKind::Archive) => return Err(IngestError::Unsupported(path.to_path_buf())),
            Some(DocumentKind::Pdf) | None => {
                let backend = self.backend.as_deref().ok_or(IngestError::NoPdfSupport)?;
                ensure_pdf(path)?;
                backend.extract_pages(path).map_err(ParsingError::from)?
            }
        };

        let text = normalize_text(&page::join_pages(&pages).map_err(ParsingError::from)?);
        let min_fields = self.config.parsing.min_identity_fields();
        let blocks = self
            .extractor
            .segment(&text)
            .map(|block| {
                let analysis = self.extractor.analyze_block(block);
                InspectedBlock {
                    text: block.to_string(),
                    parsed: analysis.clone().into_parsed(min_fields),
                    analysis,
                }
            })
            .collect();

        Ok(DocumentInspection { pages, blocks })
    }
}
