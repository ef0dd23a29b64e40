use std::collections::BTreeMap;
use std::path::Path;

use marksheet_core::{PdfBackend, SubjectCatalog};

use crate::config::ParsingConfig;
use crate::fields::{self, IdentityField, IdentityFields};
use crate::marks::{self, MarkHit, SubjectMatcher};
use crate::segment::StudentBlocks;
use crate::text_processing;
use crate::{ExtractionResult, ParsingError, SkipStats, StudentRecord};

/// A configurable mark-sheet parsing pipeline for one subject catalog.
///
/// Holds a [`ParsingConfig`] plus subject patterns compiled once from the
/// catalog, and exposes each pipeline step as a method.
#[derive(Debug, Clone)]
pub struct MarkSheetExtractor {
    config: ParsingConfig,
    catalog: SubjectCatalog,
    matchers: Vec<SubjectMatcher>,
}

impl MarkSheetExtractor {
    /// Create an extractor with default configuration.
    pub fn new(catalog: SubjectCatalog) -> Result<Self, ParsingError> {
        Self::with_config(catalog, ParsingConfig::default())
    }

    pub fn with_config(catalog: SubjectCatalog, config: ParsingConfig) -> Result<Self, ParsingError> {
        let matchers = marks::compile_matchers(&catalog)?;
        Ok(Self {
            config,
            catalog,
            matchers,
        })
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SubjectCatalog {
        &self.catalog
    }

    /// Split normalized text into student blocks (step 1).
    pub fn segment<'a>(&'a self, text: &'a str) -> StudentBlocks<'a> {
        StudentBlocks::new(text, &self.config)
    }

    /// Run identity and mark detection on one block without deciding its fate.
    pub fn analyze_block(&self, block: &str) -> BlockAnalysis {
        BlockAnalysis {
            identity: fields::extract_identity(block, &self.config),
            marks: marks::detect_marks(block, &self.matchers, &self.config),
        }
    }

    /// Parse a single block into a record, or say why it was dropped (step 2).
    pub fn parse_block(&self, block: &str) -> ParsedBlock {
        self.analyze_block(block)
            .into_parsed(self.config.min_identity_fields)
    }

    /// Run the pipeline on already-extracted text.
    pub fn extract_from_text(&self, text: &str) -> ExtractionResult {
        let text = text_processing::normalize_text(text);
        let mut stats = SkipStats::default();
        let mut records = Vec::new();

        for block in self.segment(&text) {
            stats.total_blocks += 1;
            match self.parse_block(block) {
                ParsedBlock::Record(record) => records.push(record),
                ParsedBlock::Skip(reason) => {
                    tracing::debug!(
                        reason = %reason,
                        head = block.lines().next().unwrap_or_default(),
                        "skipping block"
                    );
                    match reason {
                        SkipReason::MissingIdentity => stats.missing_identity += 1,
                        SkipReason::NoMarks => stats.no_marks += 1,
                    }
                }
            }
        }

        tracing::debug!(
            blocks = stats.total_blocks,
            records = records.len(),
            missing_identity = stats.missing_identity,
            no_marks = stats.no_marks,
            "parsed text"
        );

        ExtractionResult {
            records,
            skip_stats: stats,
        }
    }

    /// Extract text from `path` with `backend`, then run the pipeline.
    pub fn extract_via_backend(
        &self,
        path: &Path,
        backend: &dyn PdfBackend,
    ) -> Result<ExtractionResult, ParsingError> {
        let text = backend.extract_text(path)?;
        Ok(self.extract_from_text(&text))
    }
}

/// Everything detected in one block.
#[derive(Debug, Clone, Default)]
pub struct BlockAnalysis {
    pub identity: IdentityFields,
    /// Subject code → mark and the strategy that found it.
    pub marks: BTreeMap<String, MarkHit>,
}

impl BlockAnalysis {
    /// A block becomes a record when it has a roll number, a name, at least
    /// `min_identity_fields` identity fields, and one or more marks.
    pub fn into_parsed(mut self, min_identity_fields: usize) -> ParsedBlock {
        if self.identity.count() < min_identity_fields {
            return ParsedBlock::Skip(SkipReason::MissingIdentity);
        }
        let (Some(roll_number), Some(name)) = (
            self.identity.take(IdentityField::RollNumber),
            self.identity.take(IdentityField::Name),
        ) else {
            return ParsedBlock::Skip(SkipReason::MissingIdentity);
        };
        if self.marks.is_empty() {
            return ParsedBlock::Skip(SkipReason::NoMarks);
        }

        let mut record = StudentRecord::new(roll_number, name);
        record.mother_name = self.identity.take(IdentityField::MotherName);
        record.father_name = self.identity.take(IdentityField::FatherName);
        record.school = self.identity.take(IdentityField::School);
        record.division = self.identity.take(IdentityField::Division);
        record.result = self.identity.take(IdentityField::Result);
        for (code, hit) in self.marks {
            record.record_mark(&code, hit.mark);
        }
        ParsedBlock::Record(record)
    }
}

/// Result of parsing a single block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBlock {
    Record(StudentRecord),
    Skip(SkipReason),
}

/// Reason a block was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingIdentity,
    NoMarks,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::MissingIdentity => "missing identity",
            SkipReason::NoMarks => "no marks",
        })
    }
}
