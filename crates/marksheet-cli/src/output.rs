use std::io::Write;
use std::path::Path;

use marksheet_core::{ApiSummary, ApiValue, GradeLevel};
use marksheet_ingest::{DocumentInspection, DocumentOutcome, DocumentStatus};
use marksheet_parsing::{IdentityField, ParsedBlock};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// One line per document: students found, blocks discarded, or the failure.
pub fn print_document_outcomes(
    w: &mut dyn Write,
    outcomes: &[DocumentOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    for outcome in outcomes {
        match &outcome.status {
            DocumentStatus::Parsed { students, skipped } => {
                let discarded = skipped.missing_identity + skipped.no_marks;
                let detail = format!(
                    "{} students, {} of {} blocks discarded",
                    students, discarded, skipped.total_blocks
                );
                if color.enabled() {
                    writeln!(w, "{} {} ({})", "OK".green(), outcome.label, detail.dimmed())?;
                } else {
                    writeln!(w, "OK     {} ({})", outcome.label, detail)?;
                }
            }
            DocumentStatus::Failed(reason) => {
                if color.enabled() {
                    writeln!(w, "{} {}: {}", "FAILED".red(), outcome.label, reason)?;
                } else {
                    writeln!(w, "FAILED {}: {}", outcome.label, reason)?;
                }
            }
        }
    }
    Ok(())
}

fn api_cell(api: &ApiValue, color: ColorMode) -> String {
    let text = format!("{:>8}", api.to_string());
    if !color.enabled() {
        return text;
    }
    match api.value() {
        None => text.dimmed().to_string(),
        Some(v) if v < 0.0 => text.red().to_string(),
        Some(_) => text.green().to_string(),
    }
}

/// Per-subject totals and API, followed by the pooled row.
pub fn print_summary_table(
    w: &mut dyn Write,
    grade: GradeLevel,
    students: usize,
    summary: &ApiSummary,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let title = format!("API summary ({grade}, {students} students)");
    if color.enabled() {
        writeln!(w, "{}", title.bold())?;
    } else {
        writeln!(w, "{}", title)?;
    }

    let width = summary
        .subjects
        .iter()
        .map(|r| r.title().len())
        .max()
        .unwrap_or(0)
        .max("OVERALL".len());
    writeln!(
        w,
        "{:<width$}  {:>6}  {:>6}  {:>8}",
        "Subject", "Marks", "Passed", "API"
    )?;
    writeln!(w, "{}", "-".repeat(width + 26))?;

    for report in summary.subjects.iter().chain(std::iter::once(&summary.overall)) {
        writeln!(
            w,
            "{:<width$}  {:>6}  {:>6}  {}",
            report.title(),
            report.total,
            report.passed,
            api_cell(&report.api, color)
        )?;
    }
    Ok(())
}

/// Paths of the report files just written.
pub fn print_written<'a>(
    w: &mut dyn Write,
    paths: impl IntoIterator<Item = &'a Path>,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    for path in paths {
        if color.enabled() {
            writeln!(w, "{} {}", "wrote".dimmed(), path.display())?;
        } else {
            writeln!(w, "wrote {}", path.display())?;
        }
    }
    Ok(())
}

/// Pages, blocks and parse results of one document, for `dry-run`.
pub fn print_inspection(
    w: &mut dyn Write,
    file_name: &str,
    inspection: &DocumentInspection,
    color: ColorMode,
) -> std::io::Result<()> {
    let header = format!(
        "{} ({} pages, {} blocks segmented)",
        file_name,
        inspection.pages.len(),
        inspection.blocks.len()
    );
    if color.enabled() {
        writeln!(w, "{} {}\n", "DRY RUN:".bold().cyan(), header.bold())?;
    } else {
        writeln!(w, "DRY RUN: {}\n", header)?;
    }

    for (i, page) in inspection.pages.iter().enumerate() {
        let chars = marksheet_core::page::usable_len(&page.text);
        writeln!(w, "  page {}: {} ({} chars)", i + 1, page.strategy, chars)?;
    }
    writeln!(w)?;

    let mut records = 0;
    for (i, block) in inspection.blocks.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "{}", format!("[{}]", i + 1).bold().yellow())?;
        } else {
            writeln!(w, "[{}]", i + 1)?;
        }

        for field in IdentityField::ALL {
            if let Some(value) = block.analysis.identity.get(field) {
                writeln!(w, "  {:<12} {}", format!("{field}:"), value)?;
            }
        }
        if block.analysis.marks.is_empty() {
            writeln!(w, "  Marks:       (none)")?;
        } else {
            let marks: Vec<String> = block
                .analysis
                .marks
                .iter()
                .map(|(code, hit)| format!("{code}={} ({})", hit.mark, hit.strategy))
                .collect();
            writeln!(w, "  Marks:       {}", marks.join(", "))?;
        }

        match &block.parsed {
            ParsedBlock::Record(_) => records += 1,
            ParsedBlock::Skip(reason) => {
                let msg = format!("SKIPPED ({reason})");
                if color.enabled() {
                    writeln!(w, "  {}", msg.red())?;
                } else {
                    writeln!(w, "  {}", msg)?;
                }
            }
        }

        let first_line = block.text.lines().next().unwrap_or("");
        if color.enabled() {
            writeln!(w, "  Starts:      {}", first_line.trim().dimmed())?;
        } else {
            writeln!(w, "  Starts:      {}", first_line.trim())?;
        }
        writeln!(w)?;
    }

    writeln!(
        w,
        "Total: {} blocks, {} records",
        inspection.blocks.len(),
        records
    )?;
    Ok(())
}
