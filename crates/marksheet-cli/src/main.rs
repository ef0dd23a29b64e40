use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use marksheet_core::config_file::{self, ConfigFile};
use marksheet_core::{AggregationKey, GradeLevel, Stream};
use marksheet_ingest::{GradeRun, IngestError, Pipeline, PipelineConfig, default_backend};
use marksheet_reporting::{GradeSummary, StreamEntry, StreamsReport, write_all_reports};

mod output;
mod settings;

use output::ColorMode;
use settings::{Overrides, Settings};

/// Mark-sheet analyzer - extract student marks from result PDFs and compute API reports
#[derive(Parser, Debug)]
#[command(name = "marksheet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract marks from PDFs, text files, directories or bundles and write CSV reports
    Analyze {
        /// Grade of the mark-sheets (10 or 12)
        #[arg(short, long)]
        grade: GradeLevel,

        /// Files, directories, .zip or .tar.gz bundles to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Score class 12 streams separately and together; prints JSON on stdout
    Streams {
        /// Science stream mark-sheets
        #[arg(long)]
        science: Option<PathBuf>,

        /// Commerce stream mark-sheets
        #[arg(long)]
        commerce: Option<PathBuf>,

        /// Humanities stream mark-sheets
        #[arg(long)]
        humanities: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print extracted pages, student blocks and parsed fields without writing reports
    DryRun {
        /// Grade of the mark-sheet (10 or 12)
        #[arg(short, long)]
        grade: GradeLevel,

        /// PDF or text document to inspect
        path: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Directory for the CSV reports [env: MARKSHEET_OUTPUT_DIR] [default: output]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field identifying a student across documents
    #[arg(long, value_enum)]
    key: Option<KeyArg>,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Minimum non-whitespace characters for a page extraction strategy [env: MARKSHEET_MIN_PAGE_CHARS]
    #[arg(long)]
    min_page_chars: Option<usize>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum KeyArg {
    RollNumber,
    Name,
}

impl From<KeyArg> for AggregationKey {
    fn from(key: KeyArg) -> Self {
        match key {
            KeyArg::RollNumber => AggregationKey::RollNumber,
            KeyArg::Name => AggregationKey::Name,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let file = config_file::load_config();

    match cli.command {
        Command::Analyze {
            grade,
            paths,
            report,
            common,
        } => analyze(grade, &paths, &report, &common, &file),
        Command::Streams {
            science,
            commerce,
            humanities,
            report,
            common,
        } => {
            let streams: Vec<(Stream, PathBuf)> = [
                (Stream::Science, science),
                (Stream::Commerce, commerce),
                (Stream::Humanities, humanities),
            ]
            .into_iter()
            .filter_map(|(stream, path)| path.map(|p| (stream, p)))
            .collect();
            streams_command(&streams, &report, &common, &file)
        }
        Command::DryRun {
            grade,
            path,
            common,
        } => dry_run(grade, &path, &common, &file),
    }
}

fn resolve_settings(report: Option<&ReportArgs>, common: &CommonArgs, file: &ConfigFile) -> Settings {
    let overrides = Overrides {
        output_dir: report.and_then(|r| r.output.clone()),
        min_page_chars: common.min_page_chars,
        key: report.and_then(|r| r.key).map(AggregationKey::from),
    };
    let settings = Settings::resolve(overrides, file, |name| std::env::var(name).ok());
    init_logging(&settings.log_level);
    settings
}

/// Logs go to stderr so stdout stays clean for reports and JSON.
fn init_logging(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn pipeline_for(grade: GradeLevel, settings: &Settings) -> Result<Pipeline, IngestError> {
    Pipeline::new(
        PipelineConfig::for_grade(grade).with_key(settings.key),
        default_backend(settings.min_page_chars),
    )
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {wide_msg}")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

fn analyze(
    grade: GradeLevel,
    paths: &[PathBuf],
    report: &ReportArgs,
    common: &CommonArgs,
    file: &ConfigFile,
) -> anyhow::Result<()> {
    let settings = resolve_settings(Some(report), common, file);
    let color = ColorMode(!common.no_color);
    let pipeline = pipeline_for(grade, &settings)?;

    let prepared = pipeline.prepare(paths);
    if prepared.is_empty() {
        anyhow::bail!("No PDF, text or bundle documents found in the given paths");
    }

    let bar = progress_bar(prepared.len());
    let batch = pipeline.process(&prepared, &mut |outcome| {
        bar.set_message(outcome.label.clone());
        bar.inc(1);
    });
    bar.finish_and_clear();

    let mut out = std::io::stdout().lock();
    output::print_document_outcomes(&mut out, &batch.outcomes, color)?;

    let run = pipeline.score(batch)?;
    let written = write_all_reports(&settings.output_dir, grade, &run.table, &run.summary)
        .with_context(|| format!("writing reports to {}", settings.output_dir.display()))?;

    output::print_summary_table(&mut out, grade, run.table.len(), &run.summary, color)?;
    output::print_written(&mut out, written.paths(), color)?;
    out.flush()?;
    Ok(())
}

fn write_stream_reports(dir: &Path, run: &GradeRun, color: ColorMode) -> anyhow::Result<()> {
    let written = write_all_reports(dir, GradeLevel::Class12, &run.table, &run.summary)
        .with_context(|| format!("writing reports to {}", dir.display()))?;
    output::print_written(&mut std::io::stderr().lock(), written.paths(), color)?;
    Ok(())
}

/// Write a scored stream's reports. A write failure becomes the stream's
/// error entry so the remaining streams are still reported.
fn stream_entry(dir: &Path, run: &GradeRun, color: ColorMode) -> StreamEntry {
    match write_stream_reports(dir, run, color) {
        Ok(()) => StreamEntry::Summary(GradeSummary::new(&run.table, &run.summary)),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to write stream reports");
            StreamEntry::failed(format!("{e:#}"))
        }
    }
}

fn streams_command(
    streams: &[(Stream, PathBuf)],
    report: &ReportArgs,
    common: &CommonArgs,
    file: &ConfigFile,
) -> anyhow::Result<()> {
    if streams.is_empty() {
        anyhow::bail!("Give at least one of --science, --commerce or --humanities");
    }
    let settings = resolve_settings(Some(report), common, file);
    let color = ColorMode(!common.no_color);
    let pipeline = pipeline_for(GradeLevel::Class12, &settings)?;

    let run = pipeline.run_streams(streams);

    let mut entries = Vec::with_capacity(run.streams.len());
    for outcome in &run.streams {
        let entry = match &outcome.result {
            Ok(stream_run) => stream_entry(
                &settings.output_dir.join(outcome.stream.name()),
                stream_run,
                color,
            ),
            Err(e) => StreamEntry::failed(e),
        };
        entries.push((outcome.stream, entry));
    }

    let combined = match &run.combined {
        Some(combined) => stream_entry(&settings.output_dir, combined, color),
        None => StreamEntry::failed(IngestError::NothingProcessed),
    };

    let report = StreamsReport::new(entries, combined);
    println!("{}", report.to_json_pretty()?);

    if let StreamEntry::Failed { error } = report.combined() {
        anyhow::bail!("combined streams: {error}");
    }
    Ok(())
}

fn dry_run(
    grade: GradeLevel,
    path: &Path,
    common: &CommonArgs,
    file: &ConfigFile,
) -> anyhow::Result<()> {
    let settings = resolve_settings(None, common, file);
    let color = ColorMode(!common.no_color);

    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let inspection = pipeline_for(grade, &settings)?.inspect(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut out = std::io::stdout().lock();
    output::print_inspection(&mut out, &file_name, &inspection, color)?;
    out.flush()?;
    Ok(())
}
