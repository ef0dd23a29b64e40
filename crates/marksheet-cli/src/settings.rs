use std::path::PathBuf;

use marksheet_core::config_file::ConfigFile;
use marksheet_core::{AggregationKey, MIN_PAGE_CHARS};

pub const OUTPUT_DIR_ENV: &str = "MARKSHEET_OUTPUT_DIR";
pub const MIN_PAGE_CHARS_ENV: &str = "MARKSHEET_MIN_PAGE_CHARS";

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Flags that override everything else when given.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub min_page_chars: Option<usize>,
    pub key: Option<AggregationKey>,
}

/// Effective run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub min_page_chars: usize,
    pub key: AggregationKey,
    pub log_level: String,
}

impl Settings {
    /// Resolve with precedence: flags > environment > config file > defaults.
    ///
    /// `env` looks up an environment variable; unparseable values are ignored.
    pub fn resolve(
        overrides: Overrides,
        file: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let output_dir = overrides
            .output_dir
            .or_else(|| env(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or_else(|| file.output_dir())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let min_page_chars = overrides
            .min_page_chars
            .or_else(|| env(MIN_PAGE_CHARS_ENV).and_then(|v| v.trim().parse().ok()))
            .or_else(|| file.min_page_chars())
            .unwrap_or(MIN_PAGE_CHARS);

        Self {
            output_dir,
            min_page_chars,
            key: overrides.key.unwrap_or_else(|| file.aggregation_key()),
            log_level: file.log_level().unwrap_or(DEFAULT_LOG_LEVEL).to_string(),
        }
    }
}
