use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregationKey;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub output: Option<OutputConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub aggregation: Option<AggregationConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives the CSV reports.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum non-whitespace characters for a page strategy to be accepted.
    pub min_page_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub key: Option<AggregationKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: Option<String>,
}

impl ConfigFile {
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output.as_ref()?.dir.as_ref().map(PathBuf::from)
    }

    pub fn min_page_chars(&self) -> Option<usize> {
        self.extraction.as_ref()?.min_page_chars
    }

    pub fn aggregation_key(&self) -> AggregationKey {
        self.aggregation
            .as_ref()
            .and_then(|a| a.key)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref()?.level.as_deref()
    }
}

/// Platform config directory path: `<config_dir>/marksheet/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("marksheet").join("config.toml"))
}

/// Load config by cascading CWD `.marksheet.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".marksheet.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        output: Some(OutputConfig {
            dir: overlay
                .output
                .as_ref()
                .and_then(|o| o.dir.clone())
                .or_else(|| base.output.as_ref().and_then(|o| o.dir.clone())),
        }),
        extraction: Some(ExtractionConfig {
            min_page_chars: overlay
                .extraction
                .as_ref()
                .and_then(|e| e.min_page_chars)
                .or_else(|| base.extraction.as_ref().and_then(|e| e.min_page_chars)),
        }),
        aggregation: Some(AggregationConfig {
            key: overlay
                .aggregation
                .as_ref()
                .and_then(|a| a.key)
                .or_else(|| base.aggregation.as_ref().and_then(|a| a.key)),
        }),
        logging: Some(LoggingConfig {
            level: overlay
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .or_else(|| base.logging.as_ref().and_then(|l| l.level.clone())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: ConfigFile = toml::from_str(
            r#"
            [output]
            dir = "out/class_10"

            [extraction]
            min_page_chars = 25

            [aggregation]
            key = "name"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir(), Some(PathBuf::from("out/class_10")));
        assert_eq!(config.min_page_chars(), Some(25));
        assert_eq!(config.aggregation_key(), AggregationKey::Name);
        assert_eq!(config.log_level(), Some("debug"));
    }

    #[test]
    fn test_defaults_when_empty() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.output_dir(), None);
        assert_eq!(config.aggregation_key(), AggregationKey::RollNumber);
    }

    #[test]
    fn test_merge_overlay_wins() {
        let base: ConfigFile = toml::from_str(
            "[output]\ndir = \"base\"\n[extraction]\nmin_page_chars = 5\n",
        )
        .unwrap();
        let overlay: ConfigFile = toml::from_str("[output]\ndir = \"cwd\"\n").unwrap();
        let merged = merge(base, overlay);
        assert_eq!(merged.output_dir(), Some(PathBuf::from("cwd")));
        assert_eq!(merged.min_page_chars(), Some(5));
    }

    #[test]
    fn test_load_from_path_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("missing.toml")).is_none());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[output\n").unwrap();
        assert!(load_from_path(&bad).is_none());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[aggregation]\nkey = \"roll_number\"\n").unwrap();
        let config = load_from_path(&good).unwrap();
        assert_eq!(config.aggregation_key(), AggregationKey::RollNumber);
    }
}
