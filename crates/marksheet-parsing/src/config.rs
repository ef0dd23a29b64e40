use regex::Regex;

use crate::fields::{IdentityField, IdentityPattern};
use crate::marks::MarkStrategy;

/// Controls how a list of patterns is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Configuration for mark-sheet text parsing.
///
/// Regex fields left as `None` fall back to the built-in patterns.
/// Use [`ParsingConfigBuilder`] to construct one from string patterns.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── segment.rs ──
    /// Line pattern that opens a new student block.
    pub(crate) anchor_re: Option<Regex>,

    // ── fields.rs ──
    /// Identity field patterns, tried in order; the first match per field wins.
    pub(crate) identity_patterns: ListOverride<IdentityPattern>,
    /// Identity fields a block needs before it is kept (default: 2).
    pub(crate) min_identity_fields: usize,

    // ── marks.rs ──
    /// Subject row pattern: code, name, theory, practical, total, grade.
    pub(crate) row_re: Option<Regex>,
    /// Mark strategies in the order they are tried for each subject.
    pub(crate) mark_strategies: Vec<MarkStrategy>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            anchor_re: None,
            identity_patterns: ListOverride::Default,
            min_identity_fields: 2,
            row_re: None,
            mark_strategies: MarkStrategy::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl ParsingConfig {
    pub fn min_identity_fields(&self) -> usize {
        self.min_identity_fields
    }

    pub fn mark_strategies(&self) -> &[MarkStrategy] {
        &self.mark_strategies
    }
}

/// Builder for [`ParsingConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    anchor_re: Option<String>,
    identity_patterns: IdentityOverrideBuilder,
    min_identity_fields: Option<usize>,
    row_re: Option<String>,
    mark_strategies: Option<Vec<MarkStrategy>>,
}

#[derive(Debug, Clone, Default)]
enum IdentityOverrideBuilder {
    #[default]
    Default,
    Replace(Vec<(IdentityField, String)>),
    Extend(Vec<(IdentityField, String)>),
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor_regex(mut self, pattern: &str) -> Self {
        self.anchor_re = Some(pattern.to_string());
        self
    }

    pub fn row_regex(mut self, pattern: &str) -> Self {
        self.row_re = Some(pattern.to_string());
        self
    }

    // ── Identity patterns ──

    /// Replace the built-in identity patterns. Each pattern's first capture
    /// group is taken as the field value.
    pub fn set_identity_patterns(mut self, patterns: Vec<(IdentityField, String)>) -> Self {
        self.identity_patterns = IdentityOverrideBuilder::Replace(patterns);
        self
    }

    pub fn add_identity_pattern(mut self, field: IdentityField, pattern: String) -> Self {
        match &mut self.identity_patterns {
            IdentityOverrideBuilder::Extend(v) | IdentityOverrideBuilder::Replace(v) => {
                v.push((field, pattern))
            }
            IdentityOverrideBuilder::Default => {
                self.identity_patterns = IdentityOverrideBuilder::Extend(vec![(field, pattern)])
            }
        }
        self
    }

    // ── Scalars ──

    pub fn min_identity_fields(mut self, n: usize) -> Self {
        self.min_identity_fields = Some(n);
        self
    }

    pub fn mark_strategies(mut self, order: Vec<MarkStrategy>) -> Self {
        self.mark_strategies = Some(order);
        self
    }

    /// Compile all string patterns into regexes and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let compile = |opt: Option<String>| -> Result<Option<Regex>, regex::Error> {
            opt.map(|p| Regex::new(&p)).transpose()
        };

        let compile_identity = |patterns: Vec<(IdentityField, String)>| {
            patterns
                .into_iter()
                .map(|(field, p)| IdentityPattern::new(field, &p))
                .collect::<Result<Vec<_>, _>>()
        };

        let identity_patterns = match self.identity_patterns {
            IdentityOverrideBuilder::Default => ListOverride::Default,
            IdentityOverrideBuilder::Replace(v) => ListOverride::Replace(compile_identity(v)?),
            IdentityOverrideBuilder::Extend(v) => ListOverride::Extend(compile_identity(v)?),
        };

        Ok(ParsingConfig {
            anchor_re: compile(self.anchor_re)?,
            identity_patterns,
            min_identity_fields: self.min_identity_fields.unwrap_or(2),
            row_re: compile(self.row_re)?,
            mark_strategies: self
                .mark_strategies
                .unwrap_or_else(|| MarkStrategy::DEFAULT_ORDER.to_vec()),
        })
    }
}
