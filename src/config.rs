use anyhow::Context;

/// Conventional 95% two-tailed cutoff.
pub const DEFAULT_THRESHOLD: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip malformed data lines with a warning.
    #[default]
    Lenient,
    /// Fail the whole section file on the first malformed data line.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    pub threshold: f64,
    pub mode: ParseMode,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            mode: ParseMode::Lenient,
        }
    }
}

impl AnalysisOptions {
    pub fn new(threshold: f64, strict: bool) -> Self {
        Self {
            threshold,
            mode: if strict {
                ParseMode::Strict
            } else {
                ParseMode::Lenient
            },
        }
    }
}

pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance for history commands")
}
