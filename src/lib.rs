//! Section GPA analysis for Group Scholar course runs.
//!
//! A run file names groups, each group names section rosters. The pipeline
//! resolves that hierarchy, parses every roster, compares each section's
//! mean GPA with its group, and extracts good (A/A-) and work (D+ and below)
//! lists for the history store.

pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod hierarchy;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod significance;
pub mod stats;

pub use config::{AnalysisOptions, ParseMode};
pub use error::{BatchResult, FileIssue, PipelineError};
