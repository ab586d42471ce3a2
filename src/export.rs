use std::io;

use serde::Serialize;

use crate::error::FileIssue;
use crate::models::{GradeRecord, RunAnalysis};

pub const LIST_COLUMNS: [&str; 5] = [
    "first_name",
    "last_name",
    "student_id",
    "letter_grade",
    "section_id",
];

/// Writes a good/work list as CSV. The header row is always present, even
/// when no student qualifies.
pub fn write_list_csv<W: io::Write>(writer: W, records: &[GradeRecord]) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(LIST_COLUMNS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct AnalysisDocument<'a> {
    #[serde(flatten)]
    analysis: &'a RunAnalysis,
    issues: Vec<IssueRow>,
}

#[derive(Serialize)]
struct IssueRow {
    file: String,
    error: String,
}

pub fn analysis_json(
    analysis: &RunAnalysis,
    issues: &[FileIssue],
) -> anyhow::Result<String> {
    let document = AnalysisDocument {
        analysis,
        issues: issues
            .iter()
            .map(|issue| IssueRow {
                file: issue.path.display().to_string(),
                error: issue.error.to_string(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
