use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Closed set of grade tokens a section file may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LetterGrade {
    APlus,
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    DMinus,
    F,
    Incomplete,
    Withdrawn,
    Pass,
    NoPass,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 17] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::AMinus,
        LetterGrade::BPlus,
        LetterGrade::B,
        LetterGrade::BMinus,
        LetterGrade::CPlus,
        LetterGrade::C,
        LetterGrade::CMinus,
        LetterGrade::DPlus,
        LetterGrade::D,
        LetterGrade::DMinus,
        LetterGrade::F,
        LetterGrade::Incomplete,
        LetterGrade::Withdrawn,
        LetterGrade::Pass,
        LetterGrade::NoPass,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
            LetterGrade::Incomplete => "I",
            LetterGrade::Withdrawn => "W",
            LetterGrade::Pass => "P",
            LetterGrade::NoPass => "NP",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        LetterGrade::ALL
            .iter()
            .copied()
            .find(|grade| grade.as_str() == token)
            .ok_or_else(|| format!("unknown grade token {token:?}"))
    }
}

impl Serialize for LetterGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRecord {
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub letter_grade: LetterGrade,
    pub section_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionHeader {
    pub course_id: String,
    pub credit_hours: Option<f64>,
}

/// A data line the lenient parser skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineWarning {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionAggregate {
    pub section_id: String,
    /// `None` when no record in the section carries GPA points.
    pub mean_gpa: Option<f64>,
    /// Count of GPA-bearing students, after I/W/P/NP exclusion.
    pub student_count: usize,
    pub roster_size: usize,
    pub min_gpa: Option<f64>,
    pub max_gpa: Option<f64>,
    pub gpa_values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub mean_gpa: f64,
    pub std_dev: f64,
    pub student_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
    Average,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Above => "above average",
            Direction::Below => "below average",
            Direction::Average => "average",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignificanceResult {
    pub section_id: String,
    pub section_mean: Option<f64>,
    pub student_count: usize,
    pub z_score: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
    pub direction: Direction,
    /// Why the comparison is undefined, when it is.
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupAnalysis {
    pub group: String,
    pub aggregate: GroupAggregate,
    pub sections: Vec<SectionAggregate>,
    pub results: Vec<SignificanceResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunAnalysis {
    pub run: String,
    pub threshold: f64,
    pub aggregate: GroupAggregate,
    pub groups: Vec<GroupAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Good,
    Work,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Good => "good",
            ListKind::Work => "work",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryMatch {
    pub student_id: String,
    pub section_id: String,
    pub grade: LetterGrade,
    pub already_known: bool,
    pub prior_sections: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub list_kind: String,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub section_id: String,
    pub recorded_on: NaiveDate,
}
