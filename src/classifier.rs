use std::collections::HashSet;

use crate::models::{GradeRecord, LetterGrade, ListKind};

pub const GOOD_GRADES: [LetterGrade; 2] = [LetterGrade::A, LetterGrade::AMinus];

pub const WORK_GRADES: [LetterGrade; 4] = [
    LetterGrade::F,
    LetterGrade::DMinus,
    LetterGrade::D,
    LetterGrade::DPlus,
];

impl ListKind {
    pub fn grades(self) -> &'static [LetterGrade] {
        match self {
            ListKind::Good => &GOOD_GRADES,
            ListKind::Work => &WORK_GRADES,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ListKind::Good => "Good List",
            ListKind::Work => "Work List",
        }
    }
}

/// Records whose grade is in `kind`'s set, first-seen order, at most one
/// row per (student_id, section_id).
pub fn classify(kind: ListKind, records: &[GradeRecord]) -> Vec<GradeRecord> {
    let grades = kind.grades();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut listed = Vec::new();

    for record in records {
        if !grades.contains(&record.letter_grade) {
            continue;
        }
        if seen.insert((record.student_id.as_str(), record.section_id.as_str())) {
            listed.push(record.clone());
        }
    }

    listed
}

pub fn good_list(records: &[GradeRecord]) -> Vec<GradeRecord> {
    classify(ListKind::Good, records)
}

pub fn work_list(records: &[GradeRecord]) -> Vec<GradeRecord> {
    classify(ListKind::Work, records)
}
