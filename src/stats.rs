use crate::models::{GradeRecord, GroupAggregate, LetterGrade, SectionAggregate};

/// GPA points for a grade token on the 4.0 scale.
///
/// I, W, P and NP carry no points and return `None` so they never pull an
/// average down. Any other unrecognised token falls back to `0.0`; callers
/// that need strict validation should parse into [`LetterGrade`] first.
pub fn letter_to_gpa(grade: &str) -> Option<f64> {
    match grade {
        "I" | "W" | "P" | "NP" => None,
        "A+" | "A" => Some(4.0),
        "A-" => Some(3.7),
        "B+" => Some(3.3),
        "B" => Some(3.0),
        "B-" => Some(2.7),
        "C+" => Some(2.3),
        "C" => Some(2.0),
        "C-" => Some(1.7),
        "D+" => Some(1.3),
        "D" => Some(1.0),
        "D-" => Some(0.7),
        _ => Some(0.0),
    }
}

impl LetterGrade {
    pub fn gpa_points(self) -> Option<f64> {
        letter_to_gpa(self.as_str())
    }
}

pub fn gpa_values(records: &[GradeRecord]) -> Vec<f64> {
    records
        .iter()
        .filter_map(|record| record.letter_grade.gpa_points())
        .collect()
}

pub fn section_stats(section_id: &str, records: &[GradeRecord]) -> SectionAggregate {
    let values = gpa_values(records);
    let student_count = values.len();
    let mean_gpa = if student_count == 0 {
        None
    } else {
        Some(values.iter().sum::<f64>() / student_count as f64)
    };

    SectionAggregate {
        section_id: section_id.to_string(),
        mean_gpa,
        student_count,
        roster_size: records.len(),
        min_gpa: values.iter().copied().reduce(f64::min),
        max_gpa: values.iter().copied().reduce(f64::max),
        gpa_values: values,
    }
}

/// Population mean and standard deviation over every section's GPA values.
pub fn group_stats<'a, I>(record_sets: I) -> GroupAggregate
where
    I: IntoIterator<Item = &'a [GradeRecord]>,
{
    let values: Vec<f64> = record_sets
        .into_iter()
        .flat_map(gpa_values)
        .collect();
    aggregate_values(&values)
}

pub fn aggregate_values(values: &[f64]) -> GroupAggregate {
    if values.is_empty() {
        return GroupAggregate {
            mean_gpa: 0.0,
            std_dev: 0.0,
            student_count: 0,
        };
    }

    // identical values have exactly zero spread
    let first = values[0];
    if values.iter().all(|value| *value == first) {
        return GroupAggregate {
            mean_gpa: first,
            std_dev: 0.0,
            student_count: values.len(),
        };
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = if values.len() > 1 {
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / count
    } else {
        0.0
    };

    GroupAggregate {
        mean_gpa: mean,
        std_dev: variance.sqrt(),
        student_count: values.len(),
    }
}

/// Grade counts in first-seen order.
pub fn grade_distribution(records: &[GradeRecord]) -> Vec<(LetterGrade, usize)> {
    let mut counts: Vec<(LetterGrade, usize)> = Vec::new();
    for record in records {
        match counts
            .iter_mut()
            .find(|(grade, _)| *grade == record.letter_grade)
        {
            Some(entry) => entry.1 += 1,
            None => counts.push((record.letter_grade, 1)),
        }
    }
    counts
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn records(section_id: &str, grades: &[&str]) -> Vec<GradeRecord> {
        grades
            .iter()
            .enumerate()
            .map(|(index, grade)| GradeRecord {
                first_name: "Avery".to_string(),
                last_name: format!("Lee{index}"),
                student_id: format!("{section_id}-{index}"),
                letter_grade: grade.parse().unwrap(),
                section_id: section_id.to_string(),
            })
            .collect()
    }

    #[test]
    fn letter_table_matches_expected_points() {
        assert_eq!(letter_to_gpa("A"), Some(4.0));
        assert_eq!(letter_to_gpa("A+"), Some(4.0));
        assert_eq!(letter_to_gpa("D-"), Some(0.7));
        assert_eq!(letter_to_gpa("F"), Some(0.0));
        assert_eq!(letter_to_gpa("I"), None);
        assert_eq!(letter_to_gpa("NP"), None);
        assert_eq!(letter_to_gpa("XYZ"), Some(0.0));
    }

    #[test]
    fn section_mean_and_count() {
        let section = records("S1", &["A", "B+", "B-", "C+", "F"]);
        let stats = section_stats("S1", &section);
        assert!((stats.mean_gpa.unwrap() - 2.46).abs() < 1e-9);
        assert_eq!(stats.student_count, 5);
        assert_eq!(stats.min_gpa, Some(0.0));
        assert_eq!(stats.max_gpa, Some(4.0));
    }

    #[test]
    fn excluded_grades_shrink_the_count_not_the_mean() {
        let section = records("S1", &["A", "W", "B", "I", "P"]);
        let stats = section_stats("S1", &section);
        assert_eq!(stats.student_count, 2);
        assert_eq!(stats.roster_size, 5);
        assert!((stats.mean_gpa.unwrap() - 3.5).abs() < 1e-9);
        assert_eq!(stats.gpa_values, vec![4.0, 3.0]);
    }

    #[test]
    fn section_without_gpa_grades_has_no_mean() {
        let section = records("S1", &["W", "NP"]);
        let stats = section_stats("S1", &section);
        assert_eq!(stats.mean_gpa, None);
        assert_eq!(stats.student_count, 0);
        assert_eq!(stats.min_gpa, None);
    }

    #[test]
    fn group_flattens_sections() {
        let first = records("S1", &["A", "B+", "B-", "C+", "F"]);
        let second = records("S2", &["A-", "B", "B", "C-", "D"]);
        let second_stats = section_stats("S2", &second);
        assert!((second_stats.mean_gpa.unwrap() - 2.48).abs() < 1e-9);

        let group = group_stats([first.as_slice(), second.as_slice()]);
        assert!((group.mean_gpa - 2.47).abs() < 1e-9);
        assert_eq!(group.student_count, 10);
        assert!(group.std_dev > 0.0);
    }

    #[test]
    fn group_std_dev_is_population() {
        let aggregate = aggregate_values(&[2.0, 4.0]);
        assert!((aggregate.mean_gpa - 3.0).abs() < 1e-12);
        assert!((aggregate.std_dev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_group_is_zero_not_error() {
        let aggregate = group_stats(std::iter::empty::<&[GradeRecord]>());
        assert_eq!(aggregate.mean_gpa, 0.0);
        assert_eq!(aggregate.std_dev, 0.0);
        assert_eq!(aggregate.student_count, 0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        assert_eq!(aggregate_values(&[3.3]).std_dev, 0.0);
    }

    #[test]
    fn identical_inexact_values_have_exactly_zero_spread() {
        let aggregate = aggregate_values(&[3.7; 6]);
        assert_eq!(aggregate.std_dev, 0.0);
        assert_eq!(aggregate.mean_gpa, 3.7);
        assert_eq!(aggregate.student_count, 6);
    }

    #[test]
    fn distribution_keeps_first_seen_order() {
        let section = records("S1", &["B", "A", "B", "F", "A"]);
        let counts = grade_distribution(&section);
        assert_eq!(
            counts,
            vec![
                (LetterGrade::B, 2),
                (LetterGrade::A, 2),
                (LetterGrade::F, 1)
            ]
        );
    }
}
