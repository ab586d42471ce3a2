use std::cmp::Ordering;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{Direction, GradeRecord, GroupAggregate, GroupAnalysis, SignificanceResult};
use crate::stats;

pub use crate::config::DEFAULT_THRESHOLD;

pub fn z_score(section_mean: f64, group_mean: f64, group_std: f64) -> Result<f64> {
    if group_std == 0.0 || !group_std.is_finite() {
        return Err(PipelineError::UndefinedComparison);
    }
    Ok((section_mean - group_mean) / group_std)
}

/// Two-tailed p-value under the standard normal distribution.
pub fn p_value(z: f64) -> f64 {
    2.0 * (1.0 - standard_normal_cdf(z.abs()))
}

pub fn is_significant(z: f64, threshold: f64) -> bool {
    z.abs() >= threshold
}

pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
pub fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

fn direction_of(z: f64) -> Direction {
    if z > 0.0 {
        Direction::Above
    } else if z < 0.0 {
        Direction::Below
    } else {
        Direction::Average
    }
}

/// Compares one section against a group baseline that already includes it.
pub fn compare_section(
    section_id: &str,
    records: &[GradeRecord],
    group: &GroupAggregate,
    threshold: f64,
) -> SignificanceResult {
    let aggregate = stats::section_stats(section_id, records);
    let undefined = |note: String| SignificanceResult {
        section_id: section_id.to_string(),
        section_mean: aggregate.mean_gpa,
        student_count: aggregate.student_count,
        z_score: None,
        p_value: None,
        is_significant: false,
        direction: Direction::Average,
        note: Some(note),
    };

    let Some(mean) = aggregate.mean_gpa else {
        return undefined("section has no GPA-bearing grades".to_string());
    };

    match z_score(mean, group.mean_gpa, group.std_dev) {
        Ok(z) => SignificanceResult {
            section_id: section_id.to_string(),
            section_mean: Some(mean),
            student_count: aggregate.student_count,
            z_score: Some(z),
            p_value: Some(p_value(z)),
            is_significant: is_significant(z, threshold),
            direction: direction_of(z),
            note: None,
        },
        Err(err) => undefined(err.to_string()),
    }
}

/// Most extreme sections first; undefined comparisons sort last.
pub fn sort_by_extremity(results: &mut [SignificanceResult]) {
    results.sort_by(|a, b| {
        let a_key = a.z_score.map(f64::abs).unwrap_or(-1.0);
        let b_key = b.z_score.map(f64::abs).unwrap_or(-1.0);
        b_key.partial_cmp(&a_key).unwrap_or(Ordering::Equal)
    });
}

/// Per-section comparison against the aggregate of every section in the group.
pub fn analyze_group<S, R>(group: &str, sections: &[(S, R)], threshold: f64) -> GroupAnalysis
where
    S: AsRef<str>,
    R: AsRef<[GradeRecord]>,
{
    let aggregate = stats::group_stats(sections.iter().map(|(_, records)| records.as_ref()));
    debug!(
        group,
        mean = aggregate.mean_gpa,
        std_dev = aggregate.std_dev,
        students = aggregate.student_count,
        "group baseline"
    );

    let section_aggregates = sections
        .iter()
        .map(|(section_id, records)| stats::section_stats(section_id.as_ref(), records.as_ref()))
        .collect();

    let mut results: Vec<SignificanceResult> = sections
        .iter()
        .map(|(section_id, records)| {
            compare_section(section_id.as_ref(), records.as_ref(), &aggregate, threshold)
        })
        .collect();
    sort_by_extremity(&mut results);

    GroupAnalysis {
        group: group.to_string(),
        aggregate,
        sections: section_aggregates,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::records;

    #[test]
    fn zero_spread_is_undefined_not_zero() {
        let err = z_score(2.46, 2.47, 0.0).unwrap_err();
        assert!(matches!(err, PipelineError::UndefinedComparison));
    }

    #[test]
    fn z_is_distance_in_std_units() {
        let z = z_score(3.0, 2.5, 0.25).unwrap();
        assert!((z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn significance_is_inclusive_of_threshold() {
        assert!(is_significant(2.1, 1.96));
        assert!(!is_significant(1.5, 1.96));
        assert!(is_significant(-1.96, 1.96));
        assert!(!is_significant(1.97, 2.0));
    }

    #[test]
    fn p_values_match_normal_table() {
        assert!((p_value(0.0) - 1.0).abs() < 1e-6);
        assert!((p_value(1.96) - 0.05).abs() < 1e-3);
        assert!((p_value(-1.96) - p_value(1.96)).abs() < 1e-12);
        assert!((p_value(2.576) - 0.01).abs() < 1e-3);
    }

    #[test]
    fn erf_is_odd_and_bounded() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + erf(1.0)).abs() < 1e-12);
        assert!((erf(6.0) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn sections_are_ranked_by_absolute_z() {
        let sections = vec![
            ("MID".to_string(), records("MID", &["B", "B", "C+"])),
            ("LOW".to_string(), records("LOW", &["F", "D", "D-"])),
            ("HIGH".to_string(), records("HIGH", &["A", "A", "A-", "A"])),
        ];
        let analysis = analyze_group("G", &sections, DEFAULT_THRESHOLD);

        assert_eq!(analysis.aggregate.student_count, 10);
        let order: Vec<&str> = analysis
            .results
            .iter()
            .map(|result| result.section_id.as_str())
            .collect();
        assert_eq!(order.last(), Some(&"MID"));
        let low = analysis.results.iter().find(|r| r.section_id == "LOW").unwrap();
        assert_eq!(low.direction, Direction::Below);
        let high = analysis.results.iter().find(|r| r.section_id == "HIGH").unwrap();
        assert_eq!(high.direction, Direction::Above);
        assert_eq!(analysis.sections.len(), 3);
    }

    #[test]
    fn undefined_section_does_not_sink_the_batch() {
        let sections = vec![
            ("EMPTY".to_string(), records("EMPTY", &["W", "I"])),
            ("S1".to_string(), records("S1", &["A", "B+", "B-", "C+", "F"])),
            ("S2".to_string(), records("S2", &["A-", "B", "B", "C-", "D"])),
        ];
        let analysis = analyze_group("G", &sections, DEFAULT_THRESHOLD);
        assert_eq!(analysis.results.len(), 3);

        let empty = analysis.results.last().unwrap();
        assert_eq!(empty.section_id, "EMPTY");
        assert_eq!(empty.z_score, None);
        assert_eq!(empty.p_value, None);
        assert!(!empty.is_significant);
        assert!(analysis.results[..2].iter().all(|r| r.z_score.is_some()));
    }

    #[test]
    fn identical_grades_leave_every_comparison_undefined() {
        let sections = vec![
            ("S1".to_string(), records("S1", &["B", "B"])),
            ("S2".to_string(), records("S2", &["B"])),
        ];
        let analysis = analyze_group("G", &sections, DEFAULT_THRESHOLD);
        assert_eq!(analysis.aggregate.std_dev, 0.0);
        assert!(analysis.results.iter().all(|r| r.z_score.is_none()
            && !r.is_significant
            && r.note.is_some()));
    }

    #[test]
    fn identical_a_minus_sections_are_not_flagged() {
        let sections = vec![
            ("S1".to_string(), records("S1", &["A-", "A-", "A-"])),
            ("S2".to_string(), records("S2", &["A-", "A-", "A-"])),
        ];
        let analysis = analyze_group("G", &sections, DEFAULT_THRESHOLD);
        assert_eq!(analysis.aggregate.std_dev, 0.0);
        for result in &analysis.results {
            assert_eq!(result.z_score, None);
            assert_eq!(result.p_value, None);
            assert!(!result.is_significant);
            assert_eq!(result.direction, Direction::Average);
        }
    }
}
