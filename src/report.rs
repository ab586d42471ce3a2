use std::fmt::Write;

use chrono::NaiveDate;

use crate::error::FileIssue;
use crate::models::{GradeRecord, ListKind, RunAnalysis, SignificanceResult};
use crate::parser::ParsedSection;
use crate::stats;

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => "n/a".to_string(),
    }
}

fn write_result(output: &mut String, result: &SignificanceResult) {
    let marker = if result.is_significant { " **significant**" } else { "" };
    let _ = writeln!(
        output,
        "- {}: GPA {} across {} students, z {}, p {} ({}){}",
        result.section_id,
        format_optional(result.section_mean, 3),
        result.student_count,
        format_optional(result.z_score, 3),
        format_optional(result.p_value, 5),
        result.direction,
        marker
    );
    if let Some(note) = &result.note {
        let _ = writeln!(output, "  - {note}");
    }
}

fn write_list(output: &mut String, kind: ListKind, records: &[GradeRecord]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", kind.title());

    if records.is_empty() {
        let _ = writeln!(output, "No students qualify for this list.");
        return;
    }

    for record in records {
        let _ = writeln!(
            output,
            "- {}, {} ({}) earned {} in {}",
            record.last_name,
            record.first_name,
            record.student_id,
            record.letter_grade,
            record.section_id
        );
    }
}

pub fn build_report(
    analysis: &RunAnalysis,
    generated_on: NaiveDate,
    sections: &[&ParsedSection],
    good: &[GradeRecord],
    work: &[GradeRecord],
    issues: &[FileIssue],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Section GPA Report: {}", analysis.run);
    let _ = writeln!(
        output,
        "Generated {} (significance threshold |z| >= {:.2})",
        generated_on, analysis.threshold
    );
    let _ = writeln!(
        output,
        "Run GPA {:.3} (std dev {:.3}) across {} graded students",
        analysis.aggregate.mean_gpa, analysis.aggregate.std_dev, analysis.aggregate.student_count
    );

    for group in &analysis.groups {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Group {}", group.group);
        let _ = writeln!(
            output,
            "Group GPA {:.3} (std dev {:.3}) across {} graded students",
            group.aggregate.mean_gpa, group.aggregate.std_dev, group.aggregate.student_count
        );

        if group.results.is_empty() {
            let _ = writeln!(output, "No sections could be read for this group.");
            continue;
        }

        for result in &group.results {
            write_result(&mut output, result);
        }
    }

    if !sections.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Grade Mix");
        for section in sections {
            let mix: Vec<String> = stats::grade_distribution(&section.records)
                .into_iter()
                .map(|(grade, count)| format!("{grade}: {count}"))
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                section.section_id,
                section.header.course_id,
                if mix.is_empty() { "no records".to_string() } else { mix.join(", ") }
            );
        }
    }

    write_list(&mut output, ListKind::Good, good);
    write_list(&mut output, ListKind::Work, work);

    let skipped: Vec<&ParsedSection> = sections
        .iter()
        .copied()
        .filter(|section| !section.warnings.is_empty())
        .collect();

    if !issues.is_empty() || !skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## File Issues");
        for issue in issues {
            let _ = writeln!(output, "- {}", issue.error);
        }
        for section in skipped {
            let lines: Vec<String> = section
                .warnings
                .iter()
                .map(|warning| warning.line.to_string())
                .collect();
            let _ = writeln!(
                output,
                "- {}: skipped {} malformed line(s) ({})",
                section.section_id,
                section.warnings.len(),
                lines.join(", ")
            );
        }
    }

    output
}
