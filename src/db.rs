use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{GradeRecord, HistoryEntry, HistoryMatch, ListKind};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stores each flagged record and reports whether the student was already
/// on that list from an earlier run.
pub async fn record_flags(
    pool: &PgPool,
    kind: ListKind,
    entries: &[GradeRecord],
) -> anyhow::Result<Vec<HistoryMatch>> {
    let recorded_on: NaiveDate = Utc::now().date_naive();
    let mut matches = Vec::with_capacity(entries.len());

    for entry in entries {
        let prior_sections: Vec<String> = sqlx::query(
            r#"
            SELECT section_id
            FROM section_gpa.flag_history
            WHERE list_kind = $1 AND student_id = $2
            ORDER BY recorded_on, section_id
            "#,
        )
        .bind(kind.as_str())
        .bind(&entry.student_id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.get("section_id"))
        .collect();

        let result = sqlx::query(
            r#"
            INSERT INTO section_gpa.flag_history
            (id, list_kind, student_id, first_name, last_name, grade, section_id, recorded_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (list_kind, student_id, section_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(&entry.student_id)
        .bind(&entry.first_name)
        .bind(&entry.last_name)
        .bind(entry.letter_grade.as_str())
        .bind(&entry.section_id)
        .bind(recorded_on)
        .execute(pool)
        .await?;

        debug!(
            student = %entry.student_id,
            section = %entry.section_id,
            inserted = result.rows_affected(),
            "recorded flag"
        );

        matches.push(HistoryMatch {
            student_id: entry.student_id.clone(),
            section_id: entry.section_id.clone(),
            grade: entry.letter_grade,
            already_known: !prior_sections.is_empty(),
            prior_sections,
        });
    }

    Ok(matches)
}

pub async fn fetch_student_history(
    pool: &PgPool,
    student_id: &str,
) -> anyhow::Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, list_kind, student_id, first_name, last_name, grade, section_id, recorded_on
        FROM section_gpa.flag_history
        WHERE student_id = $1
        ORDER BY recorded_on, list_kind, section_id
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();

    for row in rows {
        entries.push(HistoryEntry {
            id: row.get("id"),
            list_kind: row.get("list_kind"),
            student_id: row.get("student_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            grade: row.get("grade"),
            section_id: row.get("section_id"),
            recorded_on: row.get("recorded_on"),
        });
    }

    Ok(entries)
}
