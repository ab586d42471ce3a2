use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::ParseMode;
use crate::error::{PipelineError, Result};
use crate::models::{GradeRecord, LetterGrade, LineWarning, SectionHeader};

static QUOTED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("quoted field pattern is valid"));

#[derive(Debug, Clone)]
pub struct ParsedSection {
    pub path: PathBuf,
    pub section_id: String,
    pub header: SectionHeader,
    pub records: Vec<GradeRecord>,
    pub warnings: Vec<LineWarning>,
}

/// Base file name without its extension.
pub fn section_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_section_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sec"))
}

pub fn parse_section_file(path: &Path, mode: ParseMode) -> Result<ParsedSection> {
    let file = File::open(path).map_err(|err| PipelineError::from_io(path, err))?;
    if !has_section_extension(path) {
        return Err(PipelineError::WrongExtension {
            path: path.to_path_buf(),
        });
    }

    let section_id = section_id_for(path);
    let mut lines = BufReader::new(file).split(b'\n');

    let header_line = match lines.next() {
        Some(bytes) => {
            let bytes = bytes.map_err(|err| PipelineError::from_io(path, err))?;
            decode_line(bytes).map_err(|_| PipelineError::MalformedHeader {
                path: path.to_path_buf(),
                header: "<not valid UTF-8>".to_string(),
            })?
        }
        None => String::new(),
    };
    let header = parse_header(&header_line).ok_or_else(|| PipelineError::MalformedHeader {
        path: path.to_path_buf(),
        header: header_line.trim().to_string(),
    })?;

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (index, bytes) in lines.enumerate() {
        let bytes = bytes.map_err(|err| PipelineError::from_io(path, err))?;
        // header is line 1
        let line_number = index + 2;
        let parsed = match decode_line(bytes) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => parse_record_line(&line, &section_id),
            Err(reason) => Err(reason),
        };

        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => match mode {
                ParseMode::Strict => {
                    return Err(PipelineError::MalformedSectionFile {
                        path: path.to_path_buf(),
                        line: line_number,
                        reason,
                    });
                }
                ParseMode::Lenient => {
                    warn!(file = %path.display(), line = line_number, %reason, "skipping malformed line");
                    warnings.push(LineWarning {
                        line: line_number,
                        reason,
                    });
                }
            },
        }
    }

    debug!(
        file = %path.display(),
        records = records.len(),
        skipped = warnings.len(),
        "parsed section"
    );

    Ok(ParsedSection {
        path: path.to_path_buf(),
        section_id,
        header,
        records,
        warnings,
    })
}

/// Strips the line terminator; invalid UTF-8 is reported as a line error.
fn decode_line(mut bytes: Vec<u8>) -> std::result::Result<String, String> {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|err| {
        format!(
            "not valid UTF-8 after byte {}",
            err.utf8_error().valid_up_to()
        )
    })
}

/// Needs at least two whitespace tokens; the second is only kept when numeric.
pub fn parse_header(line: &str) -> Option<SectionHeader> {
    let mut tokens = line.split_whitespace();
    let course_id = tokens.next()?;
    let second = tokens.next()?;
    Some(SectionHeader {
        course_id: course_id.to_string(),
        credit_hours: second.parse::<f64>().ok(),
    })
}

pub fn parse_record_line(
    line: &str,
    section_id: &str,
) -> std::result::Result<GradeRecord, String> {
    let fields: Vec<&str> = QUOTED_FIELD
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    if fields.len() < 3 {
        return Err(format!(
            "expected 3 quoted fields, found {}",
            fields.len()
        ));
    }

    let (last_name, first_name) = match fields[0].split_once(',') {
        Some((last, first)) => (last.trim(), first.trim()),
        None => (fields[0].trim(), ""),
    };

    let student_id = fields[1].trim();
    if student_id.is_empty() {
        return Err("empty student id".to_string());
    }

    let letter_grade = fields[2].trim().parse::<LetterGrade>()?;

    Ok(GradeRecord {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        student_id: student_id.to_string(),
        letter_grade,
        section_id: section_id.to_string(),
    })
}
