//! Top-level operations. Every call re-reads the run, group and section
//! files from scratch and holds no state between calls.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::classifier;
use crate::config::{AnalysisOptions, ParseMode};
use crate::error::{BatchResult, FileIssue, Result};
use crate::hierarchy;
use crate::models::{GradeRecord, ListKind, RunAnalysis};
use crate::parser::{self, ParsedSection};
use crate::significance;
use crate::stats;

#[derive(Debug, Clone)]
pub struct LoadedGroup {
    pub name: String,
    pub sections: Vec<ParsedSection>,
}

#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub run_file: PathBuf,
    pub title: String,
    pub groups: Vec<LoadedGroup>,
}

impl LoadedRun {
    pub fn name(&self) -> String {
        self.run_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn sections(&self) -> impl Iterator<Item = &ParsedSection> {
        self.groups.iter().flat_map(|group| group.sections.iter())
    }

    /// Every parsed record, concatenated in resolution order.
    pub fn records(&self) -> Vec<GradeRecord> {
        self.sections()
            .flat_map(|section| section.records.iter().cloned())
            .collect()
    }
}

pub fn load_run(run_file: &Path, mode: ParseMode) -> Result<BatchResult<LoadedRun>> {
    let resolution = hierarchy::resolve_run(run_file)?;
    let mut issues = resolution.issues;
    let mut groups = Vec::with_capacity(resolution.groups.len());

    for group in resolution.groups {
        let mut sections = Vec::with_capacity(group.sections.len());
        for path in &group.sections {
            match parser::parse_section_file(path, mode) {
                Ok(section) => sections.push(section),
                Err(err) => {
                    warn!(section = %path.display(), error = %err, "section skipped");
                    issues.push(FileIssue::new(path, err));
                }
            }
        }
        groups.push(LoadedGroup {
            name: group.name,
            sections,
        });
    }

    Ok(BatchResult {
        value: LoadedRun {
            run_file: resolution.run_file,
            title: resolution.title,
            groups,
        },
        issues,
    })
}

pub fn analyze_loaded(run: &LoadedRun, threshold: f64) -> RunAnalysis {
    let groups = run
        .groups
        .iter()
        .map(|group| {
            let sections: Vec<(&str, &[GradeRecord])> = group
                .sections
                .iter()
                .map(|section| (section.section_id.as_str(), section.records.as_slice()))
                .collect();
            significance::analyze_group(&group.name, &sections, threshold)
        })
        .collect();

    RunAnalysis {
        run: run.name(),
        threshold,
        aggregate: stats::group_stats(run.sections().map(|section| section.records.as_slice())),
        groups,
    }
}

pub fn analyze_sections(
    run_file: &Path,
    options: &AnalysisOptions,
) -> Result<BatchResult<RunAnalysis>> {
    let loaded = load_run(run_file, options.mode)?;
    let analysis = loaded.map(|run| analyze_loaded(&run, options.threshold));
    info!(
        run = %analysis.value.run,
        groups = analysis.value.groups.len(),
        issues = analysis.issues.len(),
        "analysis complete"
    );
    Ok(analysis)
}

pub fn performance_list(
    kind: ListKind,
    run_file: &Path,
    mode: ParseMode,
) -> Result<BatchResult<Vec<GradeRecord>>> {
    let loaded = load_run(run_file, mode)?;
    Ok(loaded.map(|run| classifier::classify(kind, &run.records())))
}

pub fn good_list(run_file: &Path, mode: ParseMode) -> Result<BatchResult<Vec<GradeRecord>>> {
    performance_list(ListKind::Good, run_file, mode)
}

pub fn work_list(run_file: &Path, mode: ParseMode) -> Result<BatchResult<Vec<GradeRecord>>> {
    performance_list(ListKind::Work, run_file, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        for sub in ["Runs", "Groups", "Sections"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("Runs/spring.run"), "Spring\nCS.grp\n").unwrap();
        fs::write(dir.path().join("Groups/CS.grp"), "CS\nS1.sec\nS2.sec\n").unwrap();
        fs::write(
            dir.path().join("Sections/S1.sec"),
            "CS110 4\n\"Doe, John\",\"1\",\"A\"\n\"Roe, Rita\",\"2\",\"B+\"\n\"Poe, Pat\",\"3\",\"B-\"\n\"Loe, Lou\",\"4\",\"C+\"\n\"Moe, Max\",\"5\",\"F\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Sections/S2.sec"),
            "CS110 4\n\"Ng, Ann\",\"6\",\"A-\"\n\"Oh, Bo\",\"7\",\"B\"\n\"Pi, Cy\",\"8\",\"B\"\n\"Qu, Di\",\"9\",\"C-\"\n\"Ro, Ed\",\"10\",\"D\"\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn analysis_uses_group_baseline() {
        let dir = fixture();
        let result =
            analyze_sections(&dir.path().join("Runs/spring.run"), &AnalysisOptions::default())
                .unwrap();
        assert!(result.is_complete());

        let analysis = result.value;
        assert_eq!(analysis.run, "spring");
        assert_eq!(analysis.groups.len(), 1);
        let group = &analysis.groups[0];
        assert!((group.aggregate.mean_gpa - 2.47).abs() < 1e-9);
        assert_eq!(group.aggregate.student_count, 10);
        assert_eq!(group.results.len(), 2);
        assert!(group.results.iter().all(|r| !r.is_significant));
        assert_eq!(analysis.aggregate.student_count, 10);
    }

    #[test]
    fn lists_come_from_every_section() {
        let dir = fixture();
        let run = dir.path().join("Runs/spring.run");

        let good = good_list(&run, ParseMode::Lenient).unwrap().value;
        let ids: Vec<&str> = good.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "6"]);

        let work = work_list(&run, ParseMode::Lenient).unwrap().value;
        let ids: Vec<&str> = work.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["5", "10"]);
    }
}
