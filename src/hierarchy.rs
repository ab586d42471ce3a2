//! Run → group → section reference resolution.
//!
//! A run file lives at `<base>/Runs/<name>.run`. Group files are looked up in
//! `<base>/Groups/` and section files in `<base>/Sections/`. Each reference
//! file has one title line followed by one file name per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{FileIssue, PipelineError, Result};

pub const GROUPS_DIR: &str = "Groups";
pub const SECTIONS_DIR: &str = "Sections";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub base: PathBuf,
}

impl RunLayout {
    pub fn for_run_file(run_file: &Path) -> Result<Self> {
        let absolute = std::path::absolute(run_file)
            .map_err(|err| PipelineError::from_io(run_file, err))?;
        let base = absolute
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok(Self { base })
    }

    pub fn groups_dir(&self) -> PathBuf {
        self.base.join(GROUPS_DIR)
    }

    pub fn sections_dir(&self) -> PathBuf {
        self.base.join(SECTIONS_DIR)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    pub name: String,
    pub path: PathBuf,
    pub sections: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Resolution {
    pub run_file: PathBuf,
    pub title: String,
    pub groups: Vec<ResolvedGroup>,
    pub issues: Vec<FileIssue>,
}

impl Resolution {
    /// Every section path in file order, duplicates kept.
    pub fn section_paths(&self) -> Vec<PathBuf> {
        self.groups
            .iter()
            .flat_map(|group| group.sections.iter().cloned())
            .collect()
    }
}

/// Title line plus the non-blank references that follow it. An empty list
/// is not an error here.
pub fn read_title_and_references(path: &Path) -> Result<(String, Vec<String>)> {
    let file = File::open(path).map_err(|err| PipelineError::from_io(path, err))?;
    let mut lines = BufReader::new(file).lines();

    let title = match lines.next() {
        Some(line) => line.map_err(|err| PipelineError::from_io(path, err))?,
        None => String::new(),
    };

    let mut references = Vec::new();
    for line in lines {
        let line = line.map_err(|err| PipelineError::from_io(path, err))?;
        let reference = line.trim();
        if !reference.is_empty() {
            references.push(reference.to_string());
        }
    }

    Ok((title.trim().to_string(), references))
}

/// Like [`read_title_and_references`], but a file with no references is
/// an `EmptyReferenceFile` error.
pub fn read_reference_file(path: &Path) -> Result<(String, Vec<String>)> {
    let (title, references) = read_title_and_references(path)?;
    if references.is_empty() {
        return Err(PipelineError::EmptyReferenceFile {
            path: path.to_path_buf(),
        });
    }
    Ok((title, references))
}

/// Fails only when the run file itself cannot be read. Missing or empty
/// group files, and an empty run file, are recorded as issues.
pub fn resolve_run(run_file: &Path) -> Result<Resolution> {
    let run_path =
        std::path::absolute(run_file).map_err(|err| PipelineError::from_io(run_file, err))?;
    let layout = RunLayout::for_run_file(&run_path)?;

    let mut issues = Vec::new();
    let (title, group_names) = read_title_and_references(run_file)?;
    if group_names.is_empty() {
        warn!(run = %run_file.display(), "run file lists no groups");
        issues.push(FileIssue::new(
            run_file,
            PipelineError::EmptyReferenceFile {
                path: run_file.to_path_buf(),
            },
        ));
    }

    let groups_dir = layout.groups_dir();
    let sections_dir = layout.sections_dir();
    let mut groups = Vec::new();

    for name in group_names {
        let path = groups_dir.join(&name);
        match read_reference_file(&path) {
            Ok((_, section_names)) => {
                let sections: Vec<PathBuf> = section_names
                    .iter()
                    .map(|section| sections_dir.join(section))
                    .collect();
                debug!(group = %name, sections = sections.len(), "resolved group");
                groups.push(ResolvedGroup {
                    name,
                    path,
                    sections,
                });
            }
            Err(err) => {
                warn!(group = %path.display(), error = %err, "skipping group");
                issues.push(FileIssue::new(path, err));
            }
        }
    }

    Ok(Resolution {
        run_file: run_path,
        title,
        groups,
        issues,
    })
}
