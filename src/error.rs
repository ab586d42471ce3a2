use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("{}: section files must have a .sec extension", path.display())]
    WrongExtension { path: PathBuf },

    #[error("{}: malformed header {header:?}, expected a course id and credit hours", path.display())]
    MalformedHeader { path: PathBuf, header: String },

    #[error("{}: line {line}: {reason}", path.display())]
    MalformedSectionFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{}: no references listed after the header line", path.display())]
    EmptyReferenceFile { path: PathBuf },

    #[error("comparison undefined: group standard deviation is zero")]
    UndefinedComparison,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Maps an I/O failure on `path`, keeping not-found distinct.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            PipelineError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PipelineError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A per-file failure collected during a batch instead of aborting it.
#[derive(Debug)]
pub struct FileIssue {
    pub path: PathBuf,
    pub error: PipelineError,
}

impl FileIssue {
    pub fn new(path: impl Into<PathBuf>, error: PipelineError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

/// Partial output of a batch operation plus everything that went wrong on the way.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub value: T,
    pub issues: Vec<FileIssue>,
}

impl<T> BatchResult<T> {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BatchResult<U> {
        BatchResult {
            value: f(self.value),
            issues: self.issues,
        }
    }
}
