use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// How bad a format problem is. Warnings still apply the offending table;
/// errors reject the derived update outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A format problem detected while compiling a table, before it has been
/// attributed to a named table.
#[derive(Debug, Clone)]
pub struct FormatCheck {
    pub problem: String,
    pub detail: String,
    pub severity: Severity,
}

impl FormatCheck {
    pub fn error(problem: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            detail: detail.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(problem: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            detail: detail.into(),
            severity: Severity::Warning,
        }
    }
}

/// A format problem attributed to a table, carrying whether the table was
/// applied anyway. This is a plain result value: callers decide what to do
/// from `severity` and `applied`, not from which exception reached them.
#[derive(Debug, Clone)]
pub struct FormatIssue {
    pub table: String,
    pub problem: String,
    pub detail: String,
    pub severity: Severity,
    pub applied: bool,
}

impl FormatIssue {
    pub fn from_check(table: impl Into<String>, check: FormatCheck, applied: bool) -> Self {
        Self {
            table: table.into(),
            problem: check.problem,
            detail: check.detail,
            severity: check.severity,
            applied,
        }
    }
}

impl std::fmt::Display for FormatIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "Format warning",
            Severity::Error => "Format error",
        };
        write!(
            f,
            "{} in the {} sheet: there is a problem with the {}{}",
            kind, self.table, self.problem, self.detail
        )
    }
}

impl std::error::Error for FormatIssue {}

/// A well-formed operator command carrying invalid data, e.g. an
/// out-of-range cue group or a show name that does not exist.
#[derive(Debug, Clone)]
pub struct InvalidCommandInput(pub String);

impl std::fmt::Display for InvalidCommandInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Input Error: {}", self.0)
    }
}

impl std::error::Error for InvalidCommandInput {}

/// Why a scheduled task stopped. `Stop` is the clean shutdown signal raised
/// when the presentation layer closes; anything else is fatal and gets
/// recorded to the error log before the run ends.
#[derive(Debug)]
pub enum TaskExit {
    Stop,
    Fatal(anyhow::Error),
}

impl std::fmt::Display for TaskExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskExit::Stop => write!(f, "stop requested"),
            TaskExit::Fatal(err) => write!(f, "fatal task error: {:#}", err),
        }
    }
}

impl From<anyhow::Error> for TaskExit {
    fn from(err: anyhow::Error) -> Self {
        TaskExit::Fatal(err)
    }
}

/// Append-only, deduplicated log of failure records persisted as JSON.
/// Loading a missing or corrupt file yields an empty log.
pub struct ErrorLog {
    path: PathBuf,
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = File::open(&path)
            .ok()
            .and_then(|file| serde_json::from_reader(file).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    /// Record a failure signature. Identical signatures are not re-recorded.
    pub fn record(&mut self, signature: impl Into<String>) {
        let signature = signature.into();
        if !self.entries.iter().any(|entry| *entry == signature) {
            self.entries.push(signature);
        }
        self.flush();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.flush();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) {
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                if parent != Path::new("") {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = File::create(&self.path)?;
            serde_json::to_writer_pretty(file, &self.entries)?;
            Ok(())
        };
        if let Err(err) = write() {
            log::error!("failed to persist error log to {:?}: {:#}", self.path, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_error_log_deduplicates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("errors.json");

        let mut log = ErrorLog::new(&path);
        log.record("task failed: boom");
        log.record("task failed: boom");
        log.record("task failed: other");
        assert_eq!(log.entries().len(), 2);

        // Reload from disk.
        let log = ErrorLog::new(&path);
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn test_error_log_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = ErrorLog::new(temp_dir.path().join("nope.json"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_format_issue_display_names_the_table() {
        let issue = FormatIssue::from_check(
            "all cues",
            FormatCheck::error("column titles", " because they are wrong"),
            false,
        );
        let text = issue.to_string();
        assert!(text.contains("all cues"));
        assert!(text.contains("column titles"));
    }
}
