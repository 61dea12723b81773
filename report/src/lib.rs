//! Report generation for benchmark result logs
//!
//! The benchmarks write free-form text, so reports stay shallow: for every
//! `*.log` in a results directory, the command that produced it and its last
//! few lines, which is where the benchmarks print their summaries. Output is
//! either plain text or JSON.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Lines shown per log when none are requested
pub const DEFAULT_TAIL_LINES: usize = 5;

/// Prefix of the first line of every launcher log
pub const COMMAND_PREFIX: &str = "Command: ";

/// Report errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// The results directory could not be listed
    #[error("failed to read results directory {}: {source}", path.display())]
    ReadDir {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// Tail of one benchmark log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogTail {
    /// Log file path
    pub path: PathBuf,

    /// Command line from the log header, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Last lines of benchmark output, oldest first
    pub lines: Vec<String>,

    /// Why the file could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogTail {
    /// Tail a single log file
    ///
    /// Read failures are recorded in `error` rather than returned, so one
    /// unreadable file does not hide the rest of a report. Invalid UTF-8 is
    /// replaced rather than treated as an error.
    pub fn read(path: &Path, lines: usize) -> Self {
        match fs::read(path) {
            Ok(bytes) => Self::parse(path, &String::from_utf8_lossy(&bytes), lines),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read log");
                Self {
                    path: path.to_path_buf(),
                    command: None,
                    lines: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn parse(path: &Path, contents: &str, n: usize) -> Self {
        let mut body: Vec<&str> = contents.lines().collect();

        let command = body
            .first()
            .and_then(|l| l.strip_prefix(COMMAND_PREFIX))
            .map(str::to_string);
        if command.is_some() {
            // Header is the command line plus one blank separator
            let header = if body.get(1).is_some_and(|l| l.is_empty()) { 2 } else { 1 };
            body.drain(..header);
        }

        let start = body.len().saturating_sub(n);
        Self {
            path: path.to_path_buf(),
            command,
            lines: body[start..].iter().map(|l| l.to_string()).collect(),
            error: None,
        }
    }
}

/// Tail every `*.log` file in `dir`, sorted by file name
pub fn tail_logs(dir: &Path, lines: usize) -> Result<Vec<LogTail>, ReportError> {
    let entries = fs::read_dir(dir).map_err(|source| ReportError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "log"))
        .collect();
    paths.sort();

    tracing::debug!(dir = %dir.display(), logs = paths.len(), "Collected result logs");
    Ok(paths.iter().map(|p| LogTail::read(p, lines)).collect())
}

/// Render tails as plain text
pub fn render_text(tails: &[LogTail]) -> String {
    let mut out = String::new();
    for tail in tails {
        let _ = writeln!(out, "File: {}", tail.path.display());
        if let Some(command) = &tail.command {
            let _ = writeln!(out, "{COMMAND_PREFIX}{command}");
        }
        let _ = writeln!(out, "{}", "-".repeat(50));
        match &tail.error {
            Some(err) => {
                let _ = writeln!(out, "Error reading file: {err}");
            }
            None => {
                for line in &tail.lines {
                    let _ = writeln!(out, "{line}");
                }
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_strips_command_header() {
        let tail = LogTail::parse(
            Path::new("a.log"),
            "Command: ib_write_bw -d mlx5_0\n\nline1\nline2\n",
            5,
        );
        assert_eq!(tail.command.as_deref(), Some("ib_write_bw -d mlx5_0"));
        assert_eq!(tail.lines, vec!["line1", "line2"]);
    }

    #[test]
    fn test_parse_keeps_last_lines() {
        let contents: String = (1..=8).map(|i| format!("l{i}\n")).collect();
        let tail = LogTail::parse(Path::new("a.log"), &contents, 3);
        assert!(tail.command.is_none());
        assert_eq!(tail.lines, vec!["l6", "l7", "l8"]);
    }

    #[test]
    fn test_tail_logs_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_log(dir.path(), "b.log", "Command: b\n\nbw 10\n");
        write_log(dir.path(), "a.log", "Command: a\n\nbw 20\n");
        write_log(dir.path(), "notes.txt", "ignored\n");
        fs::create_dir(dir.path().join("nested.log")).unwrap();

        let tails = tail_logs(dir.path(), DEFAULT_TAIL_LINES).unwrap();
        let names: Vec<_> = tails
            .iter()
            .map(|t| t.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
        assert_eq!(tails[0].lines, vec!["bw 20"]);
    }

    #[test]
    fn test_tail_logs_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = tail_logs(&dir.path().join("absent"), 5).unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_unreadable_file_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let tail = LogTail::read(&dir.path().join("gone.log"), 5);
        assert!(tail.error.is_some());
        assert!(render_text(&[tail]).contains("Error reading file"));
    }

    #[test]
    fn test_non_utf8_log_is_still_tailed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.log");
        fs::write(&path, b"Command: bench\n\nok\nbad \xff\xfe byte\n").unwrap();

        let tail = LogTail::read(&path, 5);
        assert!(tail.error.is_none());
        assert_eq!(tail.command.as_deref(), Some("bench"));
        assert_eq!(tail.lines, vec!["ok".to_string(), "bad \u{fffd}\u{fffd} byte".to_string()]);
    }

    #[test]
    fn test_render_text_layout() {
        let tail = LogTail {
            path: PathBuf::from("results/x.log"),
            command: Some("ib_write_bw -d mlx5_0".into()),
            lines: vec!["65536 1000 11.2".into()],
            error: None,
        };
        let text = render_text(&[tail]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "File: results/x.log");
        assert_eq!(lines[1], "Command: ib_write_bw -d mlx5_0");
        assert_eq!(lines[2], "-".repeat(50));
        assert_eq!(lines[3], "65536 1000 11.2");
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let tail = LogTail {
            path: PathBuf::from("x.log"),
            command: None,
            lines: vec![],
            error: None,
        };
        let json = serde_json::to_string(&tail).unwrap();
        assert!(!json.contains("command"));
        assert!(!json.contains("error"));
        assert!(json.contains("\"lines\":[]"));
    }
}
