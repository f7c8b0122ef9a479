//! Core types for lint results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::SuppressedMatch;

/// Line number recorded for block-level matches, which have no single
/// originating line.
pub const BLOCK_LINE: usize = 0;

/// Severity levels for rules, most severe first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    VeryHigh,
    High,
    #[default]
    Medium,
    Low,
    VeryLow,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::VeryHigh => "VERY_HIGH",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::VeryLow => "VERY_LOW",
            Severity::Info => "INFO",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "VERY_HIGH" => Ok(Severity::VeryHigh),
            "HIGH" => Ok(Severity::High),
            "MEDIUM" => Ok(Severity::Medium),
            "LOW" => Ok(Severity::Low),
            "VERY_LOW" => Ok(Severity::VeryLow),
            "INFO" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// What role a file plays in a project. Decides which references the
/// resolver follows from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Playbook,
    Tasks,
    Handlers,
    Meta,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Playbook => "playbook",
            FileKind::Tasks => "tasks",
            FileKind::Handlers => "handlers",
            FileKind::Meta => "meta",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file scheduled for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LintFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

impl LintFile {
    pub fn new<P: AsRef<Path>>(path: P, kind: FileKind) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind,
        }
    }

    pub fn playbook<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path, FileKind::Playbook)
    }

    /// Path rendered for messages.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Result of asking a rule about one line or one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    NotMatched,
    /// Matched, optionally overriding the rule's short description.
    Matched(Option<String>),
}

impl MatchOutcome {
    pub fn with_message(message: impl Into<String>) -> Self {
        MatchOutcome::Matched(Some(message.into()))
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

impl From<bool> for MatchOutcome {
    fn from(matched: bool) -> Self {
        if matched {
            MatchOutcome::Matched(None)
        } else {
            MatchOutcome::NotMatched
        }
    }
}

/// A single reported violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub rule_id: String,
    pub message: String,
    pub file: String,
    /// 1-based line for line matches, [`BLOCK_LINE`] for block matches.
    pub line: usize,
    /// Line used for suppression lookups; the defining line of the block
    /// for block matches.
    pub origin_line: usize,
    /// The matched line, or a compact rendering of the matched block.
    pub text: String,
    pub severity: Severity,
}

impl Match {
    pub fn is_block_match(&self) -> bool {
        self.line == BLOCK_LINE
    }
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] ({}) matched {}:{} {}",
            self.rule_id, self.message, self.file, self.line, self.text
        )
    }
}

/// A rule that panicked while checking a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFault {
    pub rule_id: String,
    pub file: String,
    pub message: String,
}

impl std::fmt::Display for RuleFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule {} failed on {}: {}", self.rule_id, self.file, self.message)
    }
}

/// A file that could not be read during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Results of running every rule against one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintResult {
    pub matches: Vec<Match>,
    /// Matches silenced by `noqa` annotations or the skip tag
    #[serde(default)]
    pub suppressed: Vec<SuppressedMatch>,
    #[serde(default)]
    pub faults: Vec<RuleFault>,
    /// Why block matching was unavailable for this file, if it was
    #[serde(default)]
    pub parse_error: Option<String>,
}

impl LintResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suppressed matches.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }
}
