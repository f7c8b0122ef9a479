//! The rule contract and the drivers that apply a rule to a file.
//!
//! A rule exposes two independent capabilities, line matching and block
//! matching. Both default to never matching, so a rule only implements the
//! one it needs.

use super::tasks::TaskDocument;
use super::{LintFile, Match, MatchOutcome, Severity, TaskBlock, BLOCK_LINE};

/// Descriptive data shared by every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMeta {
    /// Unique identifier, also used by `noqa` annotations.
    pub id: String,
    pub short_description: String,
    pub description: String,
    pub severity: Severity,
    pub tags: Vec<String>,
}

impl RuleMeta {
    pub fn new(
        id: impl Into<String>,
        short_description: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            short_description: short_description.into(),
            description: description.into(),
            severity: Severity::default(),
            tags: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Id, short description and long description on two lines.
    pub fn verbose(&self) -> String {
        format!("{}: {}\n{}", self.id, self.short_description, self.description)
    }
}

impl std::fmt::Display for RuleMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.short_description)
    }
}

/// A self-contained check.
///
/// Rules are shared across files and threads; implementations must not keep
/// per-file state.
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMeta;

    /// Check one raw line of text.
    fn match_line(&self, _file: &LintFile, _line: &str) -> MatchOutcome {
        MatchOutcome::NotMatched
    }

    /// Check one task block. Called for every flattened block, nested ones included.
    fn match_block(&self, _file: &LintFile, _block: &TaskBlock) -> MatchOutcome {
        MatchOutcome::NotMatched
    }
}

fn make_match(
    meta: &RuleMeta,
    file: &LintFile,
    line: usize,
    origin_line: usize,
    text: String,
    message: Option<String>,
) -> Match {
    Match {
        rule_id: meta.id.clone(),
        message: message.unwrap_or_else(|| meta.short_description.clone()),
        file: file.display_path(),
        line,
        origin_line,
        text,
        severity: meta.severity,
    }
}

/// Run a rule's line capability over every line of `text`.
pub fn match_lines(rule: &dyn Rule, file: &LintFile, text: &str) -> Vec<Match> {
    let meta = rule.meta();
    text.split('\n')
        .enumerate()
        .filter_map(|(idx, line)| match rule.match_line(file, line) {
            MatchOutcome::NotMatched => None,
            MatchOutcome::Matched(message) => {
                Some(make_match(meta, file, idx + 1, idx + 1, line.to_string(), message))
            }
        })
        .collect()
}

/// Run a rule's block capability over every flattened block of a parsed
/// document. A document that failed to parse yields no block matches.
pub fn match_blocks(rule: &dyn Rule, file: &LintFile, document: Option<&TaskDocument>) -> Vec<Match> {
    let Some(document) = document else {
        return Vec::new();
    };
    let meta = rule.meta();
    document
        .flatten()
        .into_iter()
        .filter_map(|block| match rule.match_block(file, block) {
            MatchOutcome::NotMatched => None,
            MatchOutcome::Matched(message) => Some(make_match(
                meta,
                file,
                BLOCK_LINE,
                block.line,
                block.summary(),
                message,
            )),
        })
        .collect()
}

/// Both capabilities of one rule over raw text, without suppression.
pub fn match_text(rule: &dyn Rule, file: &LintFile, text: &str) -> Vec<Match> {
    let document = TaskDocument::parse(text).ok();
    let mut found = match_lines(rule, file, text);
    found.extend(match_blocks(rule, file, document.as_ref()));
    found
}
