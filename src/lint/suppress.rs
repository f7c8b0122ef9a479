//! Selective silencing of matches.
//!
//! Two independent axes decide whether a match is reported:
//! - tag filtering, per run: rules are included or excluded by their tags
//! - inline and structural suppression, per line or block:
//!   - `# noqa` trailing a line silences every rule on that line
//!   - `# noqa 401 501` (or `# noqa 401,501`) silences only the listed rules
//!   - a task tagged `skip_ansible_lint` silences everything written inside it

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Match, RuleMeta, TaskDocument};

/// Task tag that disables analysis of the task and everything nested in it.
pub const SKIP_TAG: &str = "skip_ansible_lint";

lazy_static::lazy_static! {
    /// Trailing `# noqa` annotation, optionally followed by rule ids.
    static ref NOQA_PATTERN: Regex = Regex::new(r"(?:^|\s)#\s*noqa\b(?P<ids>[^#]*)").unwrap();
}

/// Decides which rules take part in a run.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl TagFilter {
    pub fn new<I, J, S, T>(include: I, exclude: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// A rule runs when the inclusion set is empty or shares a tag with it,
    /// and it shares no tag with the exclusion set. The rule id counts as
    /// one of its tags.
    pub fn allows(&self, meta: &RuleMeta) -> bool {
        let labels = || {
            meta.tags
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(meta.id.as_str()))
        };
        let included = self.include.is_empty() || labels().any(|t| self.include.contains(t));
        included && !labels().any(|t| self.exclude.contains(t))
    }
}

/// How a suppression was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionType {
    /// `# noqa` annotation on a line
    Inline,
    /// Skip tag on an enclosing task
    SkipTag,
}

/// A suppression directive found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule ids named by the directive; empty means every rule
    pub rules: Vec<String>,
    /// Line of the annotation, or the defining line of the skipped task
    pub line: usize,
    pub suppression_type: SuppressionType,
}

impl Suppression {
    pub fn covers(&self, rule_id: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r == rule_id)
    }
}

/// A match that was suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedMatch {
    pub finding: Match,
    pub suppression: Suppression,
}

/// Extract the rule ids of a `noqa` annotation on `line`, if it has one.
/// An empty list means the annotation names no rules.
pub fn parse_noqa(line: &str) -> Option<Vec<String>> {
    let caps = NOQA_PATTERN.captures(line)?;
    let ids = caps.name("ids").map(|m| m.as_str()).unwrap_or("");
    Some(
        ids.split(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Every suppression directive of one file, ready for lookups.
#[derive(Debug, Clone, Default)]
pub struct SuppressionIndex {
    inline: HashMap<usize, Suppression>,
    /// Spans (first line, last line) of tasks carrying the skip tag.
    skipped: Vec<(usize, usize)>,
    /// Own lines of each block, keyed by its defining line.
    block_lines: HashMap<usize, Vec<usize>>,
}

impl SuppressionIndex {
    /// Collect directives from the raw text and, when the file parsed, from
    /// its task structure.
    pub fn build(text: &str, document: Option<&TaskDocument>) -> Self {
        let mut index = Self::default();

        for (idx, line) in text.split('\n').enumerate() {
            if let Some(rules) = parse_noqa(line) {
                index.inline.insert(
                    idx + 1,
                    Suppression {
                        rules,
                        line: idx + 1,
                        suppression_type: SuppressionType::Inline,
                    },
                );
            }
        }

        if let Some(document) = document {
            for block in document.flatten() {
                if block.tags().iter().any(|t| t == SKIP_TAG) {
                    index.skipped.push((block.line, block.end_line));
                }
                index
                    .block_lines
                    .entry(block.line)
                    .or_insert_with(|| block.own_lines().collect());
            }
        }

        index
    }

    /// Find the directive that silences `finding`, if any.
    ///
    /// Line matches consult the annotation on their own line; block matches
    /// consult every line written for the block itself. Both are silenced
    /// when they fall inside a skipped task.
    pub fn check(&self, finding: &Match) -> Option<Suppression> {
        let inline = if finding.is_block_match() {
            self.block_lines
                .get(&finding.origin_line)
                .map(|lines| lines.as_slice())
                .unwrap_or(std::slice::from_ref(&finding.origin_line))
                .iter()
                .find_map(|line| self.inline_for(*line, &finding.rule_id))
        } else {
            self.inline_for(finding.origin_line, &finding.rule_id)
        };

        inline.or_else(|| self.skip_for(finding.origin_line))
    }

    fn inline_for(&self, line: usize, rule_id: &str) -> Option<Suppression> {
        self.inline
            .get(&line)
            .filter(|s| s.covers(rule_id))
            .cloned()
    }

    fn skip_for(&self, line: usize) -> Option<Suppression> {
        self.skipped
            .iter()
            .find(|(start, end)| line >= *start && line <= *end)
            .map(|(start, _)| Suppression {
                rules: Vec::new(),
                line: *start,
                suppression_type: SuppressionType::SkipTag,
            })
    }
}

/// Separate matches into active and suppressed.
pub fn filter_suppressed(
    matches: Vec<Match>,
    index: &SuppressionIndex,
) -> (Vec<Match>, Vec<SuppressedMatch>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for finding in matches {
        match index.check(&finding) {
            Some(suppression) => suppressed.push(SuppressedMatch {
                finding,
                suppression,
            }),
            None => active.push(finding),
        }
    }

    (active, suppressed)
}
