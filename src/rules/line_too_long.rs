use crate::lint::{LintFile, MatchOutcome, Rule, RuleMeta, Severity};

/// Flags lines longer than a configured number of characters.
pub struct LineTooLongRule {
    meta: RuleMeta,
    max_length: usize,
}

impl LineTooLongRule {
    pub fn new(max_length: usize) -> Self {
        Self {
            meta: RuleMeta::new(
                "204",
                format!("Lines should be no longer than {} chars", max_length),
                "Long lines make code harder to read and code review more difficult",
            )
            .with_severity(Severity::VeryLow)
            .with_tags(["formatting"]),
            max_length,
        }
    }
}

impl Rule for LineTooLongRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_line(&self, _file: &LintFile, line: &str) -> MatchOutcome {
        (line.chars().count() > self.max_length).into()
    }
}
