use crate::lint::{LintFile, MatchOutcome, Rule, RuleMeta, Severity};

/// Flags lines ending in whitespace. Carriage returns are ignored so CRLF
/// files are not flagged on every line.
pub struct TrailingWhitespaceRule {
    meta: RuleMeta,
}

impl TrailingWhitespaceRule {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "201",
                "Trailing whitespace",
                "There should not be any trailing whitespace",
            )
            .with_severity(Severity::Info)
            .with_tags(["formatting", "ANSIBLE0002"]),
        }
    }
}

impl Default for TrailingWhitespaceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for TrailingWhitespaceRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_line(&self, _file: &LintFile, line: &str) -> MatchOutcome {
        let line = line.replace('\r', "");
        (line.trim_end() != line).into()
    }
}
