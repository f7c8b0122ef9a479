//! Built-in rules.

mod line_too_long;
mod trailing_whitespace;

pub use line_too_long::LineTooLongRule;
pub use trailing_whitespace::TrailingWhitespaceRule;

use crate::lint::RulesCollection;

/// Longest line accepted by [`LineTooLongRule`] unless configured otherwise.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 120;

/// Every built-in rule, in registration order.
pub fn default_rules(max_line_length: usize) -> RulesCollection {
    let mut rules = RulesCollection::new();
    rules.register(Box::new(TrailingWhitespaceRule::new()));
    rules.register(Box::new(LineTooLongRule::new(max_line_length)));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        let rules = default_rules(DEFAULT_MAX_LINE_LENGTH);
        assert_eq!(rules.len(), 2);
        assert!(rules.validate().is_ok());
        let ids: Vec<&str> = rules.iter().map(|r| r.meta().id.as_str()).collect();
        assert_eq!(ids, vec!["201", "204"]);
    }
}
