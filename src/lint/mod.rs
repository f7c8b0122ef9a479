//! The lint engine: rules, structural parsing, suppression and traversal.

mod registry;
mod resolver;
mod rule;
mod runner;
mod suppress;
pub mod tasks;
mod types;

pub use registry::RulesCollection;
pub use resolver::{normalize_path, Resolver};
pub use rule::{match_blocks, match_lines, match_text, Rule, RuleMeta};
pub use runner::{RunReport, Runner, Traversal};
pub use suppress::{
    filter_suppressed, parse_noqa, SuppressedMatch, Suppression, SuppressionIndex,
    SuppressionType, TagFilter, SKIP_TAG,
};
pub use tasks::{flatten, TaskBlock, TaskDocument, TaskSection};
pub use types::{
    FileError, FileKind, LintFile, LintResult, Match, MatchOutcome, RuleFault, Severity,
    BLOCK_LINE,
};
