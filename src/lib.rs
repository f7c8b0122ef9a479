//! playlint - a rule-based linter for Ansible playbooks.
//!
//! A run starts from one or more playbooks, follows every include, import
//! and role reference to the files they reach, and lints each reachable
//! file exactly once.
//!
//! # Architecture
//!
//! - `lint`: the engine (rule contract, task flattening, suppression,
//!   rule registry, reference resolution, traversal)
//! - `rules`: built-in rules
//! - `config`: YAML run configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Writing a Rule
//!
//! Implement [`Rule`] with either or both of `match_line` and `match_block`,
//! then register it in a [`RulesCollection`].

pub mod cli;
pub mod config;
pub mod error;
pub mod lint;
pub mod report;
pub mod rules;

pub use config::LintConfig;
pub use error::{LintError, Result};
pub use lint::{
    FileKind, LintFile, Match, MatchOutcome, Rule, RuleMeta, RulesCollection, RunReport, Runner,
    Severity, TaskBlock,
};
pub use rules::default_rules;
