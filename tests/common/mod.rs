//! Shared fixtures for integration tests: a small catalog of Ansible rules
//! and helpers that lay out playbooks and roles in a temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use playlint::lint::{FileKind, LintFile, RunReport, Runner};
use playlint::{default_rules, MatchOutcome, Rule, RuleMeta, RulesCollection, Severity, TaskBlock};
use regex::Regex;
use serde_yaml::Value;
use tempfile::TempDir;

lazy_static! {
    static ref UNSPACED_VARIABLE: Regex = Regex::new(r"\{\{\S|\S\}\}").unwrap();
}

/// Module name and free-form arguments of a task, from either
/// `action: module args` or a `command`/`shell` key.
fn module_call(block: &TaskBlock) -> Option<(String, String)> {
    if let Some(action) = block.get_str("action") {
        let mut parts = action.splitn(2, char::is_whitespace);
        let module = parts.next()?.to_string();
        return Some((module, parts.next().unwrap_or("").to_string()));
    }
    ["command", "shell"].iter().find_map(|module| match block.get(module) {
        Some(Value::String(args)) => Some((module.to_string(), args.clone())),
        _ => None,
    })
}

/// First word of a command line that is not a `key=value` option.
fn executable(args: &str) -> Option<&str> {
    args.split_whitespace().find(|word| !word.contains('='))
}

macro_rules! meta_rule {
    ($name:ident) => {
        pub struct $name {
            meta: RuleMeta,
        }
    };
}

meta_rule!(GitHasVersionRule);
meta_rule!(MercurialHasRevisionRule);
meta_rule!(BecomeUserWithoutBecomeRule);
meta_rule!(VariableHasSpacesRule);
meta_rule!(CommandsInsteadOfArgumentsRule);
meta_rule!(CommandsInsteadOfModulesRule);
meta_rule!(MetaMainHasInfoRule);
meta_rule!(MetaChangeFromDefaultRule);
meta_rule!(UsingImportTasksRule);

impl Rule for GitHasVersionRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        match module_call(block) {
            Some((module, args)) => (module == "git" && !args.contains("version=")).into(),
            None => MatchOutcome::NotMatched,
        }
    }
}

impl Rule for MercurialHasRevisionRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        match module_call(block) {
            Some((module, args)) => (module == "hg" && !args.contains("revision=")).into(),
            None => MatchOutcome::NotMatched,
        }
    }
}

impl Rule for BecomeUserWithoutBecomeRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        (block.contains_key("become_user") && !block.contains_key("become")).into()
    }
}

impl Rule for VariableHasSpacesRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_line(&self, _file: &LintFile, line: &str) -> MatchOutcome {
        UNSPACED_VARIABLE.is_match(line).into()
    }
}

impl Rule for CommandsInsteadOfArgumentsRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        let Some((module, args)) = module_call(block) else {
            return MatchOutcome::NotMatched;
        };
        if module != "command" || args.contains("warn=no") {
            return MatchOutcome::NotMatched;
        }
        match executable(&args) {
            Some(exe @ ("chmod" | "chown" | "chgrp" | "ln" | "mkdir" | "rm" | "touch")) => {
                MatchOutcome::with_message(format!("{} used in place of argument state to file module", exe))
            }
            _ => MatchOutcome::NotMatched,
        }
    }
}

impl Rule for CommandsInsteadOfModulesRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        let Some((module, args)) = module_call(block) else {
            return MatchOutcome::NotMatched;
        };
        if module != "command" && module != "shell" {
            return MatchOutcome::NotMatched;
        }
        match executable(&args) {
            Some(exe @ ("git" | "hg" | "curl" | "wget" | "svn" | "service" | "tar" | "unzip")) => {
                MatchOutcome::with_message(format!("{} used in place of {} module", exe, exe))
            }
            _ => MatchOutcome::NotMatched,
        }
    }
}

impl Rule for MetaMainHasInfoRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        if file.kind != FileKind::Meta {
            return MatchOutcome::NotMatched;
        }
        match block.get("galaxy_info") {
            Some(Value::Mapping(info)) => {
                let missing: Vec<&str> = ["author", "description", "license", "min_ansible_version", "platforms"]
                    .into_iter()
                    .filter(|key| !info.contains_key(*key))
                    .collect();
                if missing.is_empty() {
                    MatchOutcome::NotMatched
                } else {
                    MatchOutcome::with_message(format!("Role info should contain {}", missing.join(", ")))
                }
            }
            _ => MatchOutcome::NotMatched,
        }
    }
}

impl Rule for MetaChangeFromDefaultRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_line(&self, file: &LintFile, line: &str) -> MatchOutcome {
        (file.kind == FileKind::Meta && line.trim_start().starts_with("author: your name")).into()
    }
}

impl Rule for UsingImportTasksRule {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn match_block(&self, _file: &LintFile, block: &TaskBlock) -> MatchOutcome {
        block.contains_key("import_tasks").into()
    }
}

fn meta(id: &str, short: &str, tags: &[&str]) -> RuleMeta {
    RuleMeta::new(id, short, "").with_tags(tags.iter().copied())
}

/// The built-in rules followed by the fixture catalog.
pub fn fixture_rules() -> RulesCollection {
    let mut rules = default_rules(120);
    rules.register(Box::new(VariableHasSpacesRule {
        meta: meta("206", "Variables should have spaces before and after: {{ var_name }}", &["formatting"])
            .with_severity(Severity::Low),
    }));
    rules.register(Box::new(CommandsInsteadOfArgumentsRule {
        meta: meta("302", "Using command rather than an argument to e.g. file", &["command-shell", "resources"])
            .with_severity(Severity::VeryHigh),
    }));
    rules.register(Box::new(CommandsInsteadOfModulesRule {
        meta: meta("303", "Using command rather than module", &["command-shell", "resources"])
            .with_severity(Severity::High),
    }));
    rules.register(Box::new(GitHasVersionRule {
        meta: meta("401", "Git checkouts must contain explicit version", &["module", "repeatability"])
            .with_severity(Severity::Medium),
    }));
    rules.register(Box::new(MercurialHasRevisionRule {
        meta: meta("402", "Mercurial checkouts must contain explicit revision", &["module", "repeatability"])
            .with_severity(Severity::Medium),
    }));
    rules.register(Box::new(BecomeUserWithoutBecomeRule {
        meta: meta("501", "become_user requires become to work as expected", &["task", "unpredictability"])
            .with_severity(Severity::VeryHigh),
    }));
    rules.register(Box::new(MetaMainHasInfoRule {
        meta: meta("701", "meta/main.yml should contain relevant info", &["metadata"]),
    }));
    rules.register(Box::new(MetaChangeFromDefaultRule {
        meta: meta("703", "meta/main.yml default values should be changed", &["metadata"]),
    }));
    rules.register(Box::new(UsingImportTasksRule {
        meta: meta("I101", "Static import of a task file", &["idiom"]),
    }));
    rules
}

/// A throwaway project directory.
pub struct Project {
    temp: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Path of `file` relative to the project, with `/` separators.
    pub fn relative(&self, file: &str) -> String {
        Path::new(file)
            .strip_prefix(self.root())
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Lint `text` as the only playbook of a fresh project.
pub fn run_playbook(text: &str) -> RunReport {
    let project = Project::new();
    let path = project.write("playbook.yml", text);
    Runner::new(fixture_rules()).run(&[LintFile::playbook(path)])
}

/// Lint `text` as `tasks/main.yml` of a role.
pub fn run_role_tasks_main(text: &str) -> RunReport {
    let project = Project::new();
    let path = project.write("roles/test-role/tasks/main.yml", text);
    Runner::new(fixture_rules()).run(&[LintFile::new(path, FileKind::Tasks)])
}

/// Lint `text` as `meta/main.yml` of a role.
pub fn run_role_meta_main(text: &str) -> RunReport {
    let project = Project::new();
    let path = project.write("roles/test-role/meta/main.yml", text);
    Runner::new(fixture_rules()).run(&[LintFile::new(path, FileKind::Meta)])
}
