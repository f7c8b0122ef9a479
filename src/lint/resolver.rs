//! Discovery of the files a file refers to.
//!
//! References come from include/import directives and from role usage,
//! which expands to the role's conventional `tasks`, `handlers` and `meta`
//! entry files. Content that does not parse is a dead end, not an error.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexSet;
use serde_yaml::Value;

use crate::error::{LintError, Result};

use super::tasks::{flatten, PLAY_SECTIONS};
use super::{FileKind, LintFile, TaskBlock, TaskDocument};

/// Task keys that pull in another task file.
const INCLUDE_KEYS: &[&str] = &["include", "include_tasks", "import_tasks"];

/// Task keys that pull in a role.
const ROLE_KEYS: &[&str] = &["include_role", "import_role"];

/// Play keys that pull in another playbook.
const PLAYBOOK_KEYS: &[&str] = &["import_playbook", "include"];

/// Entry files of a role, relative to the role directory.
const ROLE_ENTRY_DIRS: &[(&str, FileKind)] = &[
    ("tasks", FileKind::Tasks),
    ("handlers", FileKind::Handlers),
    ("meta", FileKind::Meta),
];

/// Computes the files directly referenced by a file.
#[derive(Debug, Clone, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Files directly referenced by `file`. Fails only when the file cannot
    /// be read.
    pub fn resolve(&self, file: &LintFile) -> Result<Vec<LintFile>> {
        let text = std::fs::read_to_string(&file.path).map_err(|source| LintError::FileRead {
            path: file.path.clone(),
            source,
        })?;
        Ok(self.resolve_text(file, &text))
    }

    /// Files referenced by already loaded content of `file`.
    pub fn resolve_text(&self, file: &LintFile, text: &str) -> Vec<LintFile> {
        let document = match TaskDocument::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                log::debug!("{}: not following references: {}", file.display_path(), e);
                return Vec::new();
            }
        };

        let mut found = IndexSet::new();
        match file.kind {
            FileKind::Playbook => {
                for play in &document.blocks {
                    self.play_refs(file, play, &mut found);
                }
            }
            FileKind::Tasks | FileKind::Handlers => {
                for task in document.flatten() {
                    self.task_refs(file, task, file.kind, &mut found);
                }
            }
            FileKind::Meta => {
                for block in &document.blocks {
                    self.meta_refs(file, block, &mut found);
                }
            }
        }
        found.into_iter().collect()
    }

    fn play_refs(&self, file: &LintFile, play: &TaskBlock, found: &mut IndexSet<LintFile>) {
        for key in PLAYBOOK_KEYS {
            if let Some(target) = play.get_str(key).and_then(include_target) {
                found.insert(LintFile::playbook(self.include_path(file, target)));
            }
        }

        if let Some(Value::Sequence(roles)) = play.get("roles") {
            for role in roles {
                if let Some(name) = role_name(role) {
                    self.role_refs(file, name, None, found);
                }
            }
        }

        for section in play.sections.iter().filter(|s| PLAY_SECTIONS.contains(&s.key.as_str())) {
            let kind = if section.key == "handlers" {
                FileKind::Handlers
            } else {
                FileKind::Tasks
            };
            for task in flatten(&section.tasks) {
                self.task_refs(file, task, kind, found);
            }
        }
    }

    fn task_refs(
        &self,
        file: &LintFile,
        task: &TaskBlock,
        kind: FileKind,
        found: &mut IndexSet<LintFile>,
    ) {
        for key in INCLUDE_KEYS {
            let target = match task.get(key) {
                Some(Value::String(s)) => include_target(s),
                Some(Value::Mapping(args)) => args.get("file").and_then(Value::as_str).and_then(include_target),
                _ => None,
            };
            if let Some(target) = target {
                found.insert(LintFile::new(self.include_path(file, target), kind));
            }
        }

        for key in ROLE_KEYS {
            if let Some(Value::Mapping(args)) = task.get(key) {
                let tasks_from = args.get("tasks_from").and_then(Value::as_str);
                if let Some(name) = args.get("name").and_then(Value::as_str) {
                    self.role_refs(file, name, tasks_from, found);
                }
            }
        }
    }

    fn meta_refs(&self, file: &LintFile, meta: &TaskBlock, found: &mut IndexSet<LintFile>) {
        if let Some(Value::Sequence(deps)) = meta.get("dependencies") {
            for dep in deps {
                if let Some(name) = role_name(dep) {
                    self.role_refs(file, name, None, found);
                }
            }
        }
    }

    /// Expand a role reference into the role's existing entry files.
    fn role_refs(
        &self,
        file: &LintFile,
        name: &str,
        tasks_from: Option<&str>,
        found: &mut IndexSet<LintFile>,
    ) {
        if is_templated(name) {
            log::debug!("{}: skipping templated role {:?}", file.display_path(), name);
            return;
        }
        let Some(role_dir) = self.find_role(file, name) else {
            log::debug!("{}: role {:?} not found", file.display_path(), name);
            return;
        };

        for (dir, kind) in ROLE_ENTRY_DIRS {
            let entry = match (kind, tasks_from) {
                (FileKind::Tasks, Some(from)) => task_file_name(from),
                _ => "main.yml".to_string(),
            };
            let candidates = [
                role_dir.join(dir).join(&entry),
                role_dir.join(dir).join(entry.replace(".yml", ".yaml")),
            ];
            if let Some(path) = candidates.iter().find(|p| p.is_file()) {
                found.insert(LintFile::new(normalize_path(path), *kind));
            }
        }
    }

    /// Role directory for `name`: a sibling of the role `file` belongs to,
    /// then `roles/<name>` next to `file`, then `<name>` next to `file`.
    fn find_role(&self, file: &LintFile, name: &str) -> Option<PathBuf> {
        let base = parent_dir(&file.path);
        let mut candidates = Vec::new();
        if let Some(roles_dir) = role_root(file).as_deref().and_then(Path::parent) {
            candidates.push(roles_dir.join(name));
        }
        candidates.push(base.join("roles").join(name));
        candidates.push(base.join(name));

        candidates
            .into_iter()
            .find(|dir| dir.is_dir())
            .map(|dir| normalize_path(&dir))
    }

    /// Path of an included file: relative to the including file, falling
    /// back to the role's `tasks` directory for files inside a role.
    fn include_path(&self, file: &LintFile, target: &str) -> PathBuf {
        let primary = parent_dir(&file.path).join(target);
        if !primary.is_file() {
            if let Some(root) = role_root(file) {
                let in_role = root.join("tasks").join(target);
                if in_role.is_file() {
                    return normalize_path(&in_role);
                }
            }
        }
        normalize_path(&primary)
    }
}

/// File named by an include value; `include: file.yml var=x` names `file.yml`.
fn include_target(value: &str) -> Option<&str> {
    if is_templated(value) {
        log::debug!("skipping templated include {:?}", value);
        return None;
    }
    value.split_whitespace().next()
}

fn role_name(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(name) => Some(name.as_str()),
        Value::Mapping(m) => m
            .get("role")
            .or_else(|| m.get("name"))
            .and_then(Value::as_str),
        _ => None,
    }
}

fn task_file_name(from: &str) -> String {
    if from.ends_with(".yml") || from.ends_with(".yaml") {
        from.to_string()
    } else {
        format!("{}.yml", from)
    }
}

fn is_templated(value: &str) -> bool {
    value.contains("{{")
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Directory of the role a tasks, handlers or meta file lives in.
fn role_root(file: &LintFile) -> Option<PathBuf> {
    if file.kind == FileKind::Playbook {
        return None;
    }
    let dir = file.path.parent()?;
    let dir_name = dir.file_name()?.to_str()?;
    ROLE_ENTRY_DIRS
        .iter()
        .any(|(name, _)| *name == dir_name)
        .then(|| dir.parent().map(Path::to_path_buf))
        .flatten()
}

/// Lexically normalize a path so one file reached through different
/// relative spellings is visited once.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
