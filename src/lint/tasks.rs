//! Structured view of task files.
//!
//! A document is parsed with `serde_yaml` and every task mapping is paired
//! with the source lines it was written on. `serde_yaml` does not expose
//! positions, so a locator walks the raw text in document order and finds
//! each mapping by its first key, bounded by the region its parent occupies.
//!
//! Nested task containers (`block`/`rescue`/`always`, and the task sections
//! of a play) become [`TaskSection`]s, and [`flatten`] turns the resulting
//! tree into the pre-order stream of blocks that rules are run against.

use serde_yaml::{Mapping, Value};

use crate::error::{LintError, Result};

/// Keys holding nested task sequences inside a task, in flattening order.
pub const BLOCK_KEYS: &[&str] = &["block", "rescue", "always"];

/// Task sections of a play, in flattening order.
pub const PLAY_SECTIONS: &[&str] = &["pre_tasks", "tasks", "post_tasks", "handlers"];

/// A nested sequence of tasks under one container key.
#[derive(Debug, Clone)]
pub struct TaskSection {
    pub key: String,
    pub tasks: Vec<TaskBlock>,
}

/// One mapping-structured unit of work and where it sits in the source.
#[derive(Debug, Clone)]
pub struct TaskBlock {
    pub data: Mapping,
    /// 1-based line of the block's first key.
    pub line: usize,
    /// Last line (inclusive) of the block, nested tasks included.
    pub end_line: usize,
    /// Nested task sequences, in flattening order.
    pub sections: Vec<TaskSection>,
}

impl TaskBlock {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// A play rather than a task.
    pub fn is_play(&self) -> bool {
        is_play(&self.data)
    }

    /// Tags attached to the block, from a list or a comma separated string.
    pub fn tags(&self) -> Vec<String> {
        match self.get("tags") {
            Some(Value::Sequence(items)) => items.iter().filter_map(key_text).collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Direct children across all sections, in flattening order.
    pub fn children(&self) -> impl Iterator<Item = &TaskBlock> {
        self.sections.iter().flat_map(|s| s.tasks.iter())
    }

    /// Whether `line` falls inside this block, nested tasks included.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.line && line <= self.end_line
    }

    /// Whether `line` belongs to this block itself rather than to a nested task.
    pub fn owns_line(&self, line: usize) -> bool {
        self.contains_line(line) && !self.children().any(|c| c.contains_line(line))
    }

    /// Lines written for this block itself, excluding nested tasks.
    pub fn own_lines(&self) -> impl Iterator<Item = usize> + '_ {
        (self.line..=self.end_line).filter(move |l| self.owns_line(*l))
    }

    /// Single-line rendering used as the matched text of block matches.
    pub fn summary(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_else(|_| format!("{:?}", self.data))
    }
}

/// A parsed task file, playbook, or single-mapping document.
#[derive(Debug, Clone, Default)]
pub struct TaskDocument {
    pub blocks: Vec<TaskBlock>,
}

impl TaskDocument {
    /// Parse a document whose top level is a sequence of mappings or a single
    /// mapping. Anything else is reported as invalid structure.
    pub fn parse(text: &str) -> Result<Self> {
        if is_blank_document(text) {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(text)?;
        let locator = Locator::new(text);
        let end = locator.lines.len();

        let blocks = match value {
            Value::Null => Vec::new(),
            Value::Mapping(data) => vec![locator.document_mapping(data)],
            Value::Sequence(items) => {
                let mut maps = Vec::with_capacity(items.len());
                for (idx, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Mapping(m) => maps.push(m),
                        other => {
                            return Err(LintError::InvalidStructure(format!(
                                "item {} is {}, expected a mapping",
                                idx + 1,
                                describe(&other)
                            )))
                        }
                    }
                }
                locator.sequence(maps, 0, end, 0)
            }
            other => {
                return Err(LintError::InvalidStructure(format!(
                    "top level is {}, expected a list of tasks or a mapping",
                    describe(&other)
                )))
            }
        };

        Ok(Self { blocks })
    }

    /// Pre-order sequence of every block in the document.
    pub fn flatten(&self) -> Vec<&TaskBlock> {
        flatten(&self.blocks)
    }
}

/// Expand nested containers into a flat, order-preserving sequence.
///
/// Each block is yielded before its children; children follow section
/// order (primary sequence, then rescue, then always). Nothing is
/// deduplicated.
pub fn flatten(blocks: &[TaskBlock]) -> Vec<&TaskBlock> {
    let mut out = Vec::new();
    for block in blocks {
        push_flattened(block, &mut out);
    }
    out
}

fn push_flattened<'a>(block: &'a TaskBlock, out: &mut Vec<&'a TaskBlock>) {
    out.push(block);
    for child in block.children() {
        push_flattened(child, out);
    }
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let t = line.trim();
        t.is_empty() || t.starts_with('#') || t == "---"
    })
}

fn is_play(data: &Mapping) -> bool {
    data.contains_key("hosts") || data.contains_key("import_playbook")
}

/// Flattening position of a container key, if `key` is one.
fn section_rank(key: &str, play: bool) -> Option<usize> {
    if play {
        if let Some(pos) = PLAY_SECTIONS.iter().position(|k| *k == key) {
            return Some(pos);
        }
    }
    BLOCK_KEYS
        .iter()
        .position(|k| *k == key)
        .map(|pos| pos + PLAY_SECTIONS.len())
}

/// Text of a scalar mapping key.
pub(crate) fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_key(data: &Mapping) -> Option<String> {
    data.keys().next().and_then(key_text)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "empty",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// A source line that opens a mapping key.
#[derive(Debug, PartialEq, Eq)]
struct KeyLine<'a> {
    /// Column of the `-` when the key opens a sequence item.
    dash: Option<usize>,
    /// Column of the key itself.
    indent: usize,
    key: &'a str,
}

fn parse_key_line(line: &str) -> Option<KeyLine<'_>> {
    let line = line.trim_end_matches('\r');
    let body = line.trim_start_matches(' ');
    let indent = line.len() - body.len();

    let (dash, indent, rest) = match body.strip_prefix("- ") {
        Some(after) => {
            let rest = after.trim_start_matches(' ');
            (Some(indent), indent + 2 + (after.len() - rest.len()), rest)
        }
        None => (None, indent, body),
    };

    if rest.is_empty() || rest.starts_with('#') {
        return None;
    }
    key_token(rest).map(|key| KeyLine { dash, indent, key })
}

fn key_token(rest: &str) -> Option<&str> {
    if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &rest[1..];
        let close = body.find(quote)?;
        return body[close + 1..]
            .trim_start()
            .starts_with(':')
            .then(|| &body[..close]);
    }

    let bytes = rest.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b':' if i + 1 == bytes.len() || matches!(bytes[i + 1], b' ' | b'\t') => {
                let key = rest[..i].trim_end();
                return (!key.is_empty()).then_some(key);
            }
            b'#' if i > 0 && bytes[i - 1] == b' ' => return None,
            _ => {}
        }
    }
    None
}

/// Recovers line positions for parsed mappings by scanning the raw text.
struct Locator<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Locator<'a> {
    fn new(text: &'a str) -> Self {
        let mut lines: Vec<&str> = text.split('\n').collect();
        if lines.len() > 1 && lines.last().map_or(false, |l| l.is_empty()) {
            lines.pop();
        }
        Self { lines }
    }

    fn key_line(&self, idx: usize) -> Option<KeyLine<'a>> {
        self.lines.get(idx).copied().and_then(parse_key_line)
    }

    /// Column of the dash when line `idx` starts a sequence item.
    fn dash_at(&self, idx: usize) -> Option<usize> {
        let line = self.lines.get(idx)?.trim_end_matches('\r');
        let trimmed = line.trim_start();
        if trimmed == "-" || trimmed.starts_with("- ") {
            Some(line.len() - trimmed.len())
        } else {
            None
        }
    }

    /// A document that is one mapping: a single block spanning the file.
    fn document_mapping(&self, data: Mapping) -> TaskBlock {
        let end = self.lines.len();
        let begin = first_key(&data)
            .and_then(|key| {
                (0..end).find(|&i| {
                    self.key_line(i)
                        .map_or(false, |kl| kl.dash.is_none() && kl.indent == 0 && kl.key == key)
                })
            })
            .unwrap_or(0);
        self.block(data, begin, end)
    }

    /// Locate the items of a sequence inside lines `[start, end)`.
    ///
    /// Items with no line of their own in that range, such as entries of a
    /// flow sequence, sit on line `anchor` and span only that line.
    fn sequence(
        &self,
        items: Vec<Mapping>,
        start: usize,
        end: usize,
        anchor: usize,
    ) -> Vec<TaskBlock> {
        let mut starts: Vec<Option<usize>> = Vec::with_capacity(items.len());
        let mut cursor = start;
        let mut dash_col: Option<usize> = None;

        for item in &items {
            let first = first_key(item);
            let by_key = first.as_deref().and_then(|key| {
                (cursor..end).find(|&i| {
                    self.key_line(i).map_or(false, |kl| {
                        kl.key == key
                            && kl.dash.is_some()
                            && dash_col.map_or(true, |col| kl.dash == Some(col))
                    })
                })
            });
            // `- {name: x}` and other items whose first key is not on the dash line
            let found = by_key.or_else(|| {
                (cursor..end).find(|&i| {
                    self.dash_at(i)
                        .map_or(false, |col| dash_col.map_or(true, |c| c == col))
                })
            });

            if let Some(i) = found {
                if dash_col.is_none() {
                    dash_col = self.dash_at(i);
                }
                cursor = i + 1;
            }
            starts.push(found);
        }

        items
            .into_iter()
            .enumerate()
            .map(|(idx, data)| match starts[idx] {
                Some(begin) => {
                    let stop = starts[idx + 1..]
                        .iter()
                        .flatten()
                        .next()
                        .copied()
                        .unwrap_or(end);
                    self.block(data, begin, stop.max(begin + 1))
                }
                None => self.block(data, anchor, anchor + 1),
            })
            .collect()
    }

    /// Build a block occupying lines `[begin, stop)` and locate its sections.
    fn block(&self, data: Mapping, begin: usize, stop: usize) -> TaskBlock {
        let begin = begin.min(self.lines.len().saturating_sub(1));
        let stop = stop.min(self.lines.len()).max(begin + 1);
        let key_indent = self.key_line(begin).map(|kl| kl.indent);
        let play = is_play(&data);

        let mut ranked = Vec::new();
        let mut cursor = begin;
        for (key, value) in data.iter() {
            let Some(key) = key_text(key) else { continue };
            let Some(rank) = section_rank(&key, play) else { continue };
            let Value::Sequence(items) = value else { continue };

            let maps: Vec<Mapping> = items
                .iter()
                .filter_map(|item| item.as_mapping().cloned())
                .collect();

            let key_at = (cursor..stop).find(|&i| {
                self.key_line(i).map_or(false, |kl| {
                    kl.key == key && key_indent.map_or(true, |ind| kl.indent == ind)
                })
            });

            let tasks = match key_at {
                Some(at) => {
                    let region_end = self.region_end(at, key_indent.unwrap_or(0), stop);
                    cursor = region_end.max(at + 1);
                    self.sequence(maps, at + 1, region_end, at)
                }
                None => self.sequence(maps, cursor, stop, begin),
            };
            ranked.push((rank, TaskSection { key, tasks }));
        }
        ranked.sort_by_key(|(rank, _)| *rank);

        TaskBlock {
            data,
            line: begin + 1,
            end_line: stop,
            sections: ranked.into_iter().map(|(_, section)| section).collect(),
        }
    }

    /// First line after `key_at` that leaves the value of a key at `indent`.
    fn region_end(&self, key_at: usize, indent: usize, stop: usize) -> usize {
        for i in key_at + 1..stop {
            let Some(line) = self.lines.get(i) else { break };
            let line = line.trim_end_matches('\r');
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let col = line.len() - trimmed.len();
            if col < indent || (col == indent && !trimmed.starts_with('-')) {
                return i;
            }
        }
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"---
- name: bad git 1  # noqa 401
  action: git a=b c=d
- name: Block with rescue and always section
  block:
    - name: bad git 3
      action: git a=b c=d
    - name: bad git 4
      action: git a=b c=d
  rescue:
    - name: bad git 5
      action: git a=b c=d
  always:
    - name: bad git 7
      action: git a=b c=d
    - name: bad git 8
      action: git a=b c=d
    - name: bad git 9
      action: git a=b c=d
"#;

    fn names<'a>(blocks: &[&'a TaskBlock]) -> Vec<&'a str> {
        blocks.iter().map(|b| b.name().unwrap_or("")).collect()
    }

    #[test]
    fn test_flatten_counts_container_and_children() {
        let doc = TaskDocument::parse(NESTED).unwrap();
        assert_eq!(doc.blocks.len(), 2);

        let container = flatten(&doc.blocks[1..]);
        // the container plus 2 + 1 + 3 children
        assert_eq!(container.len(), 1 + 2 + 1 + 3);
        assert_eq!(
            names(&container),
            vec![
                "Block with rescue and always section",
                "bad git 3",
                "bad git 4",
                "bad git 5",
                "bad git 7",
                "bad git 8",
                "bad git 9",
            ]
        );
    }

    #[test]
    fn test_flatten_orders_sections_canonically() {
        let text = r#"
- name: outer
  always:
    - name: cleanup
  block:
    - name: work
  rescue:
    - name: recover
"#;
        let doc = TaskDocument::parse(text).unwrap();
        assert_eq!(
            names(&doc.flatten()),
            vec!["outer", "work", "recover", "cleanup"]
        );
        let flat = doc.flatten();
        assert_eq!(flat[1].line, 6);
        assert_eq!(flat[2].line, 8);
        assert_eq!(flat[3].line, 4);
    }

    #[test]
    fn test_flatten_does_not_deduplicate() {
        let text = "- debug: msg=hi\n- debug: msg=hi\n";
        let doc = TaskDocument::parse(text).unwrap();
        let flat = doc.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].line, 1);
        assert_eq!(flat[1].line, 2);
    }

    #[test]
    fn test_block_positions() {
        let doc = TaskDocument::parse(NESTED).unwrap();
        let flat = doc.flatten();
        assert_eq!(flat[0].line, 2);
        assert_eq!(flat[0].end_line, 3);
        assert_eq!(flat[1].line, 4);
        assert_eq!(flat[1].end_line, 19);
        // bad git 3
        assert_eq!(flat[2].line, 6);
        // bad git 4 ends right before `rescue:`
        assert_eq!(flat[3].line, 8);
        assert_eq!(flat[3].end_line, 9);
        // bad git 5
        assert_eq!(flat[4].line, 11);
        assert_eq!(flat[4].end_line, 12);
    }

    #[test]
    fn test_own_lines_exclude_nested_tasks() {
        let doc = TaskDocument::parse(NESTED).unwrap();
        let container = &doc.blocks[1];
        let own: Vec<usize> = container.own_lines().collect();
        assert_eq!(own, vec![4, 5, 10, 13]);
        assert!(container.contains_line(7));
        assert!(!container.owns_line(7));
    }

    #[test]
    fn test_play_sections_are_flattened() {
        let text = r#"
- hosts: all
  pre_tasks:
    - name: first
  tasks:
    - name: second
      block:
        - name: third
  handlers:
    - name: restart
"#;
        let doc = TaskDocument::parse(text).unwrap();
        assert!(doc.blocks[0].is_play());
        assert_eq!(
            names(&doc.flatten()),
            vec!["", "first", "second", "third", "restart"]
        );
        let flat = doc.flatten();
        assert_eq!(flat[3].line, 8);
        assert_eq!(flat[4].line, 10);
    }

    #[test]
    fn test_indentless_sequence() {
        let text = "- name: outer\n  block:\n  - name: a\n  - name: b\n  rescue:\n  - name: c\n";
        let doc = TaskDocument::parse(text).unwrap();
        let flat = doc.flatten();
        assert_eq!(names(&flat), vec!["outer", "a", "b", "c"]);
        assert_eq!(flat[2].line, 4);
        assert_eq!(flat[2].end_line, 4);
        assert_eq!(flat[3].line, 6);
    }

    #[test]
    fn test_flow_section_on_last_line() {
        let doc = TaskDocument::parse("- name: outer\n  block: [{name: a, action: git}]\n").unwrap();
        let flat = doc.flatten();
        assert_eq!(names(&flat), vec!["outer", "a"]);
        assert_eq!(flat[1].line, 2);
        assert_eq!(flat[1].end_line, 2);

        let play = TaskDocument::parse("- hosts: all\n  tasks: [{name: clone, action: git}]").unwrap();
        let flat = play.flatten();
        assert_eq!(names(&flat), vec!["", "clone"]);
        assert_eq!(flat[1].line, 2);
    }

    #[test]
    fn test_flow_section_keeps_to_its_key_line() {
        let text = "- name: outer\n  block: [{name: a, action: git}, {name: c}]\n- name: b  # noqa 401\n  action: git\n";
        let doc = TaskDocument::parse(text).unwrap();
        let flat = doc.flatten();
        assert_eq!(names(&flat), vec!["outer", "a", "c", "b"]);
        for child in &flat[1..3] {
            assert_eq!(child.line, 2);
            assert_eq!(child.own_lines().collect::<Vec<_>>(), vec![2]);
        }
        assert_eq!(flat[0].end_line, 2);
        assert_eq!(flat[3].line, 3);
    }

    #[test]
    fn test_flow_items_in_block_sequence() {
        let text = "- {name: a, action: git}\n- {name: b, action: git}\n";
        let doc = TaskDocument::parse(text).unwrap();
        assert_eq!(doc.blocks[0].line, 1);
        assert_eq!(doc.blocks[1].line, 2);
    }

    #[test]
    fn test_section_key_on_last_line() {
        let doc = TaskDocument::parse("- name: outer\n  block:\n").unwrap();
        assert_eq!(doc.flatten().len(), 1);

        let doc = TaskDocument::parse("- name: outer\n  block: []").unwrap();
        assert_eq!(doc.blocks[0].line, 1);
        assert!(doc.blocks[0].children().next().is_none());
    }

    #[test]
    fn test_multiple_documents_are_rejected() {
        let text = "---\n- name: a\n  action: git\n---\n- name: b\n  action: git\n";
        assert!(matches!(TaskDocument::parse(text), Err(LintError::Yaml(_))));
    }

    #[test]
    fn test_single_mapping_document() {
        let text = "---\ngalaxy_info:\n  author: someone\n  license: MIT\n";
        let doc = TaskDocument::parse(text).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].line, 2);
        assert!(doc.blocks[0].owns_line(3));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            TaskDocument::parse("- oops this is invalid\n"),
            Err(LintError::InvalidStructure(_))
        ));
        assert!(matches!(
            TaskDocument::parse("- name: [unclosed\n"),
            Err(LintError::Yaml(_))
        ));
        assert!(matches!(
            TaskDocument::parse("just a string\n"),
            Err(LintError::InvalidStructure(_))
        ));
        assert!(TaskDocument::parse("").unwrap().blocks.is_empty());
    }

    #[test]
    fn test_tags() {
        let doc = TaskDocument::parse(
            "- name: a\n  tags:\n    - one\n    - skip_ansible_lint\n- name: b\n  tags: x, y\n",
        )
        .unwrap();
        assert_eq!(doc.blocks[0].tags(), vec!["one", "skip_ansible_lint"]);
        assert_eq!(doc.blocks[1].tags(), vec!["x", "y"]);
    }

    #[test]
    fn test_parse_key_line() {
        assert_eq!(
            parse_key_line("  - name: x  # noqa"),
            Some(KeyLine {
                dash: Some(2),
                indent: 4,
                key: "name"
            })
        );
        assert_eq!(
            parse_key_line("    block:"),
            Some(KeyLine {
                dash: None,
                indent: 4,
                key: "block"
            })
        );
        assert_eq!(parse_key_line("  \"quoted key\": 1").unwrap().key, "quoted key");
        assert_eq!(parse_key_line("  - plain item"), None);
        assert_eq!(parse_key_line("# comment: here"), None);
        assert_eq!(parse_key_line("url: http://example.com").unwrap().key, "url");
    }
}
