//! The collection of rules applied to each file.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};

use crate::error::{LintError, Result};

use super::rule::{match_blocks, match_lines};
use super::{
    filter_suppressed, LintFile, LintResult, Rule, RuleFault, SuppressionIndex, TagFilter,
    TaskDocument,
};

/// An ordered set of rules. Registration order decides output order and
/// nothing else.
#[derive(Default)]
pub struct RulesCollection {
    rules: Vec<Box<dyn Rule>>,
}

impl RulesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Ids are not deduplicated; see [`RulesCollection::validate`].
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Ids registered more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order = Vec::new();
        for rule in &self.rules {
            let id = rule.meta().id.as_str();
            let count = counts.entry(id).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(id.to_string());
            }
        }
        order
    }

    /// Fail on ambiguous ids, since `noqa` annotations refer to rules by id.
    pub fn validate(&self) -> Result<()> {
        match self.duplicate_ids().into_iter().next() {
            Some(id) => Err(LintError::DuplicateRuleId(id)),
            None => Ok(()),
        }
    }

    /// Read `file` and run every rule that passes `filter` against it.
    pub fn run_file(&self, file: &LintFile, filter: &TagFilter) -> Result<LintResult> {
        let text = std::fs::read_to_string(&file.path).map_err(|source| LintError::FileRead {
            path: file.path.clone(),
            source,
        })?;
        Ok(self.run_text(file, &text, filter))
    }

    /// Run every rule that passes `filter` against already loaded text.
    ///
    /// Line matches of a rule precede its block matches; rules contribute in
    /// registration order. A rule that panics contributes nothing for this
    /// file and is reported as a fault.
    pub fn run_text(&self, file: &LintFile, text: &str, filter: &TagFilter) -> LintResult {
        let mut result = LintResult::new();

        let document = match TaskDocument::parse(text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::debug!("{}: block rules skipped: {}", file.display_path(), e);
                result.parse_error = Some(e.to_string());
                None
            }
        };
        let index = SuppressionIndex::build(text, document.as_ref());

        for rule in self.iter().filter(|r| filter.allows(r.meta())) {
            let found = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut found = match_lines(rule, file, text);
                found.extend(match_blocks(rule, file, document.as_ref()));
                found
            }));

            match found {
                Ok(found) => {
                    let (active, suppressed) = filter_suppressed(found, &index);
                    result.matches.extend(active);
                    result.suppressed.extend(suppressed);
                }
                Err(payload) => {
                    let fault = RuleFault {
                        rule_id: rule.meta().id.clone(),
                        file: file.display_path(),
                        message: panic_message(payload.as_ref()),
                    };
                    log::warn!("{}", fault);
                    result.faults.push(fault);
                }
            }
        }

        result
    }

    /// Each tag with the ids of the rules carrying it, sorted by tag.
    pub fn list_tags(&self) -> String {
        let mut tags: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for rule in &self.rules {
            let meta = rule.meta();
            for tag in &meta.tags {
                tags.entry(tag.as_str())
                    .or_default()
                    .push(format!("[{}]", meta.id));
            }
        }
        tags.into_iter()
            .map(|(tag, ids)| format!("{} {}", tag, ids.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for RulesCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut metas: Vec<_> = self.rules.iter().map(|r| r.meta()).collect();
        metas.sort_by(|a, b| a.id.cmp(&b.id));
        let listing: Vec<String> = metas.iter().map(|m| m.verbose()).collect();
        write!(f, "{}", listing.join("\n"))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}
