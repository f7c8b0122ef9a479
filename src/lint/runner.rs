//! Runner that discovers every reachable file and lints each one once.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{LintError, Result};

use super::resolver::normalize_path;
use super::{
    FileError, FileKind, LintFile, LintResult, Match, Resolver, RuleFault, RulesCollection,
    SuppressedMatch, TagFilter,
};

/// Traversal state of one run: the ordered set of visited files and the
/// files still waiting to be visited.
///
/// Files are keyed by path. A path enters the visited set at most once, with
/// the kind it was first reached as, and never leaves it, so the traversal
/// ends even when files refer to each other in a cycle.
#[derive(Debug, Default)]
pub struct Traversal {
    visited: IndexMap<PathBuf, FileKind>,
    frontier: VecDeque<LintFile>,
}

impl Traversal {
    pub fn new<I: IntoIterator<Item = LintFile>>(entries: I) -> Self {
        let mut traversal = Self::default();
        traversal.discover(entries);
        traversal
    }

    /// Queue files that have not been visited yet.
    pub fn discover<I: IntoIterator<Item = LintFile>>(&mut self, files: I) {
        for file in files {
            if !self.visited.contains_key(&file.path) {
                self.frontier.push_back(file);
            }
        }
    }

    /// Next unvisited file, marked visited on the way out.
    pub fn next_file(&mut self) -> Option<LintFile> {
        while let Some(file) = self.frontier.pop_front() {
            if !self.visited.contains_key(&file.path) {
                self.visited.insert(file.path.clone(), file.kind);
                return Some(file);
            }
        }
        None
    }

    pub fn is_visited(&self, path: &Path) -> bool {
        self.visited.contains_key(path)
    }

    /// Visited files in the order they were first reached.
    pub fn visited(&self) -> impl Iterator<Item = LintFile> + '_ {
        self.visited
            .iter()
            .map(|(path, kind)| LintFile::new(path, *kind))
    }
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Files that were read and linted, in discovery order
    pub files: Vec<LintFile>,
    pub matches: Vec<Match>,
    pub suppressed: Vec<SuppressedMatch>,
    pub faults: Vec<RuleFault>,
    /// Files that were referenced but could not be read
    pub file_errors: Vec<FileError>,
    /// Files whose structure could not be parsed; only line rules ran there
    pub parse_errors: Vec<FileError>,
}

impl RunReport {
    fn absorb(&mut self, file: &LintFile, result: LintResult) {
        self.matches.extend(result.matches);
        self.suppressed.extend(result.suppressed);
        self.faults.extend(result.faults);
        if let Some(message) = result.parse_error {
            self.parse_errors.push(FileError {
                file: file.display_path(),
                message,
            });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Lints a set of entry files together with every file they reach.
pub struct Runner {
    rules: RulesCollection,
    resolver: Resolver,
    tags: Vec<String>,
    skip_tags: Vec<String>,
    exclude: GlobSet,
    parallel: bool,
}

impl Runner {
    pub fn new(rules: RulesCollection) -> Self {
        Self {
            rules,
            resolver: Resolver::new(),
            tags: Vec::new(),
            skip_tags: Vec::new(),
            exclude: GlobSet::empty(),
            parallel: false,
        }
    }

    /// Only run rules carrying one of these tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Never run rules carrying one of these tags or ids.
    pub fn skip_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Leave out files matching any of these globs, or living under a
    /// directory that does.
    pub fn exclude_paths<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| LintError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        self.exclude = builder.build().map_err(|source| LintError::InvalidPattern {
            pattern: "<exclude set>".to_string(),
            source,
        })?;
        Ok(self)
    }

    /// Lint files on the rayon pool. Output order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn rules(&self) -> &RulesCollection {
        &self.rules
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.exclude.is_match(p))
    }

    /// Lint `entries` and everything reachable from them.
    ///
    /// Each reachable path is linted exactly once, as the kind it was first
    /// reached as. Files that cannot be read are reported in
    /// [`RunReport::file_errors`] and the run carries on.
    pub fn run(&self, entries: &[LintFile]) -> RunReport {
        let mut traversal = Traversal::new(
            entries
                .iter()
                .map(|f| LintFile::new(normalize_path(&f.path), f.kind)),
        );
        let mut report = RunReport::default();
        let mut loaded = Vec::new();

        while let Some(file) = traversal.next_file() {
            if self.is_excluded(&file.path) {
                log::debug!("{}: excluded", file.display_path());
                continue;
            }

            let text = match std::fs::read_to_string(&file.path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("{}: cannot read file: {}", file.display_path(), e);
                    report.file_errors.push(FileError {
                        file: file.display_path(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let refs = self.resolver.resolve_text(&file, &text);
            log::debug!(
                "{} ({}): {} reference(s)",
                file.display_path(),
                file.kind,
                refs.len()
            );
            traversal.discover(refs);
            loaded.push((file, text));
        }

        let filter = TagFilter::new(self.tags.iter().cloned(), self.skip_tags.iter().cloned());
        let results: Vec<LintResult> = if self.parallel {
            loaded
                .par_iter()
                .map(|(file, text)| self.rules.run_text(file, text, &filter))
                .collect()
        } else {
            loaded
                .iter()
                .map(|(file, text)| self.rules.run_text(file, text, &filter))
                .collect()
        };

        for ((file, _), result) in loaded.iter().zip(results) {
            report.absorb(file, result);
        }
        report.files = loaded.into_iter().map(|(file, _)| file).collect();
        report
    }
}
