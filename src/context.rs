//! Run-scoped state shared by every stage of the per-image pipeline.
//!
//! A single [`RunContext`] is created when a run starts and threaded by
//! `&mut` through every operation. It owns the two deduplication sets that
//! make repeated references to one physical image cheap and consistent:
//!
//! - **compressed**: absolute source paths that already went through their
//!   one canonical (base-size) compression. The first HTML file to reference
//!   an image decides its codec for the whole run, and later references
//!   reuse the extension that decision appended to `src`.
//! - **generated**: absolute output paths that were already produced (the
//!   canonical output or any srcset step). Each is written at most once.
//!
//! It also collects the per-file issue log and the summary ledger that the
//! [`output`](crate::output) module renders at the end of a run.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Category of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    /// Image skipped because it can't be processed at all (missing `src`).
    Warn,
    /// Accessibility problem that was auto-repaired (missing `alt`).
    A11y,
    /// Attribute value the pipeline doesn't understand, left as-is.
    Invalid,
    /// Processing of the image failed part-way.
    Erro,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::A11y => "a11y",
            Self::Invalid => "invalid",
            Self::Erro => "erro",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

/// One size delta in the summary ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    /// e.g. `"png->webp"` or `"webp->embed"`
    pub action: String,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// Aggregated summary for one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionTotals {
    pub count: usize,
    pub original_size: u64,
    pub compressed_size: u64,
}

#[derive(Debug, Default)]
pub struct RunContext {
    /// Source path → extension appended to `src` by its accepted variant.
    compressed: HashMap<PathBuf, Option<String>>,
    generated: HashSet<PathBuf>,
    issues: BTreeMap<String, Vec<Issue>>,
    summary: Vec<SummaryEntry>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the canonical compression of `source`.
    ///
    /// Returns `true` the first time a path is seen during the run and
    /// `false` afterwards.
    pub fn claim_compression(&mut self, source: &Path) -> bool {
        if self.compressed.contains_key(source) {
            return false;
        }
        self.compressed.insert(source.to_path_buf(), None);
        true
    }

    pub fn is_compressed(&self, source: &Path) -> bool {
        self.compressed.contains_key(source)
    }

    /// Remember that the canonical variant of `source` was adopted, and what
    /// it appended to `src` (`""` when the source was overwritten in place).
    pub fn adopt_compression(&mut self, source: &Path, suffix: &str) {
        self.compressed
            .insert(source.to_path_buf(), Some(suffix.to_string()));
    }

    /// Suffix of the adopted canonical variant, if one was adopted.
    pub fn adopted_suffix(&self, source: &Path) -> Option<&str> {
        self.compressed.get(source)?.as_deref()
    }

    /// Claim generation of an output file. Returns `false` if it was already produced.
    pub fn claim_output(&mut self, output: &Path) -> bool {
        self.generated.insert(output.to_path_buf())
    }

    pub fn is_generated(&self, output: &Path) -> bool {
        self.generated.contains(output)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.len()
    }

    pub fn report_issue(&mut self, file: &str, kind: IssueKind, message: impl Into<String>) {
        self.issues.entry(file.to_string()).or_default().push(Issue {
            kind,
            message: message.into(),
        });
    }

    pub fn report_summary(&mut self, action: impl Into<String>, original_size: u64, compressed_size: u64) {
        self.summary.push(SummaryEntry {
            action: action.into(),
            original_size,
            compressed_size,
        });
    }

    /// Issues reported for a single HTML file, in report order.
    pub fn issues_for(&self, file: &str) -> &[Issue] {
        self.issues.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All issues, grouped by HTML file (sorted by file path).
    pub fn issues(&self) -> &BTreeMap<String, Vec<Issue>> {
        &self.issues
    }

    pub fn issue_count(&self) -> usize {
        self.issues.values().map(Vec::len).sum()
    }

    pub fn summary(&self) -> &[SummaryEntry] {
        &self.summary
    }

    /// Summary entries folded per action, sorted by action name.
    pub fn summary_by_action(&self) -> BTreeMap<&str, ActionTotals> {
        let mut totals: BTreeMap<&str, ActionTotals> = BTreeMap::new();
        for entry in &self.summary {
            let t = totals.entry(entry.action.as_str()).or_default();
            t.count += 1;
            t.original_size += entry.original_size;
            t.compressed_size += entry.compressed_size;
        }
        totals
    }
}
