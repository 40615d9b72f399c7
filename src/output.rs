//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress
//!
//! ```text
//! ▶ index.html (3 images)
//!     ✓
//! ▶ blog/post.html (1 image)
//!     ✗ 2 issues
//! ```
//!
//! ## Issues
//!
//! ```text
//! Issues
//! blog/post.html
//!     [a11y] Missing [alt] on img src="cat.jpg" - Adding alt="" meanwhile.
//!     [invalid] Invalid [loading]="soon" on img src="cat.jpg"
//! ```
//!
//! ## Summary
//!
//! ```text
//! Summary
//!     jpg->webp: 4 files, 1.2 MB → 310.4 KB (-75.3%)
//!     webp->embed: 1 file, 2.0 KB → 812 B (-60.4%)
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::context::{ActionTotals, RunContext};
use crate::process::RunEvent;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Signed size change in percent, one decimal.
pub fn format_delta(original: u64, compressed: u64) -> String {
    if original == 0 {
        return "n/a".to_string();
    }
    let delta = (compressed as f64 - original as f64) / original as f64 * 100.0;
    format!("{:+.1}%", delta)
}

// ============================================================================
// Progress
// ============================================================================

pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::FileStarted { file, image_count } => {
            vec![format!("▶ {} ({})", file, plural(*image_count, "image"))]
        }
        RunEvent::FileFinished { issues: 0, .. } => vec![format!("{}✓", indent(1))],
        RunEvent::FileFinished { issues, .. } => {
            vec![format!("{}✗ {}", indent(1), plural(*issues, "issue"))]
        }
    }
}

// ============================================================================
// End-of-run report
// ============================================================================

/// Issues grouped per HTML file. Empty when there are none.
pub fn format_issues(ctx: &RunContext) -> Vec<String> {
    if ctx.issue_count() == 0 {
        return Vec::new();
    }
    let mut lines = vec!["Issues".to_string()];
    for (file, issues) in ctx.issues() {
        lines.push(file.clone());
        for issue in issues {
            lines.push(format!("{}[{}] {}", indent(1), issue.kind, issue.message));
        }
    }
    lines
}

fn summary_line(action: &str, totals: &ActionTotals) -> String {
    format!(
        "{}{}: {}, {} → {} ({})",
        indent(1),
        action,
        plural(totals.count, "file"),
        format_bytes(totals.original_size),
        format_bytes(totals.compressed_size),
        format_delta(totals.original_size, totals.compressed_size)
    )
}

/// Size deltas grouped by action.
pub fn format_summary(ctx: &RunContext) -> Vec<String> {
    let totals = ctx.summary_by_action();
    if totals.is_empty() {
        return vec!["Summary".to_string(), format!("{}no images changed", indent(1))];
    }
    let mut lines = vec!["Summary".to_string()];
    lines.extend(
        totals
            .iter()
            .map(|(action, totals)| summary_line(action, totals)),
    );
    lines
}

pub fn print_issues(ctx: &RunContext) {
    for line in format_issues(ctx) {
        println!("{}", line);
    }
}

pub fn print_summary(ctx: &RunContext) {
    for line in format_summary(ctx) {
        println!("{}", line);
    }
}
