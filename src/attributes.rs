//! Fold-aware attribute normalization for one `<img>`.
//!
//! Rules run in a fixed order and the first three can end processing of the
//! image early:
//!
//! 1. missing `src`: `warn` issue, skip the image
//! 2. missing `alt`: `a11y` issue, repaired with `alt=""`
//! 3. `data:` source: nothing more to do
//! 4. loading/priority (see [`loading_action`])
//! 5. `decoding="async"`
//! 6. non-local source: nothing more to do

use crate::context::{IssueKind, RunContext};
use crate::html::ImgElement;
use crate::resource::is_local;

/// What to do with the `loading` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingAction {
    Remove,
    SetLazy,
    Keep,
    /// Unknown value: reported, left as is.
    Invalid,
}

/// Decide the `loading` attribute from the fold position and current value.
///
/// Above the fold the image must load eagerly, so any `loading` goes.
/// Below the fold lazy is the target, and an explicit `eager` is redundant.
pub fn loading_action(above_fold: bool, current: Option<&str>) -> LoadingAction {
    if above_fold {
        return LoadingAction::Remove;
    }
    match current {
        None => LoadingAction::SetLazy,
        Some("eager") => LoadingAction::Remove,
        Some("lazy") => LoadingAction::Keep,
        Some(_) => LoadingAction::Invalid,
    }
}

/// Where normalization left the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// No usable `src`.
    Skipped,
    /// Already an inline data URI.
    Inline,
    /// Not a file of this site.
    Remote,
    /// Local reference, ready for the codec stages.
    Local(String),
}

pub fn normalize(
    img: &mut ImgElement,
    above_fold: bool,
    file: &str,
    ctx: &mut RunContext,
) -> Normalized {
    let src = match img.get("src") {
        Some(src) if !src.is_empty() => src.to_string(),
        _ => {
            ctx.report_issue(
                file,
                IssueKind::Warn,
                "Missing [src] on img - processing skipped.",
            );
            return Normalized::Skipped;
        }
    };

    if !img.has("alt") {
        ctx.report_issue(
            file,
            IssueKind::A11y,
            format!("Missing [alt] on img src=\"{}\" - Adding alt=\"\" meanwhile.", src),
        );
        img.set("alt", "");
    }

    if src.starts_with("data:") {
        return Normalized::Inline;
    }

    let loading = img.get("loading").map(str::to_string);
    match loading_action(above_fold, loading.as_deref()) {
        LoadingAction::Remove => img.remove("loading"),
        LoadingAction::SetLazy => img.set("loading", "lazy"),
        LoadingAction::Keep => {}
        LoadingAction::Invalid => ctx.report_issue(
            file,
            IssueKind::Invalid,
            format!(
                "Invalid [loading]=\"{}\" on img src=\"{}\"",
                loading.unwrap_or_default(),
                src
            ),
        ),
    }
    if above_fold {
        img.set("fetchpriority", "high");
    }

    img.set("decoding", "async");

    if !is_local(&src) {
        return Normalized::Remote;
    }
    Normalized::Local(src)
}
