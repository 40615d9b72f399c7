//! The per-image pipeline and the run over a site.
//!
//! Every `<img>` of every HTML file goes through the same fixed sequence:
//!
//! ```text
//! normalize attributes → dispatch codec → embed? → resolve size → srcset
//! ```
//!
//! ## Ordering
//!
//! Files are processed one at a time in scan order and images in document
//! order. The order is load-bearing: the first reference to an image decides
//! its canonical compression for the whole run (see [`RunContext`]).
//!
//! ## Failures
//!
//! A failure inside one image is recorded as an `erro` issue for its file and
//! the run moves on to the next image; attribute changes made before the
//! failure are kept. An HTML file that is not valid UTF-8 is reported and
//! left untouched. Failing to read or write an HTML file, or to write a
//! generated image, aborts the run.
//!
//! ## Progress
//!
//! Progress is reported as [`RunEvent`]s over an optional channel so the
//! caller decides how (and whether) to display it.

use crate::attributes::{Normalized, normalize};
use crate::config::{self, CONFIG_FILENAME, ConfigError, ImageConfig};
use crate::context::{IssueKind, RunContext};
use crate::dimensions::resolve_size;
use crate::dispatch::dispatch;
use crate::embed::embed;
use crate::html::{HtmlDocument, HtmlError, ImgElement};
use crate::imaging::{BackendError, EncoderSettings, ImageBackend, RustBackend};
use crate::resource::Resource;
use crate::scan::{self, ScanError};
use crate::srcset::generate_srcset;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("{}: {source}", file.display())]
    Html { file: PathBuf, source: HtmlError },
    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while processing a single image.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error(
        "Can't get image width and height of \"{0}\" - some optimizations are not possible without this information."
    )]
    MetadataUnavailable(String),
    #[error("Can't derive the missing dimension of \"{0}\" from its metadata")]
    UnresolvedSize(String),
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to compress \"{src}\": {source}")]
    Backend { src: String, source: BackendError },
    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    FileStarted { file: String, image_count: usize },
    FileFinished { file: String, issues: usize },
}

/// Switches for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Config file; `<root>/imgpress.toml` when unset.
    pub config: Option<PathBuf>,
    /// Regex of HTML paths (relative to the root) to leave alone.
    pub exclude: Option<String>,
    /// Decide and rewrite attributes, but write nothing to disk.
    pub dry_run: bool,
    /// Merge the fast config overlay.
    pub fast: bool,
}

/// What the pipeline stages know about the HTML file being processed.
pub struct FileScope<'a> {
    pub root: &'a Path,
    /// HTML file, relative to `root`.
    pub file: &'a Path,
    /// `file` as shown in issues and events.
    pub label: String,
    pub config: &'a ImageConfig,
    pub dry_run: bool,
}

impl<'a> FileScope<'a> {
    pub fn new(root: &'a Path, file: &'a Path, config: &'a ImageConfig, dry_run: bool) -> Self {
        Self {
            root,
            file,
            label: file.to_string_lossy().replace('\\', "/"),
            config,
            dry_run,
        }
    }

    pub fn read_error(&self, resource: &Resource, source: io::Error) -> ImageError {
        ImageError::Read {
            path: resource.path().to_path_buf(),
            source,
        }
    }

    /// Write a generated image, unless this is a dry run.
    pub fn write(&self, path: &Path, data: &[u8]) -> Result<(), ImageError> {
        if self.dry_run {
            return Ok(());
        }
        std::fs::write(path, data).map_err(|source| ImageError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Run the whole pipeline on one `<img>`.
pub fn process_image(
    img: &mut ImgElement,
    above_fold: bool,
    scope: &FileScope,
    backend: &impl ImageBackend,
    ctx: &mut RunContext,
) -> Result<(), ImageError> {
    let Normalized::Local(src) = normalize(img, above_fold, &scope.label, ctx) else {
        return Ok(());
    };

    let Some(resource) = Resource::resolve(scope.root, scope.file, &src) else {
        ctx.report_issue(
            &scope.label,
            IssueKind::Erro,
            format!("Can't find img on disk src=\"{}\"", src),
        );
        return Ok(());
    };

    let dispatched = dispatch(img, &resource, above_fold, scope, backend, ctx)?;

    let embedded = match &dispatched.fresh {
        Some(variant) => {
            let original_size = resource.len().map_err(|e| scope.read_error(&resource, e))?;
            embed(img, variant, original_size, scope.config.embed_size, ctx)
        }
        None => false,
    };

    let meta = resource.meta(backend).map_err(|e| scope.read_error(&resource, e))?;
    let svg_source = if resource.is_svg() {
        Some(resource.data().map_err(|e| scope.read_error(&resource, e))?)
    } else {
        None
    };
    let resolved = resolve_size(img, &src, meta, svg_source)?;

    if embedded {
        return Ok(());
    }
    generate_srcset(
        img,
        &resource,
        resolved.size,
        dispatched.progressive,
        scope,
        backend,
        ctx,
    )
}

/// Process every image of one HTML file and write it back.
///
/// `file` is relative to `root`.
pub fn process_file(
    backend: &impl ImageBackend,
    root: &Path,
    file: &Path,
    config: &ImageConfig,
    dry_run: bool,
    ctx: &mut RunContext,
    events: Option<&Sender<RunEvent>>,
) -> Result<(), ProcessError> {
    let path = root.join(file);
    let scope = FileScope::new(root, file, config, dry_run);
    let Ok(source) = String::from_utf8(std::fs::read(&path)?) else {
        ctx.report_issue(
            &scope.label,
            IssueKind::Erro,
            "HTML is not valid UTF-8 - file skipped.",
        );
        if let Some(tx) = events {
            tx.send(RunEvent::FileStarted {
                file: scope.label.clone(),
                image_count: 0,
            })
            .ok();
            tx.send(RunEvent::FileFinished {
                file: scope.label.clone(),
                issues: ctx.issues_for(&scope.label).len(),
            })
            .ok();
        }
        return Ok(());
    };
    let mut doc = HtmlDocument::parse(source).map_err(|source| ProcessError::Html {
        file: file.to_path_buf(),
        source,
    })?;

    if let Some(tx) = events {
        tx.send(RunEvent::FileStarted {
            file: scope.label.clone(),
            image_count: doc.images().len(),
        })
        .ok();
    }

    let fold = doc.fold_offset();
    for img in doc.images_mut() {
        let above_fold = img.offset() < fold;
        match process_image(img, above_fold, &scope, backend, ctx) {
            Ok(()) => {}
            Err(ImageError::Write { path, source }) => {
                return Err(ProcessError::Write { path, source });
            }
            Err(e) => ctx.report_issue(&scope.label, IssueKind::Erro, e.to_string()),
        }
    }

    if let Some(tx) = events {
        tx.send(RunEvent::FileFinished {
            file: scope.label.clone(),
            issues: ctx.issues_for(&scope.label).len(),
        })
        .ok();
    }

    doc.remove_folds();
    if !dry_run && doc.is_modified() {
        std::fs::write(&path, doc.to_html())?;
    }
    Ok(())
}

/// Process the given HTML files (relative to `root`) in order.
pub fn optimize_with_backend(
    backend: &impl ImageBackend,
    root: &Path,
    files: &[PathBuf],
    config: &ImageConfig,
    dry_run: bool,
    events: Option<Sender<RunEvent>>,
) -> Result<RunContext, ProcessError> {
    let mut ctx = RunContext::new();
    for file in files {
        process_file(
            backend,
            root,
            file,
            config,
            dry_run,
            &mut ctx,
            events.as_ref(),
        )?;
    }
    Ok(ctx)
}

/// Load config, find the HTML files under `root` and process them all.
pub fn optimize(
    root: &Path,
    options: &RunOptions,
    events: Option<Sender<RunEvent>>,
) -> Result<RunContext, ProcessError> {
    let config_path = match &options.config {
        Some(path) if !path.is_file() => {
            return Err(ProcessError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )));
        }
        Some(path) => path.clone(),
        None => root.join(CONFIG_FILENAME),
    };
    let config = config::load_config(Some(&config_path), options.fast)?;

    let exclude = options
        .exclude
        .as_deref()
        .map(scan::compile_exclude)
        .transpose()?;
    let files = scan::scan(root, exclude.as_ref())?;

    let backend = RustBackend::new(EncoderSettings::from_config(&config.image));
    optimize_with_backend(
        &backend,
        root,
        &files,
        &config.image,
        options.dry_run,
        events,
    )
}

/// Machine-readable account of a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub issues: &'a std::collections::BTreeMap<String, Vec<crate::context::Issue>>,
    pub summary: &'a [crate::context::SummaryEntry],
}

impl<'a> RunReport<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            issues: ctx.issues(),
            summary: ctx.summary(),
        }
    }
}

/// Write the run's issues and summary as pretty JSON.
pub fn write_report(ctx: &RunContext, path: &Path) -> Result<(), ProcessError> {
    let json = serde_json::to_string_pretty(&RunReport::new(ctx))?;
    std::fs::write(path, json)?;
    Ok(())
}
