//! # imgpress
//!
//! A post-processor for built static sites. Point it at the output directory
//! of any site generator and it rewrites every `<img>` in every HTML file in
//! place, re-encodes the local images it references, and writes the new
//! variants next to the originals.
//!
//! # Architecture: Fixed Per-Image Pipeline
//!
//! ```text
//! scan       site/             →  HTML files (sorted, exclude regex applied)
//! parse      page.html         →  <img> elements + <the-fold> position
//! per <img>  normalize → dispatch → embed? → resolve size → srcset
//! write      page.html         ←  edited tags spliced into the source text
//! ```
//!
//! Each stage is a plain function over an [`html::ImgElement`], a
//! [`resource::Resource`] and the run-wide [`context::RunContext`]. Image
//! decoding and encoding go through the [`imaging::ImageBackend`] trait, so
//! the pipeline logic is tested against a mock backend without touching a
//! real codec.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Recursive discovery of `.html`/`.htm` files with an exclude regex |
//! | [`html`] | `<img>` and `<the-fold>` lookup, attribute editing, source splicing |
//! | [`resource`] | `src` → filesystem path translation, lazy file data and metadata |
//! | [`attributes`] | `alt`, `loading`, `fetchpriority`, `decoding` normalization |
//! | [`dispatch`] | Codec choice, compress-once bookkeeping, `src` rewriting |
//! | [`embed`] | Data-URI inlining of tiny compressed results |
//! | [`dimensions`] | Explicit `width`/`height` from declared values and true ratio |
//! | [`srcset`] | Downscaled variants and the `srcset` attribute |
//! | [`process`] | Per-image and per-file orchestration, the run, the JSON report |
//! | [`context`] | Run-wide state: compressed sources, generated outputs, issues, summary |
//! | [`config`] | `imgpress.toml` loading, validation, the fast overlay |
//! | [`format`] | Supported image formats and their extensions/MIME types |
//! | [`imaging`] | Backend trait, pure-Rust backend, SVG helpers, size calculations |
//! | [`output`] | CLI output formatting for progress, issues and the summary |
//!
//! # Design Decisions
//!
//! ## Source Splicing Over Re-Serialization
//!
//! The HTML is never re-serialized from a DOM. Only the byte ranges of edited
//! `<img>` tags are replaced, so everything else in the file (whitespace,
//! comments, unusual markup) comes out exactly as it went in.
//!
//! ## First Reference Wins
//!
//! An image referenced from several pages is compressed once, by the first
//! reference in scan order. Later references get the same `src` even when
//! their position relative to the fold would have picked another codec.
//! Their `srcset` steps still follow their own fold position, so one source
//! can end up with both `@<w>w.jpg` and `@<w>w.webp` steps. Scan order is
//! sorted, so runs are reproducible.
//!
//! ## The Fold Is Explicit
//!
//! There is no layout engine. Authors mark the fold with a `<the-fold>`
//! element; images before it are eager and high priority, images after it
//! are lazy. The marker is removed from the written HTML.

pub mod attributes;
pub mod config;
pub mod context;
pub mod dimensions;
pub mod dispatch;
pub mod embed;
pub mod format;
pub mod html;
pub mod imaging;
pub mod output;
pub mod process;
pub mod resource;
pub mod scan;
pub mod srcset;

#[cfg(test)]
pub(crate) mod test_helpers;
