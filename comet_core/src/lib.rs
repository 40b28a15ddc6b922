//! `comet_core` is the core library for the comet template-and-asset
//! pipeline. Templates are plain HTML carrying comment directives; one
//! render call resolves layout inheritance and imports, compiles referenced
//! CSS/JS sources into cached minified bundles, publishes static assets
//! under a public root, and substitutes variables through a filter
//! pipeline.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template file
//!   → Engine (loads template, applies layout, expands imports)
//!   → DelimitedScanner (locates `<!--@name(payload)-->` directives)
//!   → AssetCompiler (concatenates + minifies css/js into cached bundles)
//!   → AssetPublisher (mirrors referenced files under the public root)
//!   → eval / filters (`<!--@echo(expr)-->` and `{$var|filter}` substitution)
//! ```
//!
//! ## Key Types
//!
//! - [`Engine`] — The per-project pipeline: skin root, public root, and
//!   collaborator seams, driven by [`Engine::render`].
//! - [`Bindings`] — The caller-supplied variable map for one render call.
//! - [`RenderReport`] — Events observed during the most recent render,
//!   including recoverable degradations.
//! - [`Minifier`] / [`MimeSniffer`] — Injectable collaborators for
//!   minification and MIME detection.
//! - [`CometConfig`] — Configuration loaded from `comet.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use comet_core::Bindings;
//! use comet_core::Engine;
//!
//! let mut engine = Engine::new("views", "public");
//! let mut bindings = Bindings::new();
//! bindings.insert("title".to_string(), "Home".into());
//!
//! let html = engine.render("index", &bindings).unwrap();
//! for warning in engine.last_report().warnings() {
//! 	eprintln!("{warning:?}");
//! }
//! println!("{html}");
//! ```

pub use assets::*;
pub use config::*;
pub use directive::*;
pub use engine::*;
pub use error::*;
pub use filters::*;
pub use minify::*;
pub use publish::*;
pub use report::*;

mod assets;
pub mod config;
mod directive;
mod engine;
mod error;
pub mod eval;
mod filters;
mod minify;
pub mod paths;
mod publish;
mod report;
pub mod scanner;
