use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CometError {
	#[error(transparent)]
	#[diagnostic(code(comet::io_error))]
	Io(#[from] std::io::Error),

	#[error("template file not found: {}", .0.display())]
	#[diagnostic(
		code(comet::template_not_found),
		help("template names are resolved as `<skin root>/<name><extension>`")
	)]
	TemplateNotFound(PathBuf),

	#[error("layout file not found: {}", .0.display())]
	#[diagnostic(
		code(comet::layout_not_found),
		help("the `<!--@layout(name)-->` directive must reference a template under the skin root")
	)]
	LayoutNotFound(PathBuf),

	#[error("layout `{}` must contain exactly one content placeholder", .0.display())]
	#[diagnostic(
		code(comet::missing_contents),
		help("add a single `<!--@contents-->` marker where the page content should be spliced")
	)]
	LayoutMissingContents(PathBuf),

	#[error("import file not found: {}", .0.display())]
	#[diagnostic(
		code(comet::import_not_found),
		help("the `<!--@import(name)-->` directive must reference a template under the skin root")
	)]
	ImportNotFound(PathBuf),

	#[error("include depth exceeded while expanding `{name}` (limit: {limit})")]
	#[diagnostic(
		code(comet::include_depth),
		help("check for cyclic `@import`/`@layout` references between templates")
	)]
	IncludeDepthExceeded { name: String, limit: usize },

	#[error("failed to minify {kind} bundle: {reason}")]
	#[diagnostic(code(comet::minify_failed))]
	MinifyFailed { kind: &'static str, reason: String },

	#[error("failed to publish `{}`: {reason}", .path.display())]
	#[diagnostic(
		code(comet::publish_failed),
		help("check filesystem permissions under the public root")
	)]
	PublishFailed { path: PathBuf, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(comet::config_parse),
		help("check that comet.toml is valid TOML with a [paths] section")
	)]
	ConfigParse(String),
}

pub type CometResult<T> = Result<T, CometError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyResult<T> = Result<T, AnyError>;
