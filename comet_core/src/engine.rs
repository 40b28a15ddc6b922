//! The template engine: one `render` call takes a template name and a
//! binding map and produces finished markup plus filesystem side effects
//! (cached bundles, published files).
//!
//! Resolution order per call: load, layout splice, recursive import
//! expansion, comment stripping, css/js compilation, base64 embedding,
//! directory publishing, single-asset publishing, `@echo` evaluation, and
//! variable substitution last. Assets run only after the document is fully
//! assembled so directives contributed by the layout and imports are all
//! visible in one pass.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::assets::AssetCompiler;
use crate::config::CometConfig;
use crate::directive::COMMENT_CLOSE;
use crate::directive::COMMENT_OPEN;
use crate::directive::COMPILE_ORDER;
use crate::directive::CONTENTS_MARKER;
use crate::directive::DirectiveKind;
use crate::error::CometError;
use crate::error::CometResult;
use crate::eval;
use crate::filters;
use crate::filters::Bindings;
use crate::minify::Minifier;
use crate::minify::Passthrough;
use crate::paths;
use crate::publish::AssetPublisher;
use crate::publish::ContentSniffer;
use crate::publish::MimeSniffer;
use crate::publish::modified_time;
use crate::report::RenderEvent;
use crate::report::RenderReport;
use crate::scanner;
use crate::scanner::DelimitedScanner;

/// Default template extension appended to template names.
pub const DEFAULT_EXTENSION: &str = ".html";
/// Default asset sub-path beneath the public root.
pub const DEFAULT_ASSET_PATH: &str = "assets";
/// Default skin sub-directory used by [`Engine::from_config`] when the
/// config names none.
pub const DEFAULT_SKIN_DIR: &str = "views";
/// Default bound on `@import`/`@layout` nesting.
pub const DEFAULT_INCLUDE_DEPTH: usize = 32;

/// The directive resolution and asset pipeline for one skin/public pair.
pub struct Engine {
	skin_root: PathBuf,
	public_root: PathBuf,
	asset_path: String,
	file_extension: String,
	max_include_depth: usize,
	minifier: Box<dyn Minifier>,
	sniffer: Box<dyn MimeSniffer>,
	report: RenderReport,
}

impl Engine {
	/// Engine over a skin (template) root and a public (web-served) root,
	/// with default asset path, extension, and collaborators.
	pub fn new(skin_root: impl Into<PathBuf>, public_root: impl Into<PathBuf>) -> Self {
		Self {
			skin_root: skin_root.into(),
			public_root: public_root.into(),
			asset_path: DEFAULT_ASSET_PATH.to_string(),
			file_extension: DEFAULT_EXTENSION.to_string(),
			max_include_depth: DEFAULT_INCLUDE_DEPTH,
			minifier: Box::new(Passthrough),
			sniffer: Box::new(ContentSniffer),
			report: RenderReport::default(),
		}
	}

	/// Engine configured from a loaded `comet.toml`, resolving relative
	/// paths against `root`.
	pub fn from_config(root: &Path, config: &CometConfig) -> Self {
		Self::new(
			root.join(&config.paths.skin),
			root.join(&config.paths.public),
		)
		.with_asset_path(&config.paths.asset)
		.with_file_extension(&config.paths.extension)
		.with_max_include_depth(config.max_include_depth)
	}

	/// Asset sub-path beneath the public root; an absolute path is used
	/// as-is.
	pub fn with_asset_path(mut self, asset_path: impl Into<String>) -> Self {
		self.asset_path = asset_path.into();
		self
	}

	/// Extension appended to template names, including the leading dot.
	pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
		self.file_extension = extension.into();
		self
	}

	pub fn with_max_include_depth(mut self, depth: usize) -> Self {
		self.max_include_depth = depth;
		self
	}

	pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
		self.minifier = Box::new(minifier);
		self
	}

	pub fn with_mime_sniffer(mut self, sniffer: impl MimeSniffer + 'static) -> Self {
		self.sniffer = Box::new(sniffer);
		self
	}

	/// Events collected during the most recent [`render`](Self::render)
	/// call.
	pub fn last_report(&self) -> &RenderReport {
		&self.report
	}

	/// Resolve the named template against the binding map.
	///
	/// Returns the finished markup; cached bundles and published files land
	/// beneath the public root as a side effect. Missing templates, layouts,
	/// and imports are fatal, as is an over-deep include chain; missing
	/// variables and assets degrade to empty output and surface in
	/// [`last_report`](Self::last_report).
	pub fn render(&mut self, template: &str, bindings: &Bindings) -> CometResult<String> {
		let mut report = RenderReport::new(template);

		let template_path = self.template_file(template);
		if !template_path.is_file() {
			return Err(CometError::TemplateNotFound(template_path));
		}
		let mut html = std::fs::read_to_string(&template_path)?;
		tracing::debug!(template, path = %template_path.display(), "loaded template");
		report.push(RenderEvent::TemplateLoaded {
			path: template_path.clone(),
		});

		let layout_modified = self.apply_layout(&mut html, &mut report)?;
		self.expand_imports(&mut html, 0, &mut report)?;
		scanner::strip_spans(&mut html, COMMENT_OPEN, COMMENT_CLOSE);

		let publisher = self.publisher();
		let compiler = AssetCompiler {
			public_root: &self.public_root,
			skin_root: &self.skin_root,
			cache_base: self.cache_base(),
			layout_modified,
			minifier: self.minifier.as_ref(),
			publisher: &publisher,
			sniffer: self.sniffer.as_ref(),
		};
		for kind in COMPILE_ORDER {
			compiler.compile(kind, &template_path, &mut html, &mut report)?;
		}

		self.embed_base64_directives(&mut html, &publisher, &mut report)?;
		self.publish_directory_directives(&mut html, &publisher, &mut report)?;
		self.publish_asset_directives(&mut html, &publisher, &mut report)?;
		substitute_echo(&mut html, bindings, &mut report);
		filters::substitute_variables(&mut html, bindings, &mut report);

		self.report = report;
		Ok(html)
	}

	/// Publisher for this engine's skin and asset roots. Published files
	/// land beneath the asset output directory and are served under the
	/// same URL segment as compiled bundles.
	pub fn publisher(&self) -> AssetPublisher {
		AssetPublisher::new(&self.skin_root, self.cache_base(), self.asset_web_root())
	}

	/// Filesystem path of a named template.
	fn template_file(&self, name: &str) -> PathBuf {
		let name = paths::trim_separators(&paths::normalize_slashes(name)).to_string();
		self.skin_root
			.join(format!("{name}{}", self.file_extension))
	}

	/// Cache output base: `<public root>/<asset path>` for a bare directory
	/// name, or the asset path itself when it already contains separators.
	fn cache_base(&self) -> PathBuf {
		let normalized = paths::normalize_slashes(&self.asset_path);
		if paths::is_pathlike(&normalized) {
			PathBuf::from(normalized)
		} else {
			self.public_root.join(paths::trim_separators(&normalized))
		}
	}

	/// URL segment published files are served under: the asset sub-path, or
	/// its last segment when the sub-path is a longer path.
	fn asset_web_root(&self) -> String {
		let normalized = paths::normalize_slashes(&self.asset_path);
		let trimmed = paths::trim_separators(&normalized);
		trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
	}

	/// Apply the page's layout, if it declares one.
	///
	/// Only the first `@layout` directive counts; any further occurrences
	/// are removed without effect. The layout must contain the content
	/// placeholder exactly once, and its modification time is returned so
	/// the asset cache can include it in freshness checks.
	fn apply_layout(
		&self,
		html: &mut String,
		report: &mut RenderReport,
	) -> CometResult<Option<SystemTime>> {
		let layout_scanner = DelimitedScanner::for_marker(DirectiveKind::Layout.name());
		let Some(occurrence) = layout_scanner.find_first(html) else {
			return Ok(None);
		};

		let name = occurrence.payload.clone();
		html.replace_range(occurrence.start..occurrence.end, "");
		layout_scanner.replace_each(html, |_| String::new());

		let layout_path = self.template_file(&name);
		if !layout_path.is_file() {
			return Err(CometError::LayoutNotFound(layout_path));
		}
		let layout = std::fs::read_to_string(&layout_path)?;
		if layout.matches(CONTENTS_MARKER).count() != 1 {
			return Err(CometError::LayoutMissingContents(layout_path));
		}

		let modified = modified_time(&layout_path);
		*html = layout.replacen(CONTENTS_MARKER, html, 1);
		tracing::debug!(layout = name, path = %layout_path.display(), "applied layout");
		report.push(RenderEvent::LayoutApplied {
			path: layout_path,
		});

		Ok(modified)
	}

	/// Expand every `@import` directive, recursing into imported text.
	///
	/// `depth` counts nesting levels; exceeding the configured bound is
	/// fatal, which also catches mutually recursive imports.
	fn expand_imports(
		&self,
		text: &mut String,
		depth: usize,
		report: &mut RenderReport,
	) -> CometResult<()> {
		let import_scanner = DelimitedScanner::for_marker(DirectiveKind::Import.name());
		let mut pos = 0;

		while let Some(occurrence) = import_scanner.find_from(text, pos) {
			if depth >= self.max_include_depth {
				return Err(CometError::IncludeDepthExceeded {
					name: occurrence.payload.clone(),
					limit: self.max_include_depth,
				});
			}

			let import_path = self.template_file(&occurrence.payload);
			if !import_path.is_file() {
				return Err(CometError::ImportNotFound(import_path));
			}

			let mut imported = std::fs::read_to_string(&import_path)?;
			self.expand_imports(&mut imported, depth + 1, report)?;

			tracing::debug!(import = occurrence.payload, depth, "expanded import");
			report.push(RenderEvent::Imported {
				path: import_path,
			});

			text.replace_range(occurrence.start..occurrence.end, &imported);
			pos = occurrence.start + imported.len();
		}

		Ok(())
	}

	/// Replace each `@base64` directive with a MIME-typed data URI, or the
	/// empty string when the source is missing.
	fn embed_base64_directives(
		&self,
		html: &mut String,
		publisher: &AssetPublisher,
		report: &mut RenderReport,
	) -> CometResult<()> {
		let base64_scanner = DelimitedScanner::for_marker(DirectiveKind::Base64.name());
		let mut pos = 0;

		while let Some(occurrence) = base64_scanner.find_from(html, pos) {
			let value = match publisher.embed_base64(&occurrence.payload, self.sniffer.as_ref(), report)? {
				Some(uri) => uri,
				None => {
					report.push(RenderEvent::MissingAsset {
						path: occurrence.payload.clone(),
					});
					String::new()
				}
			};
			html.replace_range(occurrence.start..occurrence.end, &value);
			pos = occurrence.start + value.len();
		}

		Ok(())
	}

	/// Mirror each `@assetDir` directory under the public root. The
	/// directive produces no output either way.
	fn publish_directory_directives(
		&self,
		html: &mut String,
		publisher: &AssetPublisher,
		report: &mut RenderReport,
	) -> CometResult<()> {
		let dir_scanner = DelimitedScanner::for_marker(DirectiveKind::AssetDir.name());
		let mut pos = 0;

		while let Some(occurrence) = dir_scanner.find_from(html, pos) {
			if publisher.publish(&occurrence.payload, report)?.is_none() {
				report.push(RenderEvent::MissingAsset {
					path: occurrence.payload.clone(),
				});
			}
			html.replace_range(occurrence.start..occurrence.end, "");
			pos = occurrence.start;
		}

		Ok(())
	}

	/// Replace each `@asset` directive with the published file's public
	/// URL, or the empty string when the source is missing.
	fn publish_asset_directives(
		&self,
		html: &mut String,
		publisher: &AssetPublisher,
		report: &mut RenderReport,
	) -> CometResult<()> {
		let asset_scanner = DelimitedScanner::for_marker(DirectiveKind::Asset.name());
		let mut pos = 0;

		while let Some(occurrence) = asset_scanner.find_from(html, pos) {
			let value = match publisher.publish(&occurrence.payload, report)? {
				Some(url) => url,
				None => {
					report.push(RenderEvent::MissingAsset {
						path: occurrence.payload.clone(),
					});
					String::new()
				}
			};
			html.replace_range(occurrence.start..occurrence.end, &value);
			pos = occurrence.start + value.len();
		}

		Ok(())
	}
}

/// Replace each `@echo` directive with its evaluated expression value.
/// Evaluation failures degrade to the empty string and a report warning.
fn substitute_echo(html: &mut String, bindings: &Bindings, report: &mut RenderReport) {
	let echo_scanner = DelimitedScanner::for_marker(DirectiveKind::Echo.name());

	echo_scanner.replace_each(html, |payload| {
		match eval::eval_expression(payload, bindings) {
			Ok(value) => value,
			Err(error) => {
				tracing::warn!(expression = payload, %error, "expression evaluation failed");
				report.push(RenderEvent::EvalFailed {
					expression: payload.to_string(),
					reason: error.to_string(),
				});
				String::new()
			}
		}
	});
}
