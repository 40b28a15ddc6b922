//! Compiling css/js directives into cached, URL-addressable artifacts.
//!
//! Combined kinds concatenate every referenced source of one type into a
//! single minified bundle; single kinds copy each source into its own
//! artifact. Both are namespaced under
//! `<asset>/<extension>/<hash(template dir)>/` and rewritten only when a
//! freshness check against the contributing modification times fails.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::directive::AssetKind;
use crate::directive::Placement;
use crate::error::CometError;
use crate::error::CometResult;
use crate::minify::AssetLanguage;
use crate::minify::Minifier;
use crate::paths;
use crate::publish::AssetPublisher;
use crate::publish::MimeSniffer;
use crate::publish::modified_time;
use crate::report::RenderEvent;
use crate::report::RenderReport;
use crate::scanner::DelimitedScanner;

/// Digits used when rendering cache hashes; base 32 keeps path segments
/// short.
const BASE32_DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// 32-bit murmur3 of the input (seed 0).
pub fn murmur3_32(data: &[u8]) -> u32 {
	const C1: u32 = 0xcc9e_2d51;
	const C2: u32 = 0x1b87_3593;

	let mut hash: u32 = 0;
	let mut chunks = data.chunks_exact(4);

	for chunk in &mut chunks {
		let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
		k = k.wrapping_mul(C1);
		k = k.rotate_left(15);
		k = k.wrapping_mul(C2);

		hash ^= k;
		hash = hash.rotate_left(13);
		hash = hash.wrapping_mul(5).wrapping_add(0xe654_6b64);
	}

	let remainder = chunks.remainder();
	if !remainder.is_empty() {
		let mut k: u32 = 0;
		for (index, byte) in remainder.iter().enumerate() {
			k ^= u32::from(*byte) << (8 * index);
		}
		k = k.wrapping_mul(C1);
		k = k.rotate_left(15);
		k = k.wrapping_mul(C2);
		hash ^= k;
	}

	hash ^= data.len() as u32;
	hash ^= hash >> 16;
	hash = hash.wrapping_mul(0x85eb_ca6b);
	hash ^= hash >> 13;
	hash = hash.wrapping_mul(0xc2b2_ae35);
	hash ^= hash >> 16;

	hash
}

/// Render a 32-bit value in base 32 (lowercase, digits `0-9a-v`).
pub fn to_base32(mut value: u32) -> String {
	if value == 0 {
		return "0".to_string();
	}

	let mut digits = Vec::new();
	while value > 0 {
		digits.push(BASE32_DIGITS[(value % 32) as usize]);
		value /= 32;
	}
	digits.reverse();

	String::from_utf8(digits).unwrap_or_default()
}

/// Deterministic, filesystem-safe token for a cache-namespacing key.
///
/// This is a namespacing convenience, not a content identity: a collision
/// between two keys is tolerable because the freshness check still forces
/// regeneration when content differs.
pub fn cache_key(input: &str) -> String {
	to_base32(murmur3_32(input.as_bytes()))
}

/// Compiles the css/js directive family for one assembled document.
pub struct AssetCompiler<'a> {
	/// The web-served root; artifact URLs are derived relative to it.
	pub public_root: &'a Path,
	/// The template tree; directive payloads resolve against it.
	pub skin_root: &'a Path,
	/// Cache output base, `<public root>/<asset segment>`.
	pub cache_base: PathBuf,
	/// Modification time of the governing layout, when one was applied.
	pub layout_modified: Option<SystemTime>,
	pub minifier: &'a dyn Minifier,
	pub publisher: &'a AssetPublisher,
	pub sniffer: &'a dyn MimeSniffer,
}

impl AssetCompiler<'_> {
	/// Process every directive of `kind` in `html`: remove the directives,
	/// resolve an up-to-date artifact for the referenced sources, and
	/// inject the corresponding `<link>`/`<script>` tag.
	pub fn compile(
		&self,
		kind: AssetKind,
		template_path: &Path,
		html: &mut String,
		report: &mut RenderReport,
	) -> CometResult<()> {
		let files = self.collect_sources(kind, html, report);
		if files.is_empty() {
			return Ok(());
		}

		let (template_dir, template_name) = paths::dir_and_file_name(template_path);
		let cache_dir = self
			.cache_base
			.join(kind.extension())
			.join(cache_key(&template_dir));
		std::fs::create_dir_all(&cache_dir)?;

		if kind.is_single() {
			self.compile_single(kind, &files, &cache_dir, html, report)
		} else {
			self.compile_combined(
				kind,
				&files,
				&cache_dir,
				&template_name,
				template_path,
				html,
				report,
			)
		}
	}

	/// Remove every directive of `kind` from `html` and resolve the
	/// referenced source paths. Missing sources are recoverable: the
	/// directive is still removed and a warning recorded.
	fn collect_sources(
		&self,
		kind: AssetKind,
		html: &mut String,
		report: &mut RenderReport,
	) -> Vec<PathBuf> {
		let scanner = DelimitedScanner::for_marker(kind.name());
		let mut files = Vec::new();

		scanner.replace_each(html, |payload| {
			let source = self
				.skin_root
				.join(payload.trim_start_matches(['/', '\\']));
			if source.is_file() {
				files.push(source);
			} else {
				tracing::debug!(path = payload, kind = kind.name(), "asset source missing");
				report.push(RenderEvent::MissingAsset {
					path: payload.to_string(),
				});
			}
			String::new()
		});

		files
	}

	/// Combined mode: concatenate, minify, and cache all sources as one
	/// bundle named by a hash of the role prefix and template basename.
	#[allow(clippy::too_many_arguments)]
	fn compile_combined(
		&self,
		kind: AssetKind,
		files: &[PathBuf],
		cache_dir: &Path,
		template_name: &str,
		template_path: &Path,
		html: &mut String,
		report: &mut RenderReport,
	) -> CometResult<()> {
		// All sources are read and pre-processed before minification sees
		// anything; the pre-pass resolves asset/base64 directives embedded
		// in the css/js text itself (one level deep).
		let mut pieces = Vec::with_capacity(files.len());
		for file in files {
			let content = std::fs::read_to_string(file)?;
			pieces.push(self.preprocess_source(&content, report)?);
		}

		let language = if kind.is_css() {
			AssetLanguage::Css
		} else {
			AssetLanguage::Js
		};
		let minified = self
			.minifier
			.minify(&pieces.join("\n"), language)
			.map_err(|error| {
				CometError::MinifyFailed {
					kind: kind.name(),
					reason: error.to_string(),
				}
			})?;

		let artifact_name = cache_key(&format!("{}{template_name}", kind.role_prefix()));
		let artifact = cache_dir.join(format!("{artifact_name}.{}", kind.extension()));

		let newest_source = files.iter().filter_map(|file| modified_time(file)).max();
		let template_time = modified_time(template_path);
		let rewritten = !self.bundle_is_fresh(&artifact, &minified, newest_source, template_time);
		if rewritten {
			std::fs::write(&artifact, &minified)?;
		}

		let url = paths::url_for_artifact(self.public_root, &artifact);
		tracing::debug!(kind = kind.name(), url, rewritten, "compiled asset bundle");
		report.push(RenderEvent::AssetCompiled {
			kind: kind.name(),
			url: url.clone(),
			rewritten,
		});
		inject_tag(kind, &url, html);

		Ok(())
	}

	/// Single mode: one artifact per source, no concatenation and no
	/// minification; freshness compares only that source's mtime.
	fn compile_single(
		&self,
		kind: AssetKind,
		files: &[PathBuf],
		cache_dir: &Path,
		html: &mut String,
		report: &mut RenderReport,
	) -> CometResult<()> {
		for file in files {
			let content = std::fs::read_to_string(file)?;
			let processed = self.preprocess_source(&content, report)?;

			let (_, source_name) = paths::dir_and_file_name(file);
			let artifact_name = cache_key(&format!("{}{source_name}", kind.role_prefix()));
			let artifact = cache_dir.join(format!("{artifact_name}.{}", kind.extension()));

			let rewritten = match (modified_time(&artifact), modified_time(file)) {
				(Some(artifact_time), Some(source_time)) => artifact_time < source_time,
				(Some(_), None) => false,
				(None, _) => true,
			};
			if rewritten {
				std::fs::write(&artifact, &processed)?;
			}

			let url = paths::url_for_artifact(self.public_root, &artifact);
			tracing::debug!(kind = kind.name(), url, rewritten, "compiled single asset");
			report.push(RenderEvent::AssetCompiled {
				kind: kind.name(),
				url: url.clone(),
				rewritten,
			});
			inject_tag(kind, &url, html);
		}

		Ok(())
	}

	/// Freshness rule for combined bundles: the artifact must exist, be at
	/// least as new as the governing layout, every contributing source, and
	/// the page template, and match the fresh content's byte size (a cheap
	/// truncation check).
	fn bundle_is_fresh(
		&self,
		artifact: &Path,
		content: &str,
		newest_source: Option<SystemTime>,
		template_time: Option<SystemTime>,
	) -> bool {
		let Some(artifact_time) = modified_time(artifact) else {
			return false;
		};

		let size_matches = std::fs::metadata(artifact)
			.map(|meta| meta.len() == content.len() as u64)
			.unwrap_or(false);
		let dominates =
			|input: Option<SystemTime>| input.is_none_or(|input| artifact_time >= input);

		size_matches
			&& dominates(self.layout_modified)
			&& dominates(newest_source)
			&& dominates(template_time)
	}

	/// Resolve `@asset` and `@base64` directives inside css/js source text
	/// so compiled assets can reference other assets one level deep.
	fn preprocess_source(
		&self,
		content: &str,
		report: &mut RenderReport,
	) -> CometResult<String> {
		let mut text = content.to_string();

		let asset_scanner = DelimitedScanner::for_marker("asset");
		let mut pos = 0;
		while let Some(occurrence) = asset_scanner.find_from(&text, pos) {
			let value = match self.publisher.publish(&occurrence.payload, report)? {
				Some(url) => url,
				None => {
					report.push(RenderEvent::MissingAsset {
						path: occurrence.payload.clone(),
					});
					String::new()
				}
			};
			text.replace_range(occurrence.start..occurrence.end, &value);
			pos = occurrence.start + value.len();
		}

		let base64_scanner = DelimitedScanner::for_marker("base64");
		let mut pos = 0;
		while let Some(occurrence) = base64_scanner.find_from(&text, pos) {
			let value = match self
				.publisher
				.embed_base64(&occurrence.payload, self.sniffer, report)?
			{
				Some(uri) => uri,
				None => {
					report.push(RenderEvent::MissingAsset {
						path: occurrence.payload.clone(),
					});
					String::new()
				}
			};
			text.replace_range(occurrence.start..occurrence.end, &value);
			pos = occurrence.start + value.len();
		}

		Ok(text)
	}
}

/// Insert the `<link>`/`<script>` tag for an artifact URL. Head placements
/// go right before `</head>` (or prepend when the document has none); body
/// placements go right before `</body>` (or append).
fn inject_tag(kind: AssetKind, url: &str, html: &mut String) {
	let tag = if kind.is_css() {
		format!("<link rel=\"stylesheet\" href=\"{url}\">")
	} else {
		format!("<script src=\"{url}\"{}></script>", kind.load_mode().attribute())
	};

	match kind.placement() {
		Placement::Head => {
			if let Some(index) = html.find("</head>") {
				html.insert_str(index, &format!("{tag}\n"));
			} else {
				html.insert_str(0, &tag);
			}
		}
		Placement::Body => {
			if let Some(index) = html.find("</body>") {
				html.insert_str(index, &format!("{tag}\n"));
			} else {
				html.push_str(&tag);
			}
		}
	}
}
