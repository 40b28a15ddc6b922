//! Publishing source-tree assets into the public root.
//!
//! Single files and whole directories are mirrored under the public root
//! with an mtime comparison so unchanged files are never rewritten;
//! publishing is therefore idempotent and safe to call on every render.

use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::CometError;
use crate::error::CometResult;
use crate::paths;
use crate::report::RenderEvent;
use crate::report::RenderReport;

/// MIME detection collaborator for `@base64` data URIs.
pub trait MimeSniffer {
	fn sniff(&self, path: &Path, bytes: &[u8]) -> String;
}

/// Default sniffer: well-known magic bytes first, file extension second,
/// `application/octet-stream` last.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentSniffer;

impl MimeSniffer for ContentSniffer {
	fn sniff(&self, path: &Path, bytes: &[u8]) -> String {
		if let Some(mime) = sniff_magic(bytes) {
			return mime.to_string();
		}

		let extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(str::to_ascii_lowercase)
			.unwrap_or_default();

		mime_for_extension(&extension).to_string()
	}
}

fn sniff_magic(bytes: &[u8]) -> Option<&'static str> {
	if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
		Some("image/png")
	} else if bytes.starts_with(b"\xff\xd8\xff") {
		Some("image/jpeg")
	} else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
		Some("image/gif")
	} else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
		Some("image/webp")
	} else if bytes.starts_with(b"wOF2") {
		Some("font/woff2")
	} else if bytes.starts_with(b"wOFF") {
		Some("font/woff")
	} else if bytes.starts_with(b"%PDF") {
		Some("application/pdf")
	} else if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") {
		Some("image/svg+xml")
	} else {
		None
	}
}

fn mime_for_extension(extension: &str) -> &'static str {
	match extension {
		"css" => "text/css",
		"js" => "text/javascript",
		"json" => "application/json",
		"html" | "htm" => "text/html",
		"txt" => "text/plain",
		"png" => "image/png",
		"jpg" | "jpeg" => "image/jpeg",
		"gif" => "image/gif",
		"webp" => "image/webp",
		"svg" => "image/svg+xml",
		"ico" => "image/vnd.microsoft.icon",
		"woff" => "font/woff",
		"woff2" => "font/woff2",
		"ttf" => "font/ttf",
		"otf" => "font/otf",
		"pdf" => "application/pdf",
		_ => "application/octet-stream",
	}
}

/// Mirrors skin-tree assets into the public root and derives their URLs.
#[derive(Debug, Clone)]
pub struct AssetPublisher {
	source_root: PathBuf,
	public_dir: PathBuf,
	web_root: String,
}

impl AssetPublisher {
	/// `source_root` is the skin tree, `public_dir` the directory published
	/// files land in, and `web_root` the URL segment they are served under.
	/// An empty `web_root` falls back to `public_dir`'s base name.
	pub fn new(
		source_root: impl Into<PathBuf>,
		public_dir: impl Into<PathBuf>,
		web_root: impl Into<String>,
	) -> Self {
		let public_dir: PathBuf = public_dir.into();
		let mut web_root = web_root.into();
		if web_root.is_empty() {
			web_root = public_dir
				.file_name()
				.map(|name| name.to_string_lossy().into_owned())
				.unwrap_or_default();
		}

		Self {
			source_root: source_root.into(),
			public_dir,
			web_root,
		}
	}

	/// The URL segment published files are served under.
	pub fn web_root(&self) -> &str {
		&self.web_root
	}

	/// Publish a file or directory referenced relative to the source root.
	///
	/// Returns the public URL, or `None` when the source does not exist
	/// (the caller decides how to degrade). Files are copied only when the
	/// source is strictly newer than an existing destination.
	pub fn publish(
		&self,
		relative: &str,
		report: &mut RenderReport,
	) -> CometResult<Option<String>> {
		let original = relative.trim_start_matches(['/', '\\']);
		let normalized = paths::normalize_slashes(original);
		// Callers may include the web root in the path; the public side
		// drops the duplicated segment, the source side keeps the original.
		let public_relative = paths::strip_web_root(&normalized, &self.web_root);

		let source = self.source_root.join(original);
		let destination = self.public_dir.join(public_relative);
		let url = paths::public_url(&self.web_root, public_relative);

		if source.is_dir() {
			let copied = self.mirror_directory(&source, &destination)?;
			tracing::debug!(source = %source.display(), url, copied, "published directory");
			report.push(RenderEvent::AssetPublished {
				source,
				url: url.clone(),
				copied: copied > 0,
			});
			return Ok(Some(url));
		}

		if !source.is_file() {
			return Ok(None);
		}

		if let Some(parent) = destination.parent() {
			std::fs::create_dir_all(parent).map_err(|error| {
				CometError::PublishFailed {
					path: destination.clone(),
					reason: error.to_string(),
				}
			})?;
		}

		let copied = copy_if_newer(&source, &destination)?;
		tracing::debug!(source = %source.display(), url, copied, "published file");
		report.push(RenderEvent::AssetPublished {
			source,
			url: url.clone(),
			copied,
		});

		Ok(Some(url))
	}

	/// Embed a source file as a MIME-typed base64 data URI. The file is
	/// also published so hosts can offer a cache-friendly URL alternative.
	/// Returns `None` when the source does not exist.
	pub fn embed_base64(
		&self,
		relative: &str,
		sniffer: &dyn MimeSniffer,
		report: &mut RenderReport,
	) -> CometResult<Option<String>> {
		let original = relative.trim_start_matches(['/', '\\']);
		let source = self.source_root.join(original);

		if !source.is_file() {
			return Ok(None);
		}

		self.publish(relative, report)?;

		let bytes = std::fs::read(&source)?;
		let mime = sniffer.sniff(&source, &bytes);
		let payload = BASE64.encode(&bytes);

		report.push(RenderEvent::Base64Embedded {
			path: source,
			bytes: bytes.len(),
		});

		Ok(Some(format!("data:{mime};base64,{payload}")))
	}

	/// Recursively mirror `source` into `destination`, copying only files
	/// whose source is strictly newer. Returns the number of files copied.
	fn mirror_directory(&self, source: &Path, destination: &Path) -> CometResult<usize> {
		std::fs::create_dir_all(destination).map_err(|error| {
			CometError::PublishFailed {
				path: destination.to_path_buf(),
				reason: error.to_string(),
			}
		})?;

		let mut copied = 0;

		for entry in std::fs::read_dir(source)? {
			let entry = entry?;
			let entry_source = entry.path();
			let entry_destination = destination.join(entry.file_name());

			if entry.file_type()?.is_dir() {
				copied += self.mirror_directory(&entry_source, &entry_destination)?;
			} else if copy_if_newer(&entry_source, &entry_destination)? {
				copied += 1;
			}
		}

		Ok(copied)
	}
}

/// Copy `source` to `destination` when the destination is missing or older.
/// Equal modification times count as current, which keeps repeated publishes
/// write-free.
fn copy_if_newer(source: &Path, destination: &Path) -> CometResult<bool> {
	let source_time = modified_time(source);
	let destination_time = modified_time(destination);

	let stale = match (source_time, destination_time) {
		(_, None) => true,
		(None, Some(_)) => false,
		(Some(source_time), Some(destination_time)) => source_time > destination_time,
	};

	if stale {
		std::fs::copy(source, destination).map_err(|error| {
			CometError::PublishFailed {
				path: destination.to_path_buf(),
				reason: error.to_string(),
			}
		})?;
	}

	Ok(stale)
}

/// Modification time, or `None` when the file is missing or the platform
/// cannot report one.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
	std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
