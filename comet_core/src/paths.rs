//! Path and URL helpers shared by the asset compiler and publisher.
//!
//! Duplicating this logic at call sites is a reliable source of
//! double-prefixed URLs and wrong separators on copy, so it lives in one
//! place with its own tests.

use std::path::Path;

/// Convert backslashes to forward slashes for URL-facing strings.
pub fn normalize_slashes(path: &str) -> String {
	path.replace('\\', "/")
}

/// Whether a configured asset location is a path (relative or absolute)
/// rather than a bare directory name.
pub fn is_pathlike(value: &str) -> bool {
	value.contains('/') || value.contains('\\')
}

/// Trim leading and trailing path separators of either flavor.
pub fn trim_separators(value: &str) -> &str {
	value.trim_matches(['/', '\\'])
}

/// Drop a duplicated web-root segment from the front of a relative path.
///
/// Callers sometimes write `<!--@asset(assets/logo.png)-->` even though the
/// publisher already roots URLs at `/assets/`. The match is case-sensitive
/// and separator-aware: `assets-extra/logo.png` is not stripped.
pub fn strip_web_root<'a>(relative: &'a str, web_root: &str) -> &'a str {
	let root = web_root.trim_matches('/');
	if root.is_empty() {
		return relative;
	}

	if relative == root {
		return "";
	}

	relative
		.strip_prefix(root)
		.and_then(|rest| rest.strip_prefix('/'))
		.unwrap_or(relative)
}

/// Public URL for a path relative to the web root segment, always with a
/// leading slash and forward separators.
pub fn public_url(web_root: &str, relative: &str) -> String {
	let root = trim_separators(&normalize_slashes(web_root)).to_string();
	let rel = normalize_slashes(relative);
	let rel = rel.trim_matches('/');

	if rel.is_empty() {
		format!("/{root}")
	} else {
		format!("/{root}/{rel}")
	}
}

/// Public URL for an absolute artifact path beneath the public root:
/// the public-root prefix is stripped and separators normalized.
pub fn url_for_artifact(public_root: &Path, artifact: &Path) -> String {
	let relative = artifact.strip_prefix(public_root).unwrap_or(artifact);
	let url = normalize_slashes(&relative.to_string_lossy());
	if url.starts_with('/') {
		url
	} else {
		format!("/{url}")
	}
}

/// The immediate parent directory name and file name of a path, used to
/// namespace cache output per template directory.
pub fn dir_and_file_name(path: &Path) -> (String, String) {
	let name = path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
	let dir = path
		.parent()
		.and_then(Path::file_name)
		.map(|dir| dir.to_string_lossy().into_owned())
		.unwrap_or_default();

	(dir, name)
}
