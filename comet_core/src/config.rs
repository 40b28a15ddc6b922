//! Project configuration loaded from a `comet.toml` file.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CometError;
use crate::CometResult;
use crate::engine;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["comet.toml", ".comet.toml", ".config/comet.toml"];

/// Configuration loaded from a `comet.toml` file.
///
/// ```toml
/// max_include_depth = 32
///
/// [paths]
/// skin = "views"
/// public = "public"
/// asset = "assets"
/// extension = ".html"
/// ```
#[derive(Debug, Deserialize)]
pub struct CometConfig {
	/// Directory layout of the skin and public trees.
	#[serde(default)]
	pub paths: PathsConfig,
	/// Bound on `@import`/`@layout` nesting before rendering fails.
	#[serde(default = "default_include_depth")]
	pub max_include_depth: usize,
}

impl Default for CometConfig {
	fn default() -> Self {
		Self {
			paths: PathsConfig::default(),
			max_include_depth: engine::DEFAULT_INCLUDE_DEPTH,
		}
	}
}

/// The `[paths]` section.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
	/// Template tree, relative to the project root.
	#[serde(default = "default_skin")]
	pub skin: PathBuf,
	/// Web-served tree receiving compiled and published files.
	#[serde(default = "default_public")]
	pub public: PathBuf,
	/// Asset sub-path beneath the public root (or an absolute path).
	#[serde(default = "default_asset")]
	pub asset: String,
	/// Template file extension, including the leading dot.
	#[serde(default = "default_extension")]
	pub extension: String,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			skin: default_skin(),
			public: default_public(),
			asset: default_asset(),
			extension: default_extension(),
		}
	}
}

fn default_skin() -> PathBuf {
	PathBuf::from(engine::DEFAULT_SKIN_DIR)
}

fn default_public() -> PathBuf {
	PathBuf::from("public")
}

fn default_asset() -> String {
	engine::DEFAULT_ASSET_PATH.to_string()
}

fn default_extension() -> String {
	engine::DEFAULT_EXTENSION.to_string()
}

fn default_include_depth() -> usize {
	engine::DEFAULT_INCLUDE_DEPTH
}

impl CometConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> CometResult<Option<CometConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: CometConfig =
			toml::from_str(&content).map_err(|e| CometError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}
