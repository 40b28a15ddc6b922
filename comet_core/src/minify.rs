//! The minification collaborator seam.
//!
//! The core never interprets CSS or JS; combined-mode compilation hands the
//! concatenated source text to a [`Minifier`] and stores whatever comes
//! back. Hosts plug in a real minifier; the default passes text through
//! unchanged.

use crate::error::AnyError;

/// The language of the text being minified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLanguage {
	Css,
	Js,
}

impl AssetLanguage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Css => "css",
			Self::Js => "js",
		}
	}
}

/// Text-in/text-out minification. A failure here fails the whole artifact;
/// partially minified content is never published.
pub trait Minifier {
	fn minify(&self, source: &str, language: AssetLanguage) -> Result<String, AnyError>;
}

/// Default minifier: returns the source unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Minifier for Passthrough {
	fn minify(&self, source: &str, _language: AssetLanguage) -> Result<String, AnyError> {
		Ok(source.to_string())
	}
}
