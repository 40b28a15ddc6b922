//! The fixed directive vocabulary recognized inside template and asset text.
//!
//! Every directive is an HTML comment of the form `<!--@name(payload)-->`,
//! except for the payload-free content placeholder `<!--@contents-->`, block
//! comments `{* ... *}` and variable interpolations `{$name|filter}` which
//! use their own delimiters (see [`crate::scanner`]).

/// The content placeholder a layout must contain exactly once.
pub const CONTENTS_MARKER: &str = "<!--@contents-->";

/// Opening delimiter of a template comment span.
pub const COMMENT_OPEN: &str = "{*";
/// Closing delimiter of a template comment span.
pub const COMMENT_CLOSE: &str = "*}";

/// Opening delimiter of a variable interpolation.
pub const VARIABLE_OPEN: &str = "{$";
/// Closing delimiter of a variable interpolation.
pub const VARIABLE_CLOSE: &str = "}";

/// Directives that carry a parenthesized payload, excluding the css/js
/// family which is covered by [`AssetKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DirectiveKind {
	/// `<!--@layout(name)-->` — template inheritance. At most one per page.
	Layout,
	/// `<!--@import(name)-->` — inline inclusion of another template.
	Import,
	/// `<!--@asset(path)-->` — publish a single file, substitute its URL.
	Asset,
	/// `<!--@assetDir(path)-->` — mirror a directory, no output.
	AssetDir,
	/// `<!--@base64(path)-->` — substitute a MIME-typed data URI.
	Base64,
	/// `<!--@echo(expr)-->` — evaluate a restricted expression.
	Echo,
}

impl DirectiveKind {
	/// The marker name as it appears between `<!--@` and `(`.
	pub fn name(self) -> &'static str {
		match self {
			Self::Layout => "layout",
			Self::Import => "import",
			Self::Asset => "asset",
			Self::AssetDir => "assetDir",
			Self::Base64 => "base64",
			Self::Echo => "echo",
		}
	}
}

/// Where a compiled script/stylesheet reference is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	/// Before `</head>`, or prepended when the document has no head.
	Head,
	/// Before `</body>`, or appended when the document has no body.
	Body,
}

/// Script loading attribute for injected `<script>` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
	Blocking,
	Async,
	Defer,
}

impl LoadMode {
	/// The attribute text appended to the `<script>` tag, including its
	/// leading space.
	pub fn attribute(self) -> &'static str {
		match self {
			Self::Blocking => "",
			Self::Async => " async",
			Self::Defer => " defer",
		}
	}
}

/// The css/js directive family; one variant per directive marker.
///
/// A kind is either *combined* (all referenced files concatenate into one
/// minified artifact) or *single* (one artifact per referenced file, no
/// minification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AssetKind {
	Css,
	CssSingle,
	Js,
	JsAsync,
	JsDefer,
	JsTop,
	JsTopAsync,
	JsTopDefer,
	JsSingle,
	JsSingleAsync,
	JsSingleDefer,
}

/// Directive processing order within a render pass. Head-oriented kinds run
/// first, then body-oriented ones, so injected tags land in a stable
/// sequence.
pub const COMPILE_ORDER: [AssetKind; 11] = [
	AssetKind::CssSingle,
	AssetKind::Css,
	AssetKind::JsTop,
	AssetKind::JsTopAsync,
	AssetKind::JsTopDefer,
	AssetKind::JsSingle,
	AssetKind::JsSingleAsync,
	AssetKind::JsSingleDefer,
	AssetKind::Js,
	AssetKind::JsAsync,
	AssetKind::JsDefer,
];

impl AssetKind {
	/// The marker name as it appears between `<!--@` and `(`.
	pub fn name(self) -> &'static str {
		match self {
			Self::Css => "css",
			Self::CssSingle => "cssSingle",
			Self::Js => "js",
			Self::JsAsync => "jsAsync",
			Self::JsDefer => "jsDefer",
			Self::JsTop => "jsTop",
			Self::JsTopAsync => "jsTopAsync",
			Self::JsTopDefer => "jsTopDefer",
			Self::JsSingle => "jsSingle",
			Self::JsSingleAsync => "jsSingleAsync",
			Self::JsSingleDefer => "jsSingleDefer",
		}
	}

	/// File extension of the artifacts this kind produces.
	pub fn extension(self) -> &'static str {
		match self {
			Self::Css | Self::CssSingle => "css",
			_ => "js",
		}
	}

	pub fn is_css(self) -> bool {
		matches!(self, Self::Css | Self::CssSingle)
	}

	/// Single kinds map each source file to its own artifact without
	/// concatenation or minification.
	pub fn is_single(self) -> bool {
		matches!(
			self,
			Self::CssSingle | Self::JsSingle | Self::JsSingleAsync | Self::JsSingleDefer
		)
	}

	/// Role prefix mixed into the artifact filename hash so that the same
	/// template can own one combined bundle per kind without aliasing.
	pub fn role_prefix(self) -> &'static str {
		match self {
			Self::Css => "css_",
			Self::CssSingle => "single_css_",
			Self::Js => "js_",
			Self::JsAsync => "js_async_",
			Self::JsDefer => "js_defer_",
			Self::JsTop => "top_",
			Self::JsTopAsync => "top_async_",
			Self::JsTopDefer => "top_defer_",
			Self::JsSingle => "single_",
			Self::JsSingleAsync => "single_async_",
			Self::JsSingleDefer => "single_defer_",
		}
	}

	/// Where the injected tag is placed in the document.
	pub fn placement(self) -> Placement {
		match self {
			Self::Css
			| Self::CssSingle
			| Self::JsTop
			| Self::JsTopAsync
			| Self::JsTopDefer => Placement::Head,
			_ => Placement::Body,
		}
	}

	/// Script loading attribute. Stylesheets always report `Blocking`.
	pub fn load_mode(self) -> LoadMode {
		match self {
			Self::JsAsync | Self::JsTopAsync | Self::JsSingleAsync => LoadMode::Async,
			Self::JsDefer | Self::JsTopDefer | Self::JsSingleDefer => LoadMode::Defer,
			_ => LoadMode::Blocking,
		}
	}
}
