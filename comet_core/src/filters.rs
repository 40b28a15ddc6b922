//! Variable interpolation and the filter pipeline.
//!
//! A `{$name|filter|command=value}` occurrence resolves the variable from
//! the render's binding map, then applies each pipe-delimited token in
//! order. Tokens are either pure value transforms, in-pipeline commands of
//! the form `name=value`, or unrecognized; the latter are ignored so a
//! template typo never fails a render.

use std::collections::HashMap;

use crate::directive::VARIABLE_CLOSE;
use crate::directive::VARIABLE_OPEN;
use crate::report::RenderEvent;
use crate::report::RenderReport;
use crate::scanner::find_span;

/// Variable bindings for one render call. Values cover strings, numbers,
/// booleans, sequences, and nested mappings.
pub type Bindings = HashMap<String, serde_json::Value>;

/// Render a binding value as substitution text. Strings pass through
/// verbatim; sequences and mappings render as compact JSON; `null` renders
/// empty.
pub fn value_to_string(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::Null => String::new(),
		serde_json::Value::String(text) => text.clone(),
		serde_json::Value::Bool(flag) => flag.to_string(),
		serde_json::Value::Number(number) => number.to_string(),
		other => serde_json::to_string(other).unwrap_or_default(),
	}
}

/// Pure value transforms available in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterKind {
	Lower,
	Upper,
	StripTag,
	Nl2Br,
	Br2Nl,
	Escape,
	Trim,
	Title,
}

impl FilterKind {
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"lower" => Some(Self::Lower),
			"upper" => Some(Self::Upper),
			"striptag" => Some(Self::StripTag),
			"nl2br" => Some(Self::Nl2Br),
			"br2nl" => Some(Self::Br2Nl),
			"escape" => Some(Self::Escape),
			"trim" => Some(Self::Trim),
			"title" => Some(Self::Title),
			_ => None,
		}
	}

	/// Apply the transform, replacing the current value.
	pub fn apply(self, value: &str) -> String {
		match self {
			Self::Lower => value.to_lowercase(),
			Self::Upper => value.to_uppercase(),
			Self::StripTag => strip_tags(value),
			Self::Nl2Br => nl2br(value),
			Self::Br2Nl => br2nl(value),
			Self::Escape => escape_html(value),
			Self::Trim => value.trim().to_string(),
			Self::Title => title_case(value),
		}
	}
}

/// In-pipeline commands of the form `name=value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PipelineCommand {
	/// Use the literal value when the current value is empty.
	Default,
	/// Append the literal value to the current value.
	Concat,
}

impl PipelineCommand {
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"default" => Some(Self::Default),
			"concat" => Some(Self::Concat),
			_ => None,
		}
	}
}

/// Resolve one `{$...}` expression (everything between the braces) to its
/// final substitution text.
pub fn apply_pipeline(expression: &str, bindings: &Bindings, report: &mut RenderReport) -> String {
	let mut tokens = expression.split('|');
	let name = tokens.next().unwrap_or_default();

	let mut value = match bindings.get(name) {
		Some(bound) => value_to_string(bound),
		None => {
			tracing::debug!(variable = name, "unbound template variable");
			report.push(RenderEvent::MissingVariable {
				name: name.to_string(),
			});
			String::new()
		}
	};

	for token in tokens {
		let token = token.trim();

		if token.contains('=') {
			let parts: Vec<&str> = token.split('=').collect();
			let Some(command) = PipelineCommand::parse(parts[0]) else {
				warn_unknown(token, report);
				continue;
			};
			// A literal containing `=` splits into more parts; the token
			// is then skipped rather than guessed at.
			if parts.len() != 2 {
				continue;
			}

			match command {
				PipelineCommand::Default => {
					if value.is_empty() {
						value = parts[1].to_string();
					}
				}
				PipelineCommand::Concat => value.push_str(parts[1]),
			}
		} else if let Some(filter) = FilterKind::parse(token) {
			value = filter.apply(&value);
		} else {
			warn_unknown(token, report);
		}
	}

	value
}

fn warn_unknown(token: &str, report: &mut RenderReport) {
	tracing::debug!(token, "unrecognized filter token ignored");
	report.push(RenderEvent::UnknownFilter {
		token: token.to_string(),
	});
}

/// Replace every `{$...}` occurrence in `text` with its pipeline result.
/// The cursor advances past each substituted value so substituted text is
/// never re-expanded.
pub fn substitute_variables(text: &mut String, bindings: &Bindings, report: &mut RenderReport) {
	let mut pos = 0;

	while let Some(span) = find_span(text, VARIABLE_OPEN, VARIABLE_CLOSE, pos) {
		let value = apply_pipeline(&span.payload, bindings, report);
		text.replace_range(span.start..span.end, &value);
		pos = span.start + value.len();
	}
}

/// Remove HTML tags. An unterminated `<` drops the remainder of the value.
fn strip_tags(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	let mut in_tag = false;

	for ch in value.chars() {
		match ch {
			'<' => in_tag = true,
			'>' if in_tag => in_tag = false,
			_ if !in_tag => out.push(ch),
			_ => {}
		}
	}

	out
}

/// Insert `<br />` before every newline sequence, keeping the newline
/// itself. `\r\n` and `\n\r` pairs count as a single break.
fn nl2br(value: &str) -> String {
	let bytes = value.as_bytes();
	let mut out = String::with_capacity(value.len());
	let mut i = 0;

	while i < bytes.len() {
		match bytes[i] {
			b'\r' | b'\n' => {
				out.push_str("<br />");
				out.push(bytes[i] as char);
				let pair = if bytes[i] == b'\r' { b'\n' } else { b'\r' };
				if i + 1 < bytes.len() && bytes[i + 1] == pair {
					out.push(bytes[i + 1] as char);
					i += 1;
				}
			}
			_ => {
				// Multi-byte characters never start with an ASCII byte, so
				// walking char boundaries here is safe.
				let ch_len = utf8_len(bytes[i]);
				out.push_str(&value[i..i + ch_len]);
				i += ch_len - 1;
			}
		}
		i += 1;
	}

	out
}

fn utf8_len(first_byte: u8) -> usize {
	match first_byte {
		byte if byte < 0x80 => 1,
		byte if byte & 0xE0 == 0xC0 => 2,
		byte if byte & 0xF0 == 0xE0 => 3,
		_ => 4,
	}
}

/// Convert `<br>` variants (case-insensitive, optional inner whitespace,
/// optional self-closing slash) back to newlines.
fn br2nl(value: &str) -> String {
	let bytes = value.as_bytes();
	let mut out = String::with_capacity(value.len());
	let mut i = 0;

	while i < bytes.len() {
		if let Some(tag_len) = match_br_tag(&bytes[i..]) {
			out.push('\n');
			i += tag_len;
		} else {
			let ch_len = utf8_len(bytes[i]);
			out.push_str(&value[i..i + ch_len]);
			i += ch_len;
		}
	}

	out
}

/// Length of a `<br[ws]*[/]>` tag starting at the slice head, if present.
fn match_br_tag(bytes: &[u8]) -> Option<usize> {
	if bytes.len() < 4 || bytes[0] != b'<' {
		return None;
	}
	if !bytes[1].eq_ignore_ascii_case(&b'b') || !bytes[2].eq_ignore_ascii_case(&b'r') {
		return None;
	}

	let mut i = 3;
	while i < bytes.len() && bytes[i].is_ascii_whitespace() {
		i += 1;
	}
	if i < bytes.len() && bytes[i] == b'/' {
		i += 1;
	}
	if i < bytes.len() && bytes[i] == b'>' {
		Some(i + 1)
	} else {
		None
	}
}

/// HTML-escape `&`, `<`, `>`, `"`, and `'`.
fn escape_html(value: &str) -> String {
	let mut out = String::with_capacity(value.len());

	for ch in value.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#039;"),
			_ => out.push(ch),
		}
	}

	out
}

/// Uppercase the first letter of every whitespace-delimited word; the rest
/// of each word is left untouched.
fn title_case(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	let mut at_word_start = true;

	for ch in value.chars() {
		if ch.is_whitespace() {
			at_word_start = true;
			out.push(ch);
		} else if at_word_start {
			out.extend(ch.to_uppercase());
			at_word_start = false;
		} else {
			out.push(ch);
		}
	}

	out
}
