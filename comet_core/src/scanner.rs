//! Byte-level scanning for directive invocations inside arbitrary text.
//!
//! [`DelimitedScanner`] locates `marker(payload)` constructs while honoring
//! nested parentheses and quoted string literals, so a `)` inside a quoted
//! run never terminates the payload. Plain open/close span pairs (comments,
//! variable interpolations) go through [`find_span`].

/// Lite substring search over raw bytes.
pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}

/// A located directive match.
///
/// Offsets are byte positions into the exact text snapshot the scan ran
/// against; any edit to that text invalidates them, so every edit pass must
/// either rescan or advance a running cursor (see
/// [`DelimitedScanner::replace_each`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveOccurrence {
	/// Byte offset of the first byte of the marker prefix.
	pub start: usize,
	/// Byte offset just past the trailing `-->`.
	pub end: usize,
	/// The raw payload between the marker's `(` and its matching `)`.
	pub payload: String,
}

/// Matcher for one directive marker, e.g. `<!--@echo(`.
#[derive(Debug, Clone)]
pub struct DelimitedScanner {
	prefix: String,
}

const CLOSE_TAIL: &str = "-->";

impl DelimitedScanner {
	/// Scanner for the directive named `marker`, matching
	/// `<!--@marker(payload)-->`.
	pub fn for_marker(marker: &str) -> Self {
		Self {
			prefix: format!("<!--@{marker}("),
		}
	}

	/// Find the next well-formed occurrence at or after byte offset `from`.
	///
	/// A prefix whose payload never closes, or whose closing `)` is not
	/// immediately followed by `-->`, is malformed: it is skipped and the
	/// scan resumes right after the prefix rather than after a guessed end,
	/// so a later genuine occurrence is never shadowed.
	pub fn find_from(&self, text: &str, from: usize) -> Option<DirectiveOccurrence> {
		let bytes = text.as_bytes();
		let prefix = self.prefix.as_bytes();
		let mut search_from = from.min(bytes.len());

		while search_from < bytes.len() {
			let rel = memstr(&bytes[search_from..], prefix)?;
			let start = search_from + rel;
			let payload_start = start + prefix.len();

			match scan_payload(bytes, payload_start) {
				Some(close_at) if bytes[close_at + 1..].starts_with(CLOSE_TAIL.as_bytes()) => {
					let payload = text[payload_start..close_at].to_string();
					return Some(DirectiveOccurrence {
						start,
						end: close_at + 1 + CLOSE_TAIL.len(),
						payload,
					});
				}
				_ => {
					// Malformed: resume after the prefix, not after a guess.
					search_from = payload_start;
				}
			}
		}

		None
	}

	/// Find the first well-formed occurrence.
	pub fn find_first(&self, text: &str) -> Option<DirectiveOccurrence> {
		self.find_from(text, 0)
	}

	/// Collect every well-formed occurrence, left to right.
	pub fn find_all(&self, text: &str) -> Vec<DirectiveOccurrence> {
		let mut found = Vec::new();
		let mut pos = 0;

		while let Some(occurrence) = self.find_from(text, pos) {
			pos = occurrence.end;
			found.push(occurrence);
		}

		found
	}

	/// Replace every occurrence with the value produced by `replace`,
	/// editing `text` in place.
	///
	/// The cursor advances past each replacement's end rather than the
	/// matched directive's end, so directives introduced by a replacement
	/// value are never themselves expanded (no accidental recursive
	/// expansion), and stale offsets are never reused after an edit.
	pub fn replace_each<F>(&self, text: &mut String, mut replace: F)
	where
		F: FnMut(&str) -> String,
	{
		let mut pos = 0;

		while let Some(occurrence) = self.find_from(text, pos) {
			let value = replace(&occurrence.payload);
			text.replace_range(occurrence.start..occurrence.end, &value);
			pos = occurrence.start + value.len();
		}
	}
}

/// Walk the payload starting just after the opening `(`, returning the byte
/// offset of the matching close paren.
///
/// Depth starts at 1 for the paren implied by the prefix. A backslash
/// escapes the following byte unconditionally; quote state toggles on
/// unescaped `'` / `"` and parens inside a quoted run never affect depth.
fn scan_payload(bytes: &[u8], payload_start: usize) -> Option<usize> {
	let mut depth = 1usize;
	let mut in_string: Option<u8> = None;
	let mut escaped = false;
	let mut i = payload_start;

	while i < bytes.len() {
		let byte = bytes[i];

		if escaped {
			escaped = false;
			i += 1;
			continue;
		}

		if byte == b'\\' {
			escaped = true;
			i += 1;
			continue;
		}

		match in_string {
			Some(quote) => {
				if byte == quote {
					in_string = None;
				}
			}
			None => {
				match byte {
					b'"' | b'\'' => in_string = Some(byte),
					b'(' => depth += 1,
					b')' => {
						depth -= 1;
						if depth == 0 {
							return Some(i);
						}
					}
					_ => {}
				}
			}
		}

		i += 1;
	}

	None
}

/// A located plain span match (no nesting rules).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanOccurrence {
	/// Byte offset of the opening delimiter.
	pub start: usize,
	/// Byte offset just past the closing delimiter.
	pub end: usize,
	/// The text between the delimiters.
	pub payload: String,
}

/// Find the next `open ... close` span at or after `from`. Matches the
/// earliest close after the open; spans do not nest.
pub fn find_span(text: &str, open: &str, close: &str, from: usize) -> Option<SpanOccurrence> {
	let bytes = text.as_bytes();
	let from = from.min(bytes.len());
	let open_rel = memstr(&bytes[from..], open.as_bytes())?;
	let start = from + open_rel;
	let payload_start = start + open.len();
	let close_rel = memstr(&bytes[payload_start..], close.as_bytes())?;
	let payload_end = payload_start + close_rel;

	Some(SpanOccurrence {
		start,
		end: payload_end + close.len(),
		payload: text[payload_start..payload_end].to_string(),
	})
}

/// Remove every `open ... close` span from `text`.
pub fn strip_spans(text: &mut String, open: &str, close: &str) {
	let mut pos = 0;

	while let Some(span) = find_span(text, open, close, pos) {
		text.replace_range(span.start..span.end, "");
		pos = span.start;
	}
}
