//! Per-render event collection.
//!
//! The engine rebuilds a [`RenderReport`] for every render call instead of
//! accumulating process-global state; callers that want ambient output get
//! the same information through `tracing` events emitted at the collection
//! points.

use std::path::PathBuf;

/// One observable event during a render pass.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RenderEvent {
	/// The page template was read from disk.
	TemplateLoaded { path: PathBuf },
	/// A layout was applied around the page content.
	LayoutApplied { path: PathBuf },
	/// An import directive was expanded.
	Imported { path: PathBuf },
	/// A css/js bundle or single artifact was resolved. `rewritten` is false
	/// when the freshness check found the existing artifact up to date.
	AssetCompiled {
		kind: &'static str,
		url: String,
		rewritten: bool,
	},
	/// A source file or directory was published under the public root.
	/// `copied` is false when the destination was already current.
	AssetPublished {
		source: PathBuf,
		url: String,
		copied: bool,
	},
	/// A file was embedded as a base64 data URI.
	Base64Embedded { path: PathBuf, bytes: usize },
	/// A variable interpolation referenced an unbound name.
	MissingVariable { name: String },
	/// A filter token matched neither a transform nor a command.
	UnknownFilter { token: String },
	/// An asset/base64 directive referenced a file that does not exist.
	MissingAsset { path: String },
	/// An `@echo` expression failed to parse or evaluate.
	EvalFailed { expression: String, reason: String },
}

impl RenderEvent {
	/// Whether this event describes a recoverable degradation rather than
	/// ordinary progress.
	pub fn is_warning(&self) -> bool {
		matches!(
			self,
			Self::MissingVariable { .. }
				| Self::UnknownFilter { .. }
				| Self::MissingAsset { .. }
				| Self::EvalFailed { .. }
		)
	}
}

/// Everything observed while rendering one template.
#[derive(Debug, Default, Clone)]
pub struct RenderReport {
	/// The template name the render was called with.
	pub template: String,
	/// Events in occurrence order.
	pub events: Vec<RenderEvent>,
}

impl RenderReport {
	pub fn new(template: impl Into<String>) -> Self {
		Self {
			template: template.into(),
			events: Vec::new(),
		}
	}

	pub fn push(&mut self, event: RenderEvent) {
		self.events.push(event);
	}

	/// Recoverable degradations recorded during the render.
	pub fn warnings(&self) -> impl Iterator<Item = &RenderEvent> {
		self.events.iter().filter(|event| event.is_warning())
	}

	pub fn has_warnings(&self) -> bool {
		self.warnings().next().is_some()
	}

	/// Number of artifacts actually written (not counting fresh cache hits
	/// and already-current published files).
	pub fn writes(&self) -> usize {
		self.events
			.iter()
			.filter(|event| {
				matches!(
					event,
					RenderEvent::AssetCompiled {
						rewritten: true,
						..
					} | RenderEvent::AssetPublished { copied: true, .. }
				)
			})
			.count()
	}
}
