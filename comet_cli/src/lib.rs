use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render comment-directive templates and publish their assets.",
	long_about = "comet is a file-based template-and-asset pipeline. Templates are plain HTML \
	              carrying comment directives: layout inheritance, imports, variable \
	              interpolation with filter pipelines, and css/js directives that compile \
	              referenced sources into cached, URL-addressable bundles.\n\nQuick start:\n  \
	              comet render index              Render views/index.html to stdout\n  comet \
	              render index --data site.json   Render with variable bindings\n  comet publish \
	              img/logo.png            Copy a skin asset under the public root"
)]
pub struct CometCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template to finished markup.
	///
	/// Resolves the named template beneath the skin root, applies its layout
	/// and imports, compiles referenced css/js sources into cached bundles
	/// under the public root, and substitutes variables from the data file.
	/// The markup goes to stdout unless `--out` is given; compiled and
	/// published files land beneath the public root either way.
	Render {
		/// Template name, resolved as `<skin root>/<name><extension>`.
		template: String,

		/// JSON or TOML file providing variable bindings. The top level
		/// must be an object/table; each key becomes one template variable.
		#[arg(long, short)]
		data: Option<PathBuf>,

		/// Write the markup to a file instead of stdout.
		#[arg(long, short)]
		out: Option<PathBuf>,

		/// Print a per-render summary (loads, compiles, warnings) to
		/// stderr after rendering.
		#[arg(long, default_value_t = false)]
		report: bool,
	},
	/// Publish a skin file or directory under the public root.
	///
	/// Copies the asset (or mirrors the whole directory) into the public
	/// tree, skipping files whose destination is already current, and
	/// prints the public URL.
	Publish {
		/// Asset path relative to the skin root.
		asset: String,
	},
}
