use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use comet_cli::Commands;
use comet_cli::CometCli;
use comet_core::Bindings;
use comet_core::CometConfig;
use comet_core::Engine;
use comet_core::RenderEvent;
use comet_core::RenderReport;
use owo_colors::OwoColorize;
use tracing_subscriber::filter::LevelFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = CometCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			LevelFilter::DEBUG
		} else {
			LevelFilter::WARN
		})
		.with_writer(std::io::stderr)
		.init();

	let result = match &args.command {
		Some(Commands::Render {
			template,
			data,
			out,
			report,
		}) => run_render(&args, template, data.as_deref(), out.as_deref(), *report),
		Some(Commands::Publish { asset }) => run_publish(&args, asset),
		None => {
			eprintln!("No subcommand specified. Run `comet --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<comet_core::CometError>() {
			Ok(comet_err) => {
				let report: miette::Report = (*comet_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &CometCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn build_engine(root: &Path) -> Result<Engine, Box<dyn std::error::Error>> {
	let config = CometConfig::load(root)?.unwrap_or_default();
	Ok(Engine::from_config(root, &config))
}

/// Parse a `--data` file into variable bindings. JSON and TOML are
/// distinguished by extension; the top level must be an object/table.
fn load_bindings(path: &Path) -> Result<Bindings, Box<dyn std::error::Error>> {
	let content = std::fs::read_to_string(path)?;
	let extension = path
		.extension()
		.and_then(|ext| ext.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();

	let value: serde_json::Value = match extension.as_str() {
		"toml" => {
			let table: toml::Value = toml::from_str(&content)?;
			serde_json::to_value(table)?
		}
		_ => serde_json::from_str(&content)?,
	};

	let serde_json::Value::Object(map) = value else {
		return Err(format!(
			"data file `{}` must contain an object/table at the top level",
			path.display()
		)
		.into());
	};

	Ok(map.into_iter().collect())
}

fn run_render(
	args: &CometCli,
	template: &str,
	data: Option<&Path>,
	out: Option<&Path>,
	show_report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut engine = build_engine(&root)?;

	let bindings = match data {
		Some(path) => load_bindings(path)?,
		None => Bindings::new(),
	};

	let html = engine.render(template, &bindings)?;

	match out {
		Some(path) => {
			std::fs::write(path, &html)?;
			println!("Wrote {}", path.display());
		}
		None => print!("{html}"),
	}

	if show_report {
		print_report(engine.last_report());
	}

	Ok(())
}

fn run_publish(args: &CometCli, asset: &str) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let publisher = build_engine(&root)?.publisher();

	let mut report = RenderReport::default();
	match publisher.publish(asset, &mut report)? {
		Some(url) => {
			println!("{url}");
			Ok(())
		}
		None => Err(format!("asset not found under the skin root: {asset}").into()),
	}
}

fn print_report(report: &RenderReport) {
	eprintln!();
	eprintln!("{}", colored!(format!("render: {}", report.template), bold));

	for event in &report.events {
		match event {
			RenderEvent::TemplateLoaded { path } => {
				eprintln!("  loaded     {}", path.display());
			}
			RenderEvent::LayoutApplied { path } => {
				eprintln!("  layout     {}", path.display());
			}
			RenderEvent::Imported { path } => {
				eprintln!("  imported   {}", path.display());
			}
			RenderEvent::AssetCompiled {
				kind,
				url,
				rewritten,
			} => {
				let status = if *rewritten { "compiled" } else { "cached" };
				eprintln!("  {status:<10} {kind} -> {url}");
			}
			RenderEvent::AssetPublished { url, copied, .. } => {
				let status = if *copied { "published" } else { "current" };
				eprintln!("  {status:<10} {url}");
			}
			RenderEvent::Base64Embedded { path, bytes } => {
				eprintln!("  embedded   {} ({bytes} bytes)", path.display());
			}
			RenderEvent::MissingVariable { name } => {
				eprintln!("  {} unbound variable `{name}`", colored!("warning:", yellow));
			}
			RenderEvent::UnknownFilter { token } => {
				eprintln!("  {} unknown filter `{token}`", colored!("warning:", yellow));
			}
			RenderEvent::MissingAsset { path } => {
				eprintln!("  {} missing asset `{path}`", colored!("warning:", yellow));
			}
			RenderEvent::EvalFailed { expression, reason } => {
				eprintln!(
					"  {} expression `{expression}` failed: {reason}",
					colored!("warning:", yellow)
				);
			}
			_ => {}
		}
	}

	eprintln!(
		"  {} file(s) written, {} warning(s)",
		report.writes(),
		report.warnings().count()
	);
}
