mod common;

use comet_core::AnyResult;
use predicates::prelude::PredicateBooleanExt;

#[test]
fn render_writes_markup_to_stdout() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(
		tmp.path().join("views/index.html"),
		"<p>Hello {$name|default=Guest}</p>",
	)?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<p>Hello Guest</p>"));

	Ok(())
}

#[test]
fn render_binds_variables_from_a_json_data_file() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(
		tmp.path().join("views/index.html"),
		"<p>Hello {$name}</p>",
	)?;
	std::fs::write(tmp.path().join("site.json"), r#"{"name": "Ann"}"#)?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--data")
		.arg(tmp.path().join("site.json"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<p>Hello Ann</p>"));

	Ok(())
}

#[test]
fn render_binds_variables_from_a_toml_data_file() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(
		tmp.path().join("views/index.html"),
		"<p>{$greeting}, {$name}</p>",
	)?;
	std::fs::write(
		tmp.path().join("site.toml"),
		"greeting = \"Hi\"\nname = \"Ann\"\n",
	)?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--data")
		.arg(tmp.path().join("site.toml"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<p>Hi, Ann</p>"));

	Ok(())
}

#[test]
fn render_rejects_non_object_data_files() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(tmp.path().join("views/index.html"), "<p>hi</p>")?;
	std::fs::write(tmp.path().join("site.json"), "[1, 2, 3]")?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--data")
		.arg(tmp.path().join("site.json"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.failure()
		.stderr(predicates::str::contains("object/table"));

	Ok(())
}

#[test]
fn render_fails_for_a_missing_template() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;

	common::comet_cmd()
		.arg("render")
		.arg("nowhere")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.failure()
		.stderr(predicates::str::contains("not found"));

	Ok(())
}

#[test]
fn render_writes_to_a_file_with_out() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(tmp.path().join("views/index.html"), "<p>saved</p>")?;
	let out = tmp.path().join("rendered.html");

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--out")
		.arg(&out)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote"));

	assert_eq!(std::fs::read_to_string(&out)?, "<p>saved</p>");

	Ok(())
}

#[test]
fn render_honors_comet_toml_paths() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("tpl"))?;
	std::fs::write(
		tmp.path().join("comet.toml"),
		"[paths]\nskin = \"tpl\"\nextension = \".tpl\"\n",
	)?;
	std::fs::write(tmp.path().join("tpl/home.tpl"), "<p>from tpl</p>")?;

	common::comet_cmd()
		.arg("render")
		.arg("home")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<p>from tpl</p>"));

	Ok(())
}

#[test]
fn render_report_surfaces_warnings_on_stderr() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;
	std::fs::write(tmp.path().join("views/index.html"), "<p>{$unbound}</p>")?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--report")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(
			predicates::str::contains("unbound variable")
				.and(predicates::str::contains("warning(s)")),
		);

	Ok(())
}

#[test]
fn render_compiles_css_beneath_the_public_root() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views/css"))?;
	std::fs::write(tmp.path().join("views/css/site.css"), "body{margin:0}")?;
	std::fs::write(
		tmp.path().join("views/index.html"),
		"<html><head><!--@css(css/site.css)--></head><body></body></html>",
	)?;

	common::comet_cmd()
		.arg("render")
		.arg("index")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("<link rel=\"stylesheet\" href=\"/assets/css/"));

	assert!(tmp.path().join("public/assets/css").is_dir());

	Ok(())
}
