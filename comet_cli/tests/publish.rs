mod common;

use comet_core::AnyResult;

#[test]
fn publish_copies_a_file_and_prints_its_url() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views/img"))?;
	std::fs::write(tmp.path().join("views/img/logo.png"), "bytes")?;

	common::comet_cmd()
		.arg("publish")
		.arg("img/logo.png")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("/assets/img/logo.png"));

	assert!(tmp.path().join("public/assets/img/logo.png").is_file());

	Ok(())
}

#[test]
fn publish_mirrors_a_directory() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views/fonts/deep"))?;
	std::fs::write(tmp.path().join("views/fonts/a.woff2"), "aa")?;
	std::fs::write(tmp.path().join("views/fonts/deep/b.woff2"), "bb")?;

	common::comet_cmd()
		.arg("publish")
		.arg("fonts")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("/assets/fonts"));

	assert!(tmp.path().join("public/assets/fonts/a.woff2").is_file());
	assert!(tmp.path().join("public/assets/fonts/deep/b.woff2").is_file());

	Ok(())
}

#[test]
fn publish_fails_for_a_missing_asset() -> AnyResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("views"))?;

	common::comet_cmd()
		.arg("publish")
		.arg("nope.png")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.failure()
		.stderr(predicates::str::contains("asset not found"));

	Ok(())
}
