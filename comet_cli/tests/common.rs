use assert_cmd::Command;

pub fn comet_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("comet").unwrap_or_else(|e| panic!("missing comet binary: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd
}
