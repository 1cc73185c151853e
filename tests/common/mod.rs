//! Shared helpers for driving the `stratplan` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Run `stratplan` with `args`, logging suppressed so stderr only carries
/// reports and errors.
pub fn stratplan<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_stratplan"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("run stratplan")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Run `plan` for a fixture config and return the parsed plan JSON.
pub fn plan_json(config: &str) -> serde_json::Value {
    let config = fixture(config);
    let output = stratplan(["plan".as_ref(), "--config".as_ref(), config.as_os_str()]);
    assert!(output.status.success(), "plan failed: {}", stderr(&output));
    serde_json::from_slice(&output.stdout).expect("plan JSON")
}
