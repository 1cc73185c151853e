//! Atomic file output for plans, reports, and manifests.
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed into place, so readers never observe a partial file.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in {}", parent.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).context("serialize JSON")?;
    bytes.push(b'\n');
    write_bytes(path, &bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn json_round_trips_through_nested_directories() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("a/b/plan.json");
        write_json(&path, &serde_json::json!({"builds": []})).expect("write");
        let value: serde_json::Value = read_json(&path).expect("read");
        assert_eq!(value["builds"], serde_json::json!([]));
        let text = fs::read_to_string(&path).expect("text");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn rewrites_replace_previous_content() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("list.tsv");
        write_text(&path, "old\n").expect("first write");
        write_text(&path, "new\n").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "new\n");
    }
}
