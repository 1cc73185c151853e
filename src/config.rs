//! Configuration loading and validation.
//!
//! The YAML document is parsed into a JSON value first so that every later
//! step (digesting, section-wise deserialization, error paths) works on one
//! representation. Validation never stops at the first problem.
use crate::errors::PlanReport;
use crate::model::Config;
use crate::util::sha256_hex;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

mod convert;
mod raw;

/// Parse YAML (or JSON, which is a YAML subset) into a JSON value.
pub fn parse_document(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).context("parse config YAML")?;
    let value = serde_json::to_value(yaml).context("convert config YAML to JSON")?;
    if !value.is_object() {
        return Err(anyhow!("config document must be a mapping at the top level"));
    }
    Ok(value)
}

/// Read and parse the config document at `path`.
pub fn load_document(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse_document(&text).with_context(|| format!("load config {}", path.display()))
}

/// Validate a parsed document into the closed model, reporting every
/// problem found.
pub fn validate(doc: &Value) -> std::result::Result<Config, PlanReport> {
    convert::convert(doc)
}

/// Digest of the canonical JSON form of a document. Key order in the source
/// file does not affect it.
pub fn config_digest(doc: &Value) -> String {
    let canonical = serde_json::to_vec(doc).unwrap_or_default();
    sha256_hex(&canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_ignores_key_order() {
        let a = parse_document("a: 1\nb: [1, 2]\n").expect("parse a");
        let b = parse_document("b: [1, 2]\na: 1\n").expect("parse b");
        assert_eq!(config_digest(&a), config_digest(&b));
        let c = parse_document("b: [2, 1]\na: 1\n").expect("parse c");
        assert_ne!(config_digest(&a), config_digest(&c));
    }

    #[test]
    fn non_mapping_documents_are_rejected() {
        let err = parse_document("- 1\n- 2\n").expect_err("sequence rejected");
        assert!(err.to_string().contains("mapping"));
    }
}
