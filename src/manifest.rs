//! Checksum manifests, stratification lists, and execution status.
//!
//! Runs after the execution layer: only artifacts whose files exist under
//! the root are listed, and every planned artifact gets a status.
use crate::naming::relative_name;
use crate::output::write_text;
use crate::planner::{Artifact, Plan};
use crate::provenance::{ExecutionStatus, ProvenanceRecord};
use crate::util::sha256_hex;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// What `write_manifests` produced for one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelManifest {
    pub label: String,
    pub build: String,
    pub checksum_manifest: String,
    pub strat_list: String,
    pub listed: usize,
    pub missing: Vec<String>,
}

fn label_artifacts<'a>(plan: &'a Plan, build: &str, label: &str) -> Vec<&'a Artifact> {
    let mut artifacts: Vec<&Artifact> = plan
        .artifacts()
        .filter(|artifact| artifact.id.build == build && artifact.id.label == label)
        .collect();
    artifacts.sort_by(|a, b| relative_name(&a.id).cmp(&relative_name(&b.id)));
    artifacts
}

/// Write the checksum manifest and stratification list of every label,
/// resolving plan paths against `root`.
pub fn write_manifests(plan: &Plan, root: &Path) -> Result<Vec<LabelManifest>> {
    let mut written = Vec::new();
    for build in &plan.builds {
        for label in &build.labels {
            let mut checksums = String::new();
            let mut listing = String::new();
            let mut missing = Vec::new();
            let mut listed = 0;
            for artifact in label_artifacts(plan, &build.build, &label.label) {
                let file = root.join(&artifact.path);
                if !file.is_file() {
                    missing.push(artifact.path.clone());
                    continue;
                }
                let bytes =
                    fs::read(&file).with_context(|| format!("read {}", file.display()))?;
                let relative = relative_name(&artifact.id);
                checksums.push_str(&format!("{}  {relative}\n", sha256_hex(&bytes)));
                listing.push_str(&format!("{}\t{relative}\n", artifact.id.level));
                listed += 1;
            }
            write_text(&root.join(&label.checksum_manifest), &checksums)?;
            write_text(&root.join(&label.strat_list), &listing)?;
            tracing::info!(
                label = %label.label,
                build = %build.build,
                listed,
                missing = missing.len(),
                "wrote manifests"
            );
            written.push(LabelManifest {
                label: label.label.clone(),
                build: build.build.clone(),
                checksum_manifest: label.checksum_manifest.clone(),
                strat_list: label.strat_list.clone(),
                listed,
                missing,
            });
        }
    }
    Ok(written)
}

/// Provenance of every artifact with its status settled from the files
/// present under `root`.
pub fn settle_statuses(plan: &Plan, root: &Path) -> BTreeMap<String, ProvenanceRecord> {
    let mut records = plan.provenance();
    for (path, record) in records.iter_mut() {
        record.status = if root.join(path).is_file() {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed {
                message: "output not found after execution".to_string(),
            }
        };
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Observations;
    use crate::config::{parse_document, validate};
    use crate::planner::plan;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
haploid_stratifications:
  GRCh38:
    ref:
      hap: {url: https://example.org/GRCh38.fa.gz}
    builds:
      default:
        chr_filter: [21]
        include:
          mappability: []
          gc: false
"#;

    fn small_plan() -> Plan {
        let doc = parse_document(CONFIG).expect("parse");
        let config = validate(&doc).expect("valid");
        plan(&config, &Observations::default()).expect("plan")
    }

    #[test]
    fn manifests_list_existing_outputs_only() {
        let plan = small_plan();
        let dir = TempDir::new().expect("tempdir");
        let telomeres = plan
            .artifacts()
            .find(|artifact| artifact.id.name == "telomeres")
            .expect("telomeres planned");
        let file = dir.path().join(&telomeres.path);
        fs::create_dir_all(file.parent().expect("parent")).expect("mkdir");
        fs::write(&file, b"chr21\t0\t100\n").expect("write output");

        let written = write_manifests(&plan, dir.path()).expect("manifests");
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].listed, 1);

        let listing = fs::read_to_string(dir.path().join(&written[0].strat_list)).expect("list");
        assert_eq!(listing, "Telomere\tTelomere/GRCh38_telomeres.bed.gz\n");
        let checksums =
            fs::read_to_string(dir.path().join(&written[0].checksum_manifest)).expect("sha");
        assert!(checksums.ends_with("  Telomere/GRCh38_telomeres.bed.gz\n"));
        assert_eq!(checksums.split_whitespace().next().map(str::len), Some(64));

        let statuses = settle_statuses(&plan, dir.path());
        assert_eq!(statuses[&telomeres.path].status, ExecutionStatus::Succeeded);
        assert!(statuses
            .values()
            .filter(|record| record.path != telomeres.path)
            .all(|record| matches!(record.status, ExecutionStatus::Failed { .. })));
    }
}
