//! Provenance records and their digests.
//!
//! A record ties an artifact to the exact sources, conversions, and
//! parameters that produce it. The digest covers everything except the
//! execution status and the software identity, so two plans can be diffed
//! across releases and a re-run that changes nothing keeps its digest.
use crate::catalog::{Selection, SourceUse};
use crate::naming::ArtifactId;
use crate::planner::{Artifact, NodeRef, Operation, Plan};
use crate::util::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    pub name: String,
    pub version: String,
}

impl Software {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Execution outcome reported back by the execution layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Planned,
    Succeeded,
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub path: String,
    pub artifact: ArtifactId,
    pub operation: Operation,
    pub inputs: Vec<NodeRef>,
    pub sources: Vec<SourceUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    pub parameters: BTreeMap<String, Value>,
    pub software: Software,
    pub digest: String,
    #[serde(default)]
    pub status: ExecutionStatus,
}

#[derive(Serialize)]
struct DigestView<'a> {
    path: &'a str,
    artifact: &'a ArtifactId,
    operation: &'a Operation,
    inputs: &'a [NodeRef],
    sources: &'a [SourceUse],
    selection: &'a Option<Selection>,
    parameters: &'a BTreeMap<String, Value>,
}

impl ProvenanceRecord {
    /// Digest of the content-defining fields.
    pub fn compute_digest(&self) -> String {
        let view = DigestView {
            path: &self.path,
            artifact: &self.artifact,
            operation: &self.operation,
            inputs: &self.inputs,
            sources: &self.sources,
            selection: &self.selection,
            parameters: &self.parameters,
        };
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        sha256_hex(&bytes)
    }
}

/// Build the provenance record of a planned artifact.
pub fn record_provenance(artifact: &Artifact, software: &Software) -> ProvenanceRecord {
    let mut record = ProvenanceRecord {
        path: artifact.path.clone(),
        artifact: artifact.id.clone(),
        operation: artifact.operation.clone(),
        inputs: artifact.inputs.clone(),
        sources: artifact.sources.clone(),
        selection: artifact.selection.clone(),
        parameters: artifact.parameters.clone(),
        software: software.clone(),
        digest: String::new(),
        status: ExecutionStatus::Planned,
    };
    record.digest = record.compute_digest();
    record
}

/// Differences between the provenance of two plans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub unchanged: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software: Option<(Software, Software)>,
}

impl ProvenanceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

pub fn diff_plans(old: &Plan, new: &Plan) -> ProvenanceDiff {
    let mut diff = diff_provenance(&old.provenance(), &new.provenance());
    if old.software != new.software {
        diff.software = Some((old.software.clone(), new.software.clone()));
    }
    diff
}

pub fn diff_provenance(
    old: &BTreeMap<String, ProvenanceRecord>,
    new: &BTreeMap<String, ProvenanceRecord>,
) -> ProvenanceDiff {
    let mut diff = ProvenanceDiff::default();
    for (path, record) in new {
        match old.get(path) {
            None => diff.added.push(path.clone()),
            Some(previous) if previous.digest != record.digest => diff.changed.push(path.clone()),
            Some(_) => diff.unchanged += 1,
        }
    }
    diff.removed = old
        .keys()
        .filter(|path| !new.contains_key(*path))
        .cloned()
        .collect();
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Level, StratCategory};
    use crate::naming::PathNamer;
    use crate::topology::Haplotype;
    use std::collections::BTreeSet;

    fn artifact(name: &str, slop: u64) -> Artifact {
        let id = ArtifactId {
            reference: "GRCh38".to_string(),
            build: "default".to_string(),
            label: "GRCh38".to_string(),
            haplotype: Haplotype::Hap,
            category: StratCategory::Telomere,
            level: Level::Telomere,
            name: name.to_string(),
        };
        let namer = PathNamer::new("results");
        Artifact {
            path: namer.name(&id),
            id,
            indexed_path: None,
            operation: Operation::Scan {
                tool: "telomeres".to_string(),
            },
            inputs: Vec::new(),
            chromosomes: BTreeSet::new(),
            universe: "u".to_string(),
            complement_of: None,
            sources: Vec::new(),
            selection: None,
            parameters: BTreeMap::from([("slop".to_string(), Value::from(slop))]),
        }
    }

    fn index(artifacts: &[Artifact]) -> BTreeMap<String, ProvenanceRecord> {
        artifacts
            .iter()
            .map(|artifact| {
                (
                    artifact.path.clone(),
                    record_provenance(artifact, &Software::current()),
                )
            })
            .collect()
    }

    #[test]
    fn digest_ignores_status_and_software() {
        let mut record = record_provenance(&artifact("telomeres", 0), &Software::current());
        let digest = record.digest.clone();
        record.status = ExecutionStatus::Failed {
            message: "tool exited 1".to_string(),
        };
        record.software.version = "9.9.9".to_string();
        assert_eq!(record.compute_digest(), digest);
        record.parameters.insert("slop".to_string(), Value::from(5));
        assert_ne!(record.compute_digest(), digest);
    }

    #[test]
    fn diff_reports_added_removed_and_changed() {
        let old = index(&[artifact("a", 0), artifact("b", 0)]);
        let new = index(&[artifact("b", 5), artifact("c", 0)]);
        let diff = diff_provenance(&old, &new);
        assert_eq!(diff.added.len(), 1);
        assert!(diff.added[0].ends_with("GRCh38_c.bed.gz"));
        assert!(diff.removed[0].ends_with("GRCh38_a.bed.gz"));
        assert!(diff.changed[0].ends_with("GRCh38_b.bed.gz"));
        assert_eq!(diff.unchanged, 0);
        assert!(diff_provenance(&old, &old).is_empty());
    }

    #[test]
    fn status_serializes_as_tagged_state() {
        let json = serde_json::to_value(ExecutionStatus::Failed {
            message: "missing".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "missing");
    }
}
