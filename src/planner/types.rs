//! Plan data types consumed by the execution layer.
use crate::catalog::{Selection, SourceUse};
use crate::category::{Level, SourceRole, StratCategory};
use crate::chrom::ChrIndex;
use crate::naming::{ArtifactId, UniverseKind};
use crate::provenance::{record_provenance, ProvenanceRecord, Software};
use crate::topology::{Haplotype, Topology};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// What the external executor does to produce an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Read declared sources, keep the build's chromosomes, rename them to
    /// the reference convention, then sort and merge.
    Normalize,
    /// Write the inline records from the config.
    Literal,
    /// Compute regions from the reference sequence with an external tool.
    Scan { tool: String },
    Union,
    /// Universe minus the region input.
    Complement,
}

/// An edge of the build graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRef {
    Source { location: String },
    Artifact { path: String },
    Universe { path: String },
    Discovery { id: String },
}

/// A data-dependent fact that may only be settled by running an upstream
/// step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Discovered<T> {
    Known(T),
    Pending,
}

/// Pending or settled fan-out the execution layer must resolve before the
/// graph is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub id: String,
    pub producers: Vec<NodeRef>,
    pub column: u32,
    pub wanted: String,
    pub consumers: Vec<String>,
    pub outcome: Discovered<bool>,
}

/// One derived output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_path: Option<String>,
    pub operation: Operation,
    pub inputs: Vec<NodeRef>,
    /// Chromosomes the artifact is restricted to.
    pub chromosomes: BTreeSet<ChrIndex>,
    /// Valid-region universe the artifact is bounded by.
    pub universe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement_of: Option<String>,
    pub sources: Vec<SourceUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    pub parameters: BTreeMap<String, Value>,
}

/// Valid genome regions for one label, planned as an intermediate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub label: String,
    pub kind: UniverseKind,
    pub path: String,
    pub chromosomes: BTreeSet<ChrIndex>,
    pub inputs: Vec<NodeRef>,
    pub sources: Vec<SourceUse>,
    pub parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairRecord {
    pub region: String,
    pub complement: String,
    pub universe: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OmissionReason {
    AbsentSource { missing: Vec<SourceRole> },
    ChromosomesFiltered { needed: BTreeSet<ChrIndex> },
    MissingPrerequisite { needs: Vec<StratCategory> },
    UnplacedRecord { chr: String, start: u64, end: u64 },
    DiscoveryEmpty { class: String },
}

/// Something the build would have produced but did not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Omission {
    pub category: StratCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub reason: OmissionReason,
}

/// Per-label build outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOutputs {
    pub label: String,
    pub haplotype: Haplotype,
    pub build_dir: String,
    pub checksum_manifest: String,
    pub strat_list: String,
    pub chromosomes: BTreeSet<ChrIndex>,
}

/// Resolved benchmark inputs plus the planned artifacts they are run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    pub bench_vcf: Vec<SourceUse>,
    pub query_vcf: Vec<SourceUse>,
    pub bench_bed: Vec<SourceUse>,
    pub subsets: Vec<String>,
}

/// Comparison against a previously published stratification set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSpec {
    pub other: String,
    pub url: String,
    pub replacements: Vec<(String, String)>,
    pub path_mapper: BTreeMap<String, String>,
    pub ignore_other: Vec<String>,
    pub ignore_generated: Vec<String>,
    /// Levels whose differences are reported but not treated as failures.
    pub tolerate_levels: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub reference: String,
    pub build: String,
    pub topology: Topology,
    pub labels: Vec<LabelOutputs>,
    pub universes: Vec<Universe>,
    pub artifacts: Vec<Artifact>,
    pub pairs: Vec<PairRecord>,
    pub omissions: Vec<Omission>,
    pub discoveries: Vec<Discovery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonSpec>,
}

impl BuildPlan {
    #[cfg(test)]
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts
            .binary_search_by(|artifact| artifact.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.artifacts[idx])
    }

    /// Artifact inputs naming an artifact, universe, or discovery that this
    /// build does not plan.
    #[cfg(test)]
    pub fn dangling_inputs(&self) -> Vec<(&str, &NodeRef)> {
        let mut dangling = Vec::new();
        for artifact in &self.artifacts {
            for input in &artifact.inputs {
                let known = match input {
                    NodeRef::Source { .. } => true,
                    NodeRef::Artifact { path } => self.artifact(path).is_some(),
                    NodeRef::Universe { path } => {
                        self.universes.iter().any(|universe| &universe.path == path)
                    }
                    NodeRef::Discovery { id } => {
                        self.discoveries.iter().any(|discovery| &discovery.id == id)
                    }
                };
                if !known {
                    dangling.push((artifact.path.as_str(), input));
                }
            }
        }
        dangling
    }
}

/// Complete, immutable output of one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub software: Software,
    pub config_digest: String,
    pub results_dir: String,
    pub builds: Vec<BuildPlan>,
}

impl Plan {
    /// Every artifact path (and indexed variant), sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .artifacts()
            .flat_map(|artifact| {
                std::iter::once(artifact.path.as_str()).chain(artifact.indexed_path.as_deref())
            })
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.builds.iter().flat_map(|build| build.artifacts.iter())
    }

    #[cfg(test)]
    pub fn find_build(&self, reference: &str, build: &str) -> Option<&BuildPlan> {
        self.builds
            .iter()
            .find(|plan| plan.reference == reference && plan.build == build)
    }

    /// Provenance for every artifact, keyed by path.
    pub fn provenance(&self) -> BTreeMap<String, ProvenanceRecord> {
        self.artifacts()
            .map(|artifact| {
                (
                    artifact.path.clone(),
                    record_provenance(artifact, &self.software),
                )
            })
            .collect()
    }
}
