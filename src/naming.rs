//! Deterministic output paths.
//!
//! Every path is a pure function of an artifact's identity, so two plans of
//! the same config name the same files no matter how they were resolved.
use crate::category::{Level, StratCategory};
use crate::topology::Haplotype;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FINAL_DIR: &str = "final";
pub const INTERMEDIATES_DIR: &str = "intermediates";
pub const BED_SUFFIX: &str = ".bed.gz";
pub const INDEXED_SUFFIX: &str = ".bb";

/// Identity of one derived artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId {
    pub reference: String,
    pub build: String,
    /// Output label, e.g. `GRCh38` or `HG002_pat`.
    pub label: String,
    pub haplotype: Haplotype,
    pub category: StratCategory,
    pub level: Level,
    /// Self-describing name, e.g. `SimpleRepeat_diTR_11to50_slop5`.
    pub name: String,
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}_{}",
            self.reference, self.build, self.level, self.label, self.name
        )
    }
}

/// Valid-region universe flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseKind {
    /// Gaps removed; for haploid references also the Y PAR.
    Auto,
    /// Gaps removed only; used by the sex-chromosome artifacts.
    ParY,
}

impl UniverseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UniverseKind::Auto => "auto",
            UniverseKind::ParY => "parY",
        }
    }
}

/// Path layout under one results directory.
#[derive(Debug, Clone)]
pub struct PathNamer {
    results_dir: String,
}

impl PathNamer {
    /// Create a namer rooted at `results_dir` (trailing slashes ignored).
    pub fn new(results_dir: &str) -> Self {
        Self {
            results_dir: results_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Return the results root used for path derivation.
    pub fn results_dir(&self) -> &str {
        &self.results_dir
    }

    /// Return the `final/<label>@<build>` directory.
    pub fn build_dir(&self, label: &str, build: &str) -> String {
        format!("{}/{FINAL_DIR}/{label}@{build}", self.results_dir)
    }

    /// Return the `<Level>/<label>_<name>.bed.gz` path of an artifact.
    pub fn name(&self, id: &ArtifactId) -> String {
        format!(
            "{}/{}",
            self.build_dir(&id.label, &id.build),
            relative_name(id)
        )
    }

    /// Return the `.bb` variant of an artifact path.
    pub fn indexed(&self, id: &ArtifactId) -> String {
        let bed = self.name(id);
        let stem = bed.strip_suffix(BED_SUFFIX).unwrap_or(&bed);
        format!("{stem}{INDEXED_SUFFIX}")
    }

    /// Return the valid-region universe path for one label.
    pub fn universe(&self, label: &str, build: &str, kind: UniverseKind) -> String {
        format!(
            "{}/{INTERMEDIATES_DIR}/{label}@{build}/ref/valid_regions_{}{BED_SUFFIX}",
            self.results_dir,
            kind.as_str()
        )
    }

    /// Return the per-label checksum manifest path.
    pub fn checksum_manifest(&self, label: &str, build: &str) -> String {
        format!(
            "{}/{label}-genome-stratifications-sha256.txt",
            self.build_dir(label, build)
        )
    }

    /// Return the per-label stratification list path.
    pub fn strat_list(&self, label: &str, build: &str) -> String {
        format!(
            "{}/{label}-all-stratifications.tsv",
            self.build_dir(label, build)
        )
    }
}

/// Path of an artifact relative to its build directory.
pub fn relative_name(id: &ArtifactId) -> String {
    format!("{}/{}_{}{BED_SUFFIX}", id.level, id.label, id.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ArtifactId {
        ArtifactId {
            reference: "GRCh38".to_string(),
            build: "default".to_string(),
            label: "GRCh38".to_string(),
            haplotype: Haplotype::Hap,
            category: StratCategory::LowComplexity,
            level: Level::LowComplexity,
            name: name.to_string(),
        }
    }

    #[test]
    fn artifact_paths_embed_level_label_and_name() {
        let namer = PathNamer::new("results/");
        assert_eq!(
            namer.name(&id("SimpleRepeat_diTR_11to50_slop5")),
            "results/final/GRCh38@default/LowComplexity/GRCh38_SimpleRepeat_diTR_11to50_slop5.bed.gz"
        );
        assert_eq!(
            namer.indexed(&id("satellites_slop5")),
            "results/final/GRCh38@default/LowComplexity/GRCh38_satellites_slop5.bb"
        );
    }

    #[test]
    fn build_outputs_live_in_the_build_dir() {
        let namer = PathNamer::new("out");
        assert_eq!(
            namer.universe("HG002_pat", "draft", UniverseKind::ParY),
            "out/intermediates/HG002_pat@draft/ref/valid_regions_parY.bed.gz"
        );
        assert_eq!(
            namer.checksum_manifest("HG002_pat", "draft"),
            "out/final/HG002_pat@draft/HG002_pat-genome-stratifications-sha256.txt"
        );
        assert_eq!(
            namer.strat_list("HG002", "draft"),
            "out/final/HG002@draft/HG002-all-stratifications.tsv"
        );
    }

    #[test]
    fn distinct_names_give_distinct_paths() {
        let namer = PathNamer::new("results");
        assert_ne!(namer.name(&id("a")), namer.name(&id("b")));
        let mut other = id("a");
        other.build = "other".to_string();
        assert_ne!(namer.name(&id("a")), namer.name(&other));
    }
}
