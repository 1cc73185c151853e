//! Region/complement pairs.
//!
//! A complement only comes into existence through `mutual_pair`, which builds
//! it from its region, so the two always share chromosomes and universe.
use crate::errors::PlanError;
use crate::naming::{ArtifactId, PathNamer};
use crate::planner::{Artifact, NodeRef, Operation, PairRecord};
use std::collections::BTreeMap;

pub const COMPLEMENT_PREFIX: &str = "notin";

/// A region artifact and its complement within the valid genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualPair {
    pub region: Artifact,
    pub complement: Artifact,
}

impl MutualPair {
    pub fn record(&self) -> PairRecord {
        PairRecord {
            region: self.region.path.clone(),
            complement: self.complement.path.clone(),
            universe: self.region.universe.clone(),
        }
    }

    pub fn verify(&self, universe: &str) -> bool {
        verify(&self.region, &self.complement, universe)
    }
}

/// Default complement name, e.g. `notinsegdups`.
pub fn complement_name(region_name: &str) -> String {
    format!("{COMPLEMENT_PREFIX}{region_name}")
}

/// Derive the complement of `region` and return both members.
pub fn mutual_pair(
    region: Artifact,
    complement_name: &str,
    namer: &PathNamer,
    indexed: bool,
) -> MutualPair {
    let id = ArtifactId {
        name: complement_name.to_string(),
        ..region.id.clone()
    };
    let path = namer.name(&id);
    let indexed_path = indexed.then(|| namer.indexed(&id));
    let complement = Artifact {
        id,
        path,
        indexed_path,
        operation: Operation::Complement,
        inputs: vec![
            NodeRef::Artifact {
                path: region.path.clone(),
            },
            NodeRef::Universe {
                path: region.universe.clone(),
            },
        ],
        chromosomes: region.chromosomes.clone(),
        universe: region.universe.clone(),
        complement_of: Some(region.path.clone()),
        sources: region.sources.clone(),
        selection: region.selection.clone(),
        parameters: BTreeMap::new(),
    };
    MutualPair { region, complement }
}

/// Why a pair breaks the complement contract, if it does.
pub fn violation(region: &Artifact, complement: &Artifact, universe: &str) -> Option<String> {
    if region.universe != universe || complement.universe != universe {
        return Some(format!(
            "universes differ ({} vs {}, expected {universe})",
            region.universe, complement.universe
        ));
    }
    if region.chromosomes != complement.chromosomes {
        return Some("chromosome filters differ".to_string());
    }
    if complement.complement_of.as_deref() != Some(region.path.as_str()) {
        return Some("complement does not point back at its region".to_string());
    }
    let wants = [
        NodeRef::Artifact {
            path: region.path.clone(),
        },
        NodeRef::Universe {
            path: universe.to_string(),
        },
    ];
    if complement.operation != Operation::Complement
        || !wants.iter().all(|node| complement.inputs.contains(node))
    {
        return Some("complement is not derived from region and universe".to_string());
    }
    None
}

/// `true` when both members share the given universe and chromosome filter
/// and the complement is derived from the region.
pub fn verify(region: &Artifact, complement: &Artifact, universe: &str) -> bool {
    violation(region, complement, universe).is_none()
}

/// Check a recorded pair against the artifacts it names.
pub fn check_record<'a>(
    record: &PairRecord,
    lookup: impl Fn(&str) -> Option<&'a Artifact>,
) -> Result<(), PlanError> {
    let fail = |reason: String| PlanError::MutualPairViolation {
        region: record.region.clone(),
        complement: record.complement.clone(),
        reason,
    };
    let (Some(region), Some(complement)) = (lookup(&record.region), lookup(&record.complement))
    else {
        return Err(fail("pair member is missing from the plan".to_string()));
    };
    match violation(region, complement, &record.universe) {
        Some(reason) => Err(fail(reason)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Level, StratCategory};
    use crate::chrom::ChrIndex;
    use crate::topology::Haplotype;
    use std::collections::BTreeSet;

    fn region() -> Artifact {
        let id = ArtifactId {
            reference: "GRCh38".to_string(),
            build: "default".to_string(),
            label: "GRCh38".to_string(),
            haplotype: Haplotype::Hap,
            category: StratCategory::Segdups,
            level: Level::SegmentalDuplications,
            name: "segdups".to_string(),
        };
        Artifact {
            path: PathNamer::new("results").name(&id),
            id,
            indexed_path: None,
            operation: Operation::Normalize,
            inputs: Vec::new(),
            chromosomes: [21, 22].iter().filter_map(|v| ChrIndex::new(*v)).collect(),
            universe: "results/intermediates/GRCh38@default/ref/valid_regions_auto.bed.gz"
                .to_string(),
            complement_of: None,
            sources: Vec::new(),
            selection: None,
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn pair_shares_universe_and_filter() {
        let region = region();
        let universe = region.universe.clone();
        let pair = mutual_pair(
            region,
            &complement_name("segdups"),
            &PathNamer::new("results"),
            true,
        );
        assert!(pair.verify(&universe));
        assert!(pair
            .complement
            .path
            .ends_with("SegmentalDuplications/GRCh38_notinsegdups.bed.gz"));
        assert!(pair
            .complement
            .indexed_path
            .as_deref()
            .is_some_and(|path| path.ends_with("GRCh38_notinsegdups.bb")));
    }

    #[test]
    fn mismatched_members_are_violations() {
        let region = region();
        let universe = region.universe.clone();
        let mut pair = mutual_pair(region, "notinsegdups", &PathNamer::new("results"), false);
        pair.complement.chromosomes = BTreeSet::new();
        assert!(!pair.verify(&universe));

        let mut pair = mutual_pair(pair.region, "notinsegdups", &PathNamer::new("results"), false);
        pair.complement.universe = "other".to_string();
        let record = pair.record();
        let artifacts = [pair.region.clone(), pair.complement.clone()];
        let err = check_record(&record, |path| {
            artifacts.iter().find(|artifact| artifact.path == path)
        })
        .expect_err("violation");
        assert!(matches!(err, PlanError::MutualPairViolation { .. }));
    }
}
