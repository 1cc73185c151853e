//! Per-reference source catalog.
//!
//! Resolves which declared inputs back each category, checks declared
//! checksums against observed ones, and turns a declared source into the
//! concrete file uses (with chromosome conversions) for one output view.
use crate::category::{SourceRole, StratCategory};
use crate::chrom::{ChrConversion, ChrIndex, ChrNameMapper, ChrPattern};
use crate::errors::PlanError;
use crate::model::{
    BedInput, BedParams, FunctionalInputs, Location, MappabilityInputs, OtherData, Reference,
    SourceFile, SourceSet, XyInputs,
};
use crate::topology::{Haplotype, OutputView, Parent, SourceHandling};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Rmsk class that marks satellite repeats.
pub const SATELLITE_CLASS: &str = "Satellite";

/// Results of the external download/inspection collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Observations {
    /// Observed MD5 of decompressed content, keyed by source location.
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
    /// Distinct class-column values seen in each repeat-masker source.
    #[serde(default)]
    pub rmsk_classes: BTreeMap<String, BTreeSet<String>>,
}

/// Which alternative supplied an input with more than one possible source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Explicit { role: SourceRole },
    FromRmsk { class_col: u32, class: String },
}

/// Satellite input of the low-complexity category.
#[derive(Debug, Clone, Copy)]
pub enum SatelliteSource<'a> {
    Explicit(&'a BedInput),
    FromRmsk { rmsk: &'a BedInput, class_col: u32 },
}

impl SatelliteSource<'_> {
    pub fn selection(&self) -> Selection {
        match self {
            SatelliteSource::Explicit(_) => Selection::Explicit {
                role: SourceRole::Satellites,
            },
            SatelliteSource::FromRmsk { class_col, .. } => Selection::FromRmsk {
                class_col: *class_col,
                class: SATELLITE_CLASS.to_string(),
            },
        }
    }
}

/// Declared inputs of one category.
#[derive(Debug, Clone, Copy)]
pub enum CategoryInputs<'a> {
    /// Only the reference sequence is needed.
    Sequence,
    Gap(&'a BedInput),
    LowComplexity {
        rmsk: &'a BedInput,
        simreps: &'a BedInput,
        satellites: SatelliteSource<'a>,
    },
    Xy(&'a XyInputs),
    Segdups(&'a BedInput),
    Functional(&'a FunctionalInputs),
    Mappability(&'a MappabilityInputs),
}

#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    Present(CategoryInputs<'a>),
    Absent { missing: Vec<SourceRole> },
}

/// One concrete file consumed for one output view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUse {
    pub role: SourceRole,
    /// Haplotype tag of the file as declared.
    pub haplotype: Haplotype,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BedParams>,
    pub handling: SourceHandling,
    pub conversion: ChrConversion,
}

#[derive(Debug, Clone)]
pub struct SourceCatalog<'a> {
    reference: &'a Reference,
    observed: BTreeMap<String, String>,
    rmsk_classes: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> SourceCatalog<'a> {
    /// Build the catalog and report every declared checksum that disagrees
    /// with an observed one.
    pub fn new(reference: &'a Reference, observations: &Observations) -> (Self, Vec<PlanError>) {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        for file in declared_files(reference) {
            let location = file.location.as_str();
            if !seen.insert(location.to_string()) {
                continue;
            }
            let (Some(declared), Some(observed)) = (&file.md5, observations.checksums.get(location))
            else {
                continue;
            };
            if !declared.eq_ignore_ascii_case(observed) {
                errors.push(PlanError::ChecksumMismatch {
                    location: location.to_string(),
                    declared: declared.clone(),
                    observed: observed.to_ascii_lowercase(),
                });
            }
        }
        let observed = observations
            .checksums
            .iter()
            .map(|(location, digest)| (location.clone(), digest.to_ascii_lowercase()))
            .collect();
        let catalog = Self {
            reference,
            observed,
            rmsk_classes: observations.rmsk_classes.clone(),
        };
        (catalog, errors)
    }

    pub fn reference(&self) -> &'a Reference {
        self.reference
    }

    /// Resolve the inputs of one category, or `Absent` with the roles that
    /// would have backed it.
    pub fn resolve(&self, category: StratCategory) -> Resolution<'a> {
        let inputs = &self.reference.inputs;
        let present = match category {
            StratCategory::Gap => inputs.gap.as_ref().map(CategoryInputs::Gap),
            StratCategory::LowComplexity => inputs.low_complexity.as_ref().map(|low| {
                let satellites = match (&low.satellites, low.rmsk.params.class_col) {
                    (Some(explicit), _) => SatelliteSource::Explicit(explicit),
                    (None, Some(class_col)) => SatelliteSource::FromRmsk {
                        rmsk: &low.rmsk,
                        class_col,
                    },
                    // validation guarantees a class column on rmsk
                    (None, None) => SatelliteSource::FromRmsk {
                        rmsk: &low.rmsk,
                        class_col: 0,
                    },
                };
                CategoryInputs::LowComplexity {
                    rmsk: &low.rmsk,
                    simreps: &low.simreps,
                    satellites,
                }
            }),
            StratCategory::Xy => inputs
                .xy
                .as_ref()
                .filter(|xy| xy.features.is_some() || xy.x_par.is_some() || xy.y_par.is_some())
                .map(CategoryInputs::Xy),
            StratCategory::Segdups => inputs.segdups.as_ref().map(CategoryInputs::Segdups),
            StratCategory::Functional
            | StratCategory::Vdj
            | StratCategory::Kir
            | StratCategory::Mhc => inputs.functional.as_ref().map(CategoryInputs::Functional),
            StratCategory::Mappability => {
                inputs.mappability.as_ref().map(CategoryInputs::Mappability)
            }
            StratCategory::Gc
            | StratCategory::Telomere
            | StratCategory::Union
            | StratCategory::Other
            | StratCategory::Diploid => Some(CategoryInputs::Sequence),
        };
        match present {
            Some(inputs) => Resolution::Present(inputs),
            None => Resolution::Absent {
                missing: category.source_roles().to_vec(),
            },
        }
    }

    /// Classes observed in a repeat-masker source, if the collaborator has
    /// reported them yet.
    pub fn rmsk_classes(&self, rmsk: &BedInput) -> Option<BTreeSet<String>> {
        let mut found: Option<BTreeSet<String>> = None;
        for file in rmsk.sources.files() {
            let classes = self.rmsk_classes.get(file.location.as_str())?;
            found.get_or_insert_with(BTreeSet::new).extend(classes.iter().cloned());
        }
        found
    }

    /// Uses of the reference sequence itself for one view.
    pub fn sequence_uses(
        &self,
        view: &OutputView,
        chromosomes: &BTreeSet<ChrIndex>,
    ) -> Vec<SourceUse> {
        self.uses(SourceRole::Reference, &self.reference.sequence, None, view, chromosomes)
    }

    /// Uses of a bed-like input for one view.
    pub fn input_uses(
        &self,
        role: SourceRole,
        input: &BedInput,
        view: &OutputView,
        chromosomes: &BTreeSet<ChrIndex>,
    ) -> Vec<SourceUse> {
        self.uses(role, &input.sources, Some(&input.params), view, chromosomes)
    }

    fn uses(
        &self,
        role: SourceRole,
        sources: &SourceSet,
        params: Option<&BedParams>,
        view: &OutputView,
        chromosomes: &BTreeSet<ChrIndex>,
    ) -> Vec<SourceUse> {
        let topology = self.reference.topology;
        let handling = topology
            .accepts(sources.shape())
            .unwrap_or(SourceHandling::Direct);
        let parents = view_parents(view.haplotype);
        let make = |haplotype: Haplotype, file: &SourceFile, conversion: ChrConversion| SourceUse {
            role,
            haplotype,
            location: file.location.clone(),
            md5: file.md5.clone(),
            observed_md5: self.observed.get(file.location.as_str()).cloned(),
            params: params.cloned(),
            handling,
            conversion,
        };
        match sources {
            SourceSet::Hap(hap) => {
                let conversion =
                    self.conversion(&parents, chromosomes, |_| Some(hap.pattern.clone()));
                vec![make(Haplotype::Hap, &hap.file, conversion)]
            }
            SourceSet::Dip(dip) => {
                let conversion = self.conversion(&parents, chromosomes, |parent| {
                    parent.map(|parent| dip.pattern.for_parent(parent))
                });
                vec![make(Haplotype::Dip, &dip.file, conversion)]
            }
            SourceSet::Split(split) => parents
                .iter()
                .filter_map(|parent| *parent)
                .map(|parent| {
                    let half = split.get(parent);
                    let conversion = self.conversion(&[Some(parent)], chromosomes, |_| {
                        Some(half.pattern.clone())
                    });
                    make(parent.haplotype(), &half.file, conversion)
                })
                .collect(),
        }
    }

    fn conversion(
        &self,
        parents: &[Option<Parent>],
        chromosomes: &BTreeSet<ChrIndex>,
        source_pattern: impl Fn(Option<Parent>) -> Option<ChrPattern>,
    ) -> ChrConversion {
        let mut conversion = ChrConversion::default();
        for parent in parents.iter().copied() {
            let (Some(source), Some(target)) = (
                source_pattern(parent),
                reference_pattern(&self.reference.sequence, parent),
            ) else {
                continue;
            };
            let haplotype = parent.map_or(Haplotype::Hap, Parent::haplotype);
            conversion.extend(ChrConversion::compose(
                &ChrNameMapper::new(source),
                &ChrNameMapper::new(target),
                chromosomes,
                haplotype,
            ));
        }
        conversion
    }
}

/// Parental haplotypes behind one view; `None` stands for a haploid copy.
pub fn view_parents(haplotype: Haplotype) -> Vec<Option<Parent>> {
    match haplotype {
        Haplotype::Hap => vec![None],
        Haplotype::Dip => Parent::BOTH.iter().copied().map(Some).collect(),
        other => vec![other.parent()],
    }
}

/// Naming convention of the reference for one parental haplotype.
pub fn reference_pattern(sequence: &SourceSet, parent: Option<Parent>) -> Option<ChrPattern> {
    match (sequence, parent) {
        (SourceSet::Hap(hap), _) => Some(hap.pattern.clone()),
        (_, Some(parent)) => Some(sequence.parent_pattern(parent)),
        (_, None) => None,
    }
}

/// Chromosome indices the reference names for one view.
pub fn view_chromosomes(sequence: &SourceSet, haplotype: Haplotype) -> BTreeSet<ChrIndex> {
    view_parents(haplotype)
        .into_iter()
        .filter_map(|parent| reference_pattern(sequence, parent))
        .flat_map(|pattern| pattern.defined())
        .collect()
}

/// Every source file declared under a reference, including build-level ones.
pub fn declared_files(reference: &Reference) -> Vec<&SourceFile> {
    let mut files = reference.sequence.files();
    let inputs = &reference.inputs;
    let mut beds: Vec<&BedInput> = Vec::new();
    beds.extend(inputs.gap.as_ref());
    if let Some(low) = &inputs.low_complexity {
        beds.push(&low.rmsk);
        beds.push(&low.simreps);
        beds.extend(low.satellites.as_ref());
    }
    if let Some(features) = inputs.xy.as_ref().and_then(|xy| xy.features.as_ref()) {
        beds.push(&features.x_bed);
        beds.push(&features.y_bed);
    }
    beds.extend(inputs.segdups.as_ref());
    if let Some(functional) = &inputs.functional {
        beds.push(&functional.ftbl);
        beds.push(&functional.gff);
    }
    for build in reference.builds.values() {
        for strat in build.other_strats.values().flat_map(|strats| strats.values()) {
            if let OtherData::Source(input) = &strat.data {
                beds.push(input);
            }
        }
        if let Some(bench) = &build.bench {
            beds.push(&bench.bench_vcf);
            beds.push(&bench.query_vcf);
            beds.push(&bench.bench_bed);
        }
    }
    files.extend(beds.into_iter().flat_map(|input| input.sources.files()));
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HapSource, LowComplexityInputs, StratInputs};
    use crate::topology::{PerParent, Topology};

    fn file(location: &str, md5: Option<&str>) -> SourceFile {
        SourceFile {
            location: Location::Url(location.to_string()),
            md5: md5.map(str::to_string),
        }
    }

    fn hap_input(location: &str, pattern: ChrPattern, class_col: Option<u32>) -> BedInput {
        BedInput {
            sources: SourceSet::Hap(HapSource {
                file: file(location, None),
                pattern,
            }),
            params: BedParams {
                class_col,
                ..BedParams::default()
            },
        }
    }

    fn haploid_reference() -> Reference {
        Reference {
            key: "GRCh38".to_string(),
            topology: Topology::Haploid,
            sequence: SourceSet::Hap(HapSource {
                file: file("ref.fa.gz", Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
                pattern: ChrPattern::default(),
            }),
            inputs: StratInputs {
                low_complexity: Some(LowComplexityInputs {
                    rmsk: hap_input(
                        "rmsk.txt.gz",
                        ChrPattern {
                            template: "%i".to_string(),
                            ..ChrPattern::default()
                        },
                        Some(11),
                    ),
                    simreps: hap_input("simreps.txt.gz", ChrPattern::default(), None),
                    satellites: None,
                }),
                ..StratInputs::default()
            },
            builds: BTreeMap::new(),
        }
    }

    fn chromosomes(values: &[u32]) -> BTreeSet<ChrIndex> {
        values.iter().filter_map(|value| ChrIndex::new(*value)).collect()
    }

    #[test]
    fn checksum_mismatch_is_reported() {
        let reference = haploid_reference();
        let observations = Observations {
            checksums: BTreeMap::from([(
                "ref.fa.gz".to_string(),
                "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            )]),
            ..Observations::default()
        };
        let (_, errors) = SourceCatalog::new(&reference, &observations);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PlanError::ChecksumMismatch { .. }));
    }

    #[test]
    fn matching_checksums_are_recorded() {
        let reference = haploid_reference();
        let observations = Observations {
            checksums: BTreeMap::from([(
                "ref.fa.gz".to_string(),
                "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
            )]),
            ..Observations::default()
        };
        let (catalog, errors) = SourceCatalog::new(&reference, &observations);
        assert!(errors.is_empty());
        let view = OutputView::new("GRCh38", Haplotype::Hap);
        let uses = catalog.sequence_uses(&view, &chromosomes(&[21]));
        assert_eq!(
            uses[0].observed_md5.as_deref(),
            Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        );
    }

    #[test]
    fn missing_categories_resolve_absent() {
        let reference = haploid_reference();
        let (catalog, _) = SourceCatalog::new(&reference, &Observations::default());
        match catalog.resolve(StratCategory::Segdups) {
            Resolution::Absent { missing } => assert_eq!(missing, vec![SourceRole::Superdups]),
            other => panic!("expected absent, got {other:?}"),
        }
        assert!(matches!(
            catalog.resolve(StratCategory::Gc),
            Resolution::Present(CategoryInputs::Sequence)
        ));
    }

    #[test]
    fn satellites_fall_back_to_rmsk_class_column() {
        let reference = haploid_reference();
        let (catalog, _) = SourceCatalog::new(&reference, &Observations::default());
        let Resolution::Present(CategoryInputs::LowComplexity { satellites, .. }) =
            catalog.resolve(StratCategory::LowComplexity)
        else {
            panic!("low complexity should resolve");
        };
        assert_eq!(
            satellites.selection(),
            Selection::FromRmsk {
                class_col: 11,
                class: SATELLITE_CLASS.to_string()
            }
        );
    }

    #[test]
    fn source_names_are_converted_through_the_reference() {
        let reference = haploid_reference();
        let (catalog, _) = SourceCatalog::new(&reference, &Observations::default());
        let Some(low) = &reference.inputs.low_complexity else {
            panic!("low complexity declared");
        };
        let view = OutputView::new("GRCh38", Haplotype::Hap);
        let uses = catalog.input_uses(SourceRole::Rmsk, &low.rmsk, &view, &chromosomes(&[21, 22]));
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].conversion.translate("21"), Some("chr21"));
        assert_eq!(uses[0].conversion.translate("1"), None);
    }

    #[test]
    fn split_sources_feed_matching_parent_views() {
        let half = |location: &str, parent| HapSource {
            file: file(location, None),
            pattern: ChrPattern::parent_default(parent),
        };
        let reference = Reference {
            key: "HG002".to_string(),
            topology: Topology::Diploid2,
            sequence: SourceSet::Split(PerParent {
                pat: half("pat.fa.gz", Parent::Pat),
                mat: half("mat.fa.gz", Parent::Mat),
            }),
            inputs: StratInputs::default(),
            builds: BTreeMap::new(),
        };
        let (catalog, _) = SourceCatalog::new(&reference, &Observations::default());
        let pat_view = OutputView::new("HG002_pat", Haplotype::Pat);
        let uses = catalog.sequence_uses(&pat_view, &chromosomes(&[1, 23, 24]));
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].haplotype, Haplotype::Pat);
        // paternal haplotype has no X
        assert_eq!(uses[0].conversion.entries.len(), 2);

        let merged = OutputView::new("HG002", Haplotype::Dip);
        let uses = catalog.sequence_uses(&merged, &chromosomes(&[1]));
        assert_eq!(uses.len(), 2);
        assert_eq!(
            view_chromosomes(&reference.sequence, Haplotype::Pat).len(),
            23
        );
    }
}
