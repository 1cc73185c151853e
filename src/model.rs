//! Closed, validated configuration model.
//!
//! Produced only by `config::validate`; nothing downstream sees untyped maps.
use crate::chrom::{ChrIndex, ChrPattern, DipChrPattern};
use crate::topology::{Parent, PerParent, SourceShape, Topology};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const DEFAULT_RESULTS_DIR: &str = "results";

pub fn default_other_levels() -> Vec<OtherLevel> {
    [
        "Ancestry",
        "FunctionalTechnicallyDifficult",
        "GenomeSpecific",
        "OtherDifficult",
    ]
    .iter()
    .map(|key| OtherLevel {
        key: key.to_string(),
        desc: String::new(),
    })
    .collect()
}

pub fn default_benchmark_subsets() -> Vec<String> {
    [
        "AllAutosomes",
        "AllTandemRepeats",
        "AllHomopolymers_ge7bp_imperfectge11bp_slop5",
        "SimpleRepeat_diTR_11to50_slop5",
        "SimpleRepeat_homopolymer_7to11_slop5",
        "SimpleRepeat_homopolymer_ge21_slop5",
        "SimpleRepeat_imperfecthomopolge11_slop5",
        "SimpleRepeat_imperfecthomopolge21_slop5",
        "SimpleRepeat_homopolymer_7to11_AT_slop5",
        "SimpleRepeat_homopolymer_ge21_AT_slop5",
        "SimpleRepeat_imperfecthomopolge11_AT_slop5",
        "SimpleRepeat_imperfecthomopolge21_AT_slop5",
        "SimpleRepeat_homopolymer_7to11_GC_slop5",
        "SimpleRepeat_homopolymer_ge21_GC_slop5",
        "SimpleRepeat_imperfecthomopolge11_GC_slop5",
        "SimpleRepeat_imperfecthomopolge21_GC_slop5",
        "alldifficultregions",
        "alllowmapandsegdupregions",
        "chrX_PAR",
        "chrX_XTR",
        "chrY_XTR",
        "notinalldifficultregions",
        "notinAllHomopolymers_ge7bp_imperfectge11bp_slop5",
        "notinAllTandemRepeatsandHomopolymers_slop5",
        "segdups",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub other_levels: Vec<OtherLevel>,
    pub comparison_strats: BTreeMap<String, String>,
    pub benchmark_subsets: Vec<String>,
    pub results_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_dir: Option<String>,
    pub references: BTreeMap<String, Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherLevel {
    pub key: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub key: String,
    pub topology: Topology,
    pub sequence: SourceSet,
    pub inputs: StratInputs,
    pub builds: BTreeMap<String, Build>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Url(String),
    File(String),
}

impl Location {
    pub fn as_str(&self) -> &str {
        match self {
            Location::Url(url) => url,
            Location::File(path) => path,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

/// A single-haplotype file and its naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapSource {
    pub file: SourceFile,
    pub pattern: ChrPattern,
}

/// A combined diploid file and its naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DipSource {
    pub file: SourceFile,
    pub pattern: DipChrPattern,
}

/// Haplotype layout of one declared input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSet {
    Hap(HapSource),
    Dip(DipSource),
    Split(PerParent<HapSource>),
}

impl SourceSet {
    pub fn shape(&self) -> SourceShape {
        match self {
            SourceSet::Hap(_) => SourceShape::Hap,
            SourceSet::Dip(_) => SourceShape::Dip,
            SourceSet::Split(_) => SourceShape::Split,
        }
    }

    pub fn files(&self) -> Vec<&SourceFile> {
        match self {
            SourceSet::Hap(tagged) => vec![&tagged.file],
            SourceSet::Dip(dip) => vec![&dip.file],
            SourceSet::Split(split) => vec![&split.pat.file, &split.mat.file],
        }
    }

    /// Naming convention for one parental haplotype; a haploid source
    /// answers for either parent.
    pub fn parent_pattern(&self, parent: Parent) -> ChrPattern {
        match self {
            SourceSet::Hap(tagged) => tagged.pattern.clone(),
            SourceSet::Dip(dip) => dip.pattern.for_parent(parent),
            SourceSet::Split(split) => split.get(parent).pattern.clone(),
        }
    }

    pub fn defined_chromosomes(&self) -> BTreeSet<ChrIndex> {
        match self {
            SourceSet::Hap(tagged) => tagged.pattern.defined(),
            SourceSet::Dip(dip) => Parent::BOTH
                .iter()
                .flat_map(|parent| dip.pattern.for_parent(*parent).defined())
                .collect(),
            SourceSet::Split(split) => {
                let mut defined = split.pat.pattern.defined();
                defined.extend(split.mat.pattern.defined());
                defined
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedColumns {
    pub chr: u32,
    pub start: u32,
    pub end: u32,
}

impl Default for BedColumns {
    fn default() -> Self {
        Self {
            chr: 0,
            start: 1,
            end: 2,
        }
    }
}

/// Column/format transform applied when reading a bed-like source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedParams {
    pub bed_cols: BedColumns,
    pub sep: String,
    pub skip_lines: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_col: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_col: Option<u32>,
}

impl Default for BedParams {
    fn default() -> Self {
        Self {
            bed_cols: BedColumns::default(),
            sep: "\t".to_string(),
            skip_lines: 0,
            class_col: None,
            level_col: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedInput {
    pub sources: SourceSet,
    pub params: BedParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratInputs {
    pub gap: Option<BedInput>,
    pub low_complexity: Option<LowComplexityInputs>,
    pub xy: Option<XyInputs>,
    pub mappability: Option<MappabilityInputs>,
    pub segdups: Option<BedInput>,
    pub functional: Option<FunctionalInputs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowComplexityInputs {
    pub rmsk: BedInput,
    pub simreps: BedInput,
    pub satellites: Option<BedInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XyInputs {
    pub features: Option<XyFeatures>,
    pub x_par: Option<ParRegions>,
    pub y_par: Option<ParRegions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XyFeatures {
    pub x_bed: BedInput,
    pub y_bed: BedInput,
    pub xtr: bool,
    pub ampliconic: bool,
}

/// The two pseudo-autosomal regions of one sex chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParRegions {
    pub start: (u64, u64),
    pub end: (u64, u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappabilityInputs {
    pub unplaced_chr_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalInputs {
    pub ftbl: BedInput,
    pub gff: BedInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub key: String,
    /// Empty means every chromosome the reference defines.
    pub chr_filter: BTreeSet<ChrIndex>,
    pub include: Include,
    pub other_strats: BTreeMap<String, BTreeMap<String, OtherStrat>>,
    pub bench: Option<Bench>,
    pub comparison: Option<Comparison>,
    pub bigbed: bool,
}

/// Per-category switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Off,
    On,
    Required,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        !matches!(self, Toggle::Off)
    }

    pub fn required(self) -> bool {
        matches!(self, Toggle::Required)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub gaps: Toggle,
    pub low_complexity: Toggle,
    pub xy: Toggle,
    pub segdups: Toggle,
    pub functional: Toggle,
    pub vdj: Toggle,
    pub kir: Toggle,
    pub mhc: Toggle,
    pub telomeres: Toggle,
    pub union: Toggle,
    pub hets: Toggle,
    pub mappability: MappabilityInclude,
    pub gc: GcInclude,
}

impl Include {
    pub fn defaults(topology: Topology) -> Self {
        Self {
            gaps: Toggle::On,
            low_complexity: Toggle::On,
            xy: Toggle::On,
            segdups: Toggle::On,
            functional: Toggle::On,
            vdj: Toggle::On,
            kir: Toggle::On,
            mhc: Toggle::On,
            telomeres: Toggle::On,
            union: Toggle::On,
            hets: if topology.is_diploid() {
                Toggle::On
            } else {
                Toggle::Off
            },
            mappability: MappabilityInclude::default(),
            gc: GcInclude::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LowMapParams {
    pub length: u32,
    pub mismatches: u32,
    pub indels: u32,
}

/// Empty `params` disables mappability entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappabilityInclude {
    pub params: BTreeSet<LowMapParams>,
    pub required: bool,
}

impl Default for MappabilityInclude {
    fn default() -> Self {
        Self {
            params: BTreeSet::from([
                LowMapParams {
                    length: 250,
                    mismatches: 0,
                    indels: 0,
                },
                LowMapParams {
                    length: 100,
                    mismatches: 2,
                    indels: 1,
                },
            ]),
            required: false,
        }
    }
}

/// A GC percentage and whether it bounds a combined meta-range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GcBound {
    pub percent: u32,
    pub range_bound: bool,
}

impl GcBound {
    pub const fn new(percent: u32, range_bound: bool) -> Self {
        Self {
            percent,
            range_bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcParams {
    pub low: Vec<GcBound>,
    pub high: Vec<GcBound>,
}

impl Default for GcParams {
    fn default() -> Self {
        Self {
            low: vec![
                GcBound::new(15, false),
                GcBound::new(20, false),
                GcBound::new(25, true),
                GcBound::new(30, true),
            ],
            high: vec![
                GcBound::new(55, true),
                GcBound::new(60, false),
                GcBound::new(65, true),
                GcBound::new(70, false),
                GcBound::new(75, false),
                GcBound::new(80, false),
                GcBound::new(85, false),
            ],
        }
    }
}

impl GcParams {
    pub fn low_sorted(&self) -> Vec<GcBound> {
        let mut low = self.low.clone();
        low.sort();
        low
    }

    pub fn high_sorted(&self) -> Vec<GcBound> {
        let mut high = self.high.clone();
        high.sort();
        high
    }
}

/// `params: None` disables GC content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcInclude {
    pub params: Option<GcParams>,
    pub required: bool,
}

impl Default for GcInclude {
    fn default() -> Self {
        Self {
            params: Some(GcParams::default()),
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherStrat {
    pub data: OtherData,
    pub description: String,
    pub remove_gaps: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtherData {
    Source(BedInput),
    Literal(Vec<LiteralRecord>),
}

/// An inline interval, chromosome named in the reference's convention.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LiteralRecord {
    pub chr: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bench {
    pub bench_vcf: BedInput,
    pub query_vcf: BedInput,
    pub bench_bed: BedInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub other: String,
    pub replacements: Vec<(String, String)>,
    pub path_mapper: BTreeMap<String, String>,
    pub ignore_other: Vec<String>,
    pub ignore_generated: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hets_default_only_for_diploid() {
        assert_eq!(Include::defaults(Topology::Haploid).hets, Toggle::Off);
        assert_eq!(Include::defaults(Topology::Diploid2).hets, Toggle::On);
    }

    #[test]
    fn default_gc_bounds_are_balanced() {
        let gc = GcParams::default();
        let low = gc.low.iter().filter(|bound| bound.range_bound).count();
        let high = gc.high.iter().filter(|bound| bound.range_bound).count();
        assert_eq!(low, high);
    }

    #[test]
    fn split_reference_defines_union_of_parents() {
        let split = SourceSet::Split(PerParent {
            pat: HapSource {
                file: SourceFile {
                    location: Location::File("pat.fa.gz".to_string()),
                    md5: None,
                },
                pattern: ChrPattern::parent_default(Parent::Pat),
            },
            mat: HapSource {
                file: SourceFile {
                    location: Location::File("mat.fa.gz".to_string()),
                    md5: None,
                },
                pattern: ChrPattern::parent_default(Parent::Mat),
            },
        });
        let reference = Reference {
            key: "HG002".to_string(),
            topology: Topology::Diploid2,
            sequence: split,
            inputs: StratInputs::default(),
            builds: BTreeMap::new(),
        };
        assert_eq!(reference.sequence.defined_chromosomes().len(), 24);
    }
}
