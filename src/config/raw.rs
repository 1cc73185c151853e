//! Serde mirror of the configuration document.
//!
//! These structs only describe shape; every semantic rule lives in
//! `convert`. Each section is deserialized on its own so that one malformed
//! section does not hide problems in the others.
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawOtherLevel {
    pub(super) key: String,
    #[serde(default)]
    pub(super) desc: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawPaths {
    pub(super) results: Option<String>,
    pub(super) resources: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawReference {
    #[serde(rename = "ref")]
    pub(super) sequence: RawTagged,
    #[serde(default)]
    pub(super) strat_inputs: RawStratInputs,
    #[serde(default)]
    pub(super) builds: BTreeMap<String, serde_json::Value>,
}

/// Haplotype-tagged sources without a params block (the reference itself).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawTagged {
    pub(super) hap: Option<RawSource>,
    pub(super) dip: Option<RawSource>,
    pub(super) pat: Option<RawSource>,
    pub(super) mat: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawSource {
    pub(super) url: Option<String>,
    pub(super) filepath: Option<String>,
    pub(super) md5: Option<String>,
    pub(super) chr_pattern: Option<RawChrPattern>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawChrPattern {
    pub(super) template: Option<String>,
    #[serde(default)]
    pub(super) special: BTreeMap<u32, String>,
    pub(super) exclusions: Option<RawExclusions>,
    pub(super) hapnames: Option<RawHapNames>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum RawExclusions {
    List(Vec<u32>),
    PerParent(RawParentExclusions),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawParentExclusions {
    #[serde(default)]
    pub(super) pat: Vec<u32>,
    #[serde(default)]
    pub(super) mat: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawHapNames {
    pub(super) pat: String,
    pub(super) mat: String,
}

/// Haplotype-tagged bed-like sources plus their parse parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawBedInput {
    pub(super) hap: Option<RawSource>,
    pub(super) dip: Option<RawSource>,
    pub(super) pat: Option<RawSource>,
    pub(super) mat: Option<RawSource>,
    pub(super) params: Option<RawParams>,
}

impl RawBedInput {
    pub(super) fn tagged(&self) -> [(&'static str, Option<&RawSource>); 4] {
        [
            ("hap", self.hap.as_ref()),
            ("dip", self.dip.as_ref()),
            ("pat", self.pat.as_ref()),
            ("mat", self.mat.as_ref()),
        ]
    }
}

impl RawTagged {
    pub(super) fn tagged(&self) -> [(&'static str, Option<&RawSource>); 4] {
        [
            ("hap", self.hap.as_ref()),
            ("dip", self.dip.as_ref()),
            ("pat", self.pat.as_ref()),
            ("mat", self.mat.as_ref()),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawParams {
    pub(super) bed_cols: Option<RawBedColumns>,
    pub(super) sep: Option<String>,
    pub(super) skip_lines: Option<u32>,
    pub(super) chr_pattern: Option<RawChrPattern>,
    pub(super) class_col: Option<u32>,
    pub(super) level_col: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawBedColumns {
    #[serde(default)]
    pub(super) chr: u32,
    #[serde(default = "default_start_col")]
    pub(super) start: u32,
    #[serde(default = "default_end_col")]
    pub(super) end: u32,
}

fn default_start_col() -> u32 {
    1
}

fn default_end_col() -> u32 {
    2
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawStratInputs {
    pub(super) gap: Option<RawBedInput>,
    pub(super) low_complexity: Option<RawLowComplexity>,
    pub(super) xy: Option<RawXy>,
    pub(super) mappability: Option<RawMappability>,
    pub(super) segdups: Option<RawSegdups>,
    pub(super) functional: Option<RawFunctional>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawLowComplexity {
    pub(super) rmsk: Option<RawBedInput>,
    pub(super) simreps: Option<RawBedInput>,
    pub(super) satellites: Option<RawBedInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawXy {
    pub(super) features: Option<RawXyFeatures>,
    pub(super) x_par: Option<RawPar>,
    pub(super) y_par: Option<RawPar>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawXyFeatures {
    pub(super) x_bed: Option<RawBedInput>,
    pub(super) y_bed: Option<RawBedInput>,
    #[serde(default)]
    pub(super) xtr: bool,
    #[serde(default)]
    pub(super) ampliconic: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawPar {
    pub(super) start: (u64, u64),
    pub(super) end: (u64, u64),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawMappability {
    #[serde(default)]
    pub(super) unplaced_chr_patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawSegdups {
    pub(super) superdups: Option<RawBedInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawFunctional {
    pub(super) ftbl: Option<RawBedInput>,
    pub(super) gff: Option<RawBedInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawBuild {
    #[serde(default)]
    pub(super) chr_filter: Vec<u32>,
    #[serde(default)]
    pub(super) include: RawInclude,
    #[serde(default)]
    pub(super) other_strats: BTreeMap<String, BTreeMap<String, RawOtherStrat>>,
    pub(super) bench: Option<RawBench>,
    pub(super) comparison: Option<RawComparison>,
    #[serde(default)]
    pub(super) bigbed: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(super) enum RawToggle {
    Flag(bool),
    Options(RawToggleOptions),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawToggleOptions {
    #[serde(default)]
    pub(super) required: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawInclude {
    pub(super) gaps: Option<RawToggle>,
    pub(super) low_complexity: Option<RawToggle>,
    pub(super) xy: Option<RawToggle>,
    pub(super) segdups: Option<RawToggle>,
    #[serde(alias = "cds")]
    pub(super) functional: Option<RawToggle>,
    pub(super) vdj: Option<RawToggle>,
    pub(super) kir: Option<RawToggle>,
    pub(super) mhc: Option<RawToggle>,
    pub(super) telomeres: Option<RawToggle>,
    pub(super) union: Option<RawToggle>,
    pub(super) hets: Option<RawToggle>,
    pub(super) mappability: Option<RawMappabilityInclude>,
    pub(super) gc: Option<RawGcInclude>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawMappabilityInclude {
    Flag(bool),
    List(Vec<RawLowMap>),
    Options(RawMappabilityOptions),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawMappabilityOptions {
    #[serde(default)]
    pub(super) required: bool,
    pub(super) params: Option<Vec<RawLowMap>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawLowMap {
    pub(super) length: u32,
    pub(super) mismatches: u32,
    pub(super) indels: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawGcInclude {
    Flag(bool),
    Options(RawGcOptions),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawGcOptions {
    pub(super) low: Option<Vec<(u32, bool)>>,
    pub(super) high: Option<Vec<(u32, bool)>>,
    #[serde(default)]
    pub(super) required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawOtherStrat {
    pub(super) data: RawOtherData,
    #[serde(default)]
    pub(super) description: String,
    #[serde(default)]
    pub(super) remove_gaps: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RawOtherData {
    Literal(Vec<(String, u64, u64)>),
    Source(RawBedInput),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawBench {
    pub(super) bench_vcf: RawBedInput,
    pub(super) query_vcf: RawBedInput,
    pub(super) bench_bed: RawBedInput,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawComparison {
    pub(super) other: String,
    #[serde(default)]
    pub(super) replacements: Vec<(String, String)>,
    #[serde(default)]
    pub(super) path_mapper: BTreeMap<String, String>,
    #[serde(default)]
    pub(super) ignore_other: Vec<String>,
    #[serde(default)]
    pub(super) ignore_generated: Vec<String>,
}
