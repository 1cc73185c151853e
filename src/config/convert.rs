//! Raw document to typed model, collecting every problem on the way.
use super::raw::{
    RawBedInput, RawBuild, RawChrPattern, RawComparison, RawExclusions, RawGcInclude,
    RawInclude, RawLowComplexity, RawLowMap, RawMappabilityInclude, RawOtherData, RawOtherLevel,
    RawOtherStrat, RawPar, RawParams, RawPaths, RawReference, RawSource, RawStratInputs,
    RawToggle, RawXy,
};
use crate::category::is_reserved_name;
use crate::chrom::{ChrIndex, ChrPattern, DipChrPattern, HapNames};
use crate::errors::{PlanError, PlanReport};
use crate::model::{
    default_benchmark_subsets, default_other_levels, Bench, BedColumns, BedInput, BedParams,
    Build, Comparison, Config, DipSource, FunctionalInputs, GcBound, GcInclude, GcParams,
    HapSource, Include, LiteralRecord, Location, LowComplexityInputs, LowMapParams,
    MappabilityInclude, MappabilityInputs, OtherData, OtherLevel, OtherStrat, ParRegions,
    Reference, SourceFile, SourceSet, StratInputs, Toggle, XyFeatures, XyInputs,
    DEFAULT_RESULTS_DIR,
};
use crate::topology::{Haplotype, Parent, PerParent, SourceShape, Topology};
use crate::util::is_hex_digest;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

const TOP_LEVEL_KEYS: [&str; 7] = [
    "other_levels",
    "comparison_strats",
    "benchmark_subsets",
    "paths",
    "haploid_stratifications",
    "diploid1_stratifications",
    "diploid2_stratifications",
];

const TOPOLOGIES: [Topology; 3] = [Topology::Haploid, Topology::Diploid1, Topology::Diploid2];

#[derive(Default)]
struct Issues {
    errors: Vec<PlanError>,
}

impl Issues {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(PlanError::validation(path, message));
    }

    fn len(&self) -> usize {
        self.errors.len()
    }

    fn parse<T: DeserializeOwned>(&mut self, path: &str, value: &Value) -> Option<T> {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                self.push(path, err.to_string());
                None
            }
        }
    }
}

/// Which haplotype shapes an input may take.
#[derive(Debug, Clone, Copy)]
enum ShapeRule {
    Topology,
    /// Haploid annotations (X/Y feature beds) are accepted by every topology.
    AllowHaploid,
    /// Variant calls must match the reference layout exactly.
    Vcf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtraColumn {
    None,
    Class,
    Level,
}

struct ReferenceContext<'a> {
    path: String,
    key: &'a str,
    topology: Topology,
    defined: Option<BTreeSet<ChrIndex>>,
    has_gap: bool,
    levels: &'a BTreeSet<String>,
    comparison_strats: &'a BTreeMap<String, String>,
}

pub(super) fn convert(doc: &Value) -> Result<Config, PlanReport> {
    let mut issues = Issues::default();
    let Some(top) = doc.as_object() else {
        return Err(PlanReport::new(vec![PlanError::validation(
            "$",
            "config document must be a mapping",
        )]));
    };
    for key in top.keys() {
        if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
            issues.push(key, "unknown top-level key");
        }
    }

    let other_levels = match top.get("other_levels") {
        Some(value) => issues
            .parse::<Vec<RawOtherLevel>>("other_levels", value)
            .map(|levels| convert_levels(&mut issues, levels))
            .unwrap_or_else(default_other_levels),
        None => default_other_levels(),
    };
    let level_keys: BTreeSet<String> = other_levels.iter().map(|level| level.key.clone()).collect();

    let comparison_strats = match top.get("comparison_strats") {
        Some(value) => issues
            .parse::<BTreeMap<String, String>>("comparison_strats", value)
            .unwrap_or_default(),
        None => BTreeMap::new(),
    };
    for (key, url) in &comparison_strats {
        if url.trim().is_empty() {
            issues.push(&format!("comparison_strats.{key}"), "url must be non-empty");
        }
    }

    let benchmark_subsets = match top.get("benchmark_subsets") {
        Some(value) => issues
            .parse::<Vec<String>>("benchmark_subsets", value)
            .unwrap_or_default(),
        None => default_benchmark_subsets(),
    };

    let paths = match top.get("paths") {
        Some(value) => issues.parse::<RawPaths>("paths", value).unwrap_or_default(),
        None => RawPaths::default(),
    };
    let results_dir = paths
        .results
        .unwrap_or_else(|| DEFAULT_RESULTS_DIR.to_string());
    if results_dir.trim().is_empty() {
        issues.push("paths.results", "results directory must be non-empty");
    }

    let mut references = BTreeMap::new();
    let mut sections: BTreeMap<String, Topology> = BTreeMap::new();
    for topology in TOPOLOGIES {
        let section = topology.section();
        let entries = match top.get(section) {
            None | Some(Value::Null) => continue,
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                issues.push(section, "must map reference names to reference entries");
                continue;
            }
        };
        for (key, value) in entries {
            let path = format!("{section}.{key}");
            check_reference_key(&mut issues, &path, key);
            if let Some(previous) = sections.insert(key.clone(), topology) {
                issues.push(
                    &path,
                    format!(
                        "reference {key:?} is also declared under {}",
                        previous.section()
                    ),
                );
                continue;
            }
            let Some(raw) = issues.parse::<RawReference>(&path, value) else {
                continue;
            };
            let context = ReferenceContext {
                path,
                key,
                topology,
                defined: None,
                has_gap: raw.strat_inputs.gap.is_some(),
                levels: &level_keys,
                comparison_strats: &comparison_strats,
            };
            if let Some(reference) = convert_reference(&mut issues, context, raw) {
                references.insert(key.clone(), reference);
            }
        }
    }

    if !issues.errors.is_empty() {
        return Err(PlanReport::new(issues.errors));
    }
    Ok(Config {
        other_levels,
        comparison_strats,
        benchmark_subsets,
        results_dir,
        resources_dir: paths.resources,
        references,
    })
}

fn convert_levels(issues: &mut Issues, raw: Vec<RawOtherLevel>) -> Vec<OtherLevel> {
    let mut seen = BTreeSet::new();
    for (idx, level) in raw.iter().enumerate() {
        if level.key.trim().is_empty() || level.key.contains('/') {
            issues.push(
                &format!("other_levels[{idx}]"),
                "level key must be non-empty and must not contain '/'",
            );
        }
        if !seen.insert(level.key.clone()) {
            issues.push(
                &format!("other_levels[{idx}]"),
                format!("level {:?} is declared twice", level.key),
            );
        }
    }
    raw.into_iter()
        .map(|level| OtherLevel {
            key: level.key,
            desc: level.desc,
        })
        .collect()
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|ch| ch == '@' || ch == '/' || ch.is_whitespace())
}

fn check_reference_key(issues: &mut Issues, path: &str, key: &str) {
    if !is_plain_key(key) {
        issues.push(
            path,
            "reference key must be non-empty without '@', '/', or whitespace",
        );
    }
    if key.ends_with("_pat") || key.ends_with("_mat") {
        issues.push(
            path,
            "reference key must not end with _pat or _mat (reserved for haplotype labels)",
        );
    }
}

fn convert_reference(
    issues: &mut Issues,
    mut context: ReferenceContext<'_>,
    raw: RawReference,
) -> Option<Reference> {
    let path = context.path.clone();
    let topology = context.topology;
    let ref_path = format!("{path}.ref");
    let tags: BTreeSet<Haplotype> = raw
        .sequence
        .tagged()
        .iter()
        .filter(|(_, source)| source.is_some())
        .filter_map(|(tag, _)| haplotype_tag(tag))
        .collect();
    match Topology::from_ref_tags(&tags) {
        Ok(declared) if declared != topology => issues.push(
            &ref_path,
            format!(
                "ref declares a {declared} reference but is listed under {}",
                topology.section()
            ),
        ),
        Ok(_) => {}
        Err(message) => issues.push(&ref_path, message),
    }
    let sequence = source_set(issues, &ref_path, &raw.sequence.tagged(), None);
    context.defined = sequence.as_ref().map(SourceSet::defined_chromosomes);

    let inputs = convert_inputs(
        issues,
        &format!("{path}.strat_inputs"),
        topology,
        &raw.strat_inputs,
    );

    let mut builds = BTreeMap::new();
    for (build_key, value) in &raw.builds {
        let build_path = format!("{path}.builds.{build_key}");
        if !is_plain_key(build_key) {
            issues.push(
                &build_path,
                "build key must be non-empty without '@', '/', or whitespace",
            );
        }
        let Some(raw_build) = issues.parse::<RawBuild>(&build_path, value) else {
            continue;
        };
        if let Some(build) = convert_build(issues, &context, &build_path, build_key, raw_build) {
            builds.insert(build_key.clone(), build);
        }
    }

    Some(Reference {
        key: context.key.to_string(),
        topology,
        sequence: sequence?,
        inputs: inputs?,
        builds,
    })
}

fn haplotype_tag(tag: &str) -> Option<Haplotype> {
    match tag {
        "hap" => Some(Haplotype::Hap),
        "dip" => Some(Haplotype::Dip),
        "pat" => Some(Haplotype::Pat),
        "mat" => Some(Haplotype::Mat),
        _ => None,
    }
}

fn source_set(
    issues: &mut Issues,
    path: &str,
    tagged: &[(&'static str, Option<&RawSource>); 4],
    fallback: Option<&RawChrPattern>,
) -> Option<SourceSet> {
    let present: Vec<&str> = tagged
        .iter()
        .filter(|(_, source)| source.is_some())
        .map(|(tag, _)| *tag)
        .collect();
    let get = |wanted: &str| {
        tagged
            .iter()
            .find(|(tag, _)| *tag == wanted)
            .and_then(|(_, source)| *source)
    };
    match present.as_slice() {
        ["hap"] => {
            let raw = get("hap")?;
            let source_path = format!("{path}.hap");
            let file = source_file(issues, &source_path, raw);
            let pattern = hap_pattern(
                issues,
                &format!("{source_path}.chr_pattern"),
                raw.chr_pattern.as_ref().or(fallback),
                None,
            );
            Some(SourceSet::Hap(HapSource {
                file: file?,
                pattern: pattern?,
            }))
        }
        ["dip"] => {
            let raw = get("dip")?;
            let source_path = format!("{path}.dip");
            let file = source_file(issues, &source_path, raw);
            let pattern = dip_pattern(
                issues,
                &format!("{source_path}.chr_pattern"),
                raw.chr_pattern.as_ref().or(fallback),
            );
            Some(SourceSet::Dip(DipSource {
                file: file?,
                pattern: pattern?,
            }))
        }
        ["pat", "mat"] => {
            let mut halves = Vec::new();
            for parent in Parent::BOTH {
                let tag = parent.haplotype().as_str();
                let raw = get(tag)?;
                let source_path = format!("{path}.{tag}");
                let file = source_file(issues, &source_path, raw);
                let pattern = hap_pattern(
                    issues,
                    &format!("{source_path}.chr_pattern"),
                    raw.chr_pattern.as_ref().or(fallback),
                    Some(parent),
                );
                halves.push(file.zip(pattern).map(|(file, pattern)| HapSource { file, pattern }));
            }
            let mat = halves.pop().flatten();
            let pat = halves.pop().flatten();
            Some(SourceSet::Split(PerParent { pat: pat?, mat: mat? }))
        }
        [] => {
            issues.push(path, "no source declared; expected hap, dip, or pat+mat");
            None
        }
        other => {
            issues.push(
                path,
                format!(
                    "haplotype tags [{}] must be exactly one of hap, dip, or pat+mat",
                    other.join(", ")
                ),
            );
            None
        }
    }
}

fn source_file(issues: &mut Issues, path: &str, raw: &RawSource) -> Option<SourceFile> {
    let location = match (&raw.url, &raw.filepath) {
        (Some(url), None) if !url.trim().is_empty() => Some(Location::Url(url.clone())),
        (None, Some(file)) if !file.trim().is_empty() => Some(Location::File(file.clone())),
        (Some(_), Some(_)) => {
            issues.push(path, "declare either url or filepath, not both");
            None
        }
        _ => {
            issues.push(path, "a non-empty url or filepath is required");
            None
        }
    };
    let md5 = match &raw.md5 {
        Some(digest) if is_hex_digest(digest, 32) => Some(Some(digest.to_ascii_lowercase())),
        Some(digest) => {
            issues.push(
                &format!("{path}.md5"),
                format!("md5 {digest:?} is not a 32-character hex digest"),
            );
            None
        }
        None => Some(None),
    };
    Some(SourceFile {
        location: location?,
        md5: md5?,
    })
}

fn chr_indices(issues: &mut Issues, path: &str, values: &[u32]) -> BTreeSet<ChrIndex> {
    let mut indices = BTreeSet::new();
    for value in values {
        match ChrIndex::new(*value) {
            Some(index) => {
                indices.insert(index);
            }
            None => issues.push(path, format!("chromosome index {value} outside 1-24")),
        }
    }
    indices
}

fn special_map(
    issues: &mut Issues,
    path: &str,
    raw: &BTreeMap<u32, String>,
) -> BTreeMap<ChrIndex, String> {
    let mut special = BTreeMap::new();
    for (value, name) in raw {
        match ChrIndex::new(*value) {
            Some(index) => {
                special.insert(index, name.clone());
            }
            None => issues.push(
                &format!("{path}.special"),
                format!("chromosome index {value} outside 1-24"),
            ),
        }
    }
    special
}

fn hap_pattern(
    issues: &mut Issues,
    path: &str,
    raw: Option<&RawChrPattern>,
    parent: Option<Parent>,
) -> Option<ChrPattern> {
    let base = match parent {
        Some(parent) => ChrPattern::parent_default(parent),
        None => ChrPattern::default(),
    };
    let Some(raw) = raw else {
        return Some(base);
    };
    let before = issues.len();
    if raw.hapnames.is_some() {
        issues.push(path, "hapnames only apply to combined (dip) sources");
    }
    let exclusions = match &raw.exclusions {
        None => base.exclusions,
        Some(RawExclusions::List(values)) => {
            chr_indices(issues, &format!("{path}.exclusions"), values)
        }
        Some(RawExclusions::PerParent(_)) => {
            issues.push(
                &format!("{path}.exclusions"),
                "per-haplotype exclusions only apply to combined (dip) sources",
            );
            BTreeSet::new()
        }
    };
    let pattern = ChrPattern {
        template: raw.template.clone().unwrap_or(base.template),
        special: special_map(issues, path, &raw.special),
        exclusions,
    };
    for problem in pattern.problems() {
        issues.push(path, problem);
    }
    (issues.len() == before).then_some(pattern)
}

fn dip_pattern(
    issues: &mut Issues,
    path: &str,
    raw: Option<&RawChrPattern>,
) -> Option<DipChrPattern> {
    let base = DipChrPattern::default();
    let Some(raw) = raw else {
        return Some(base);
    };
    let before = issues.len();
    let exclusions = match &raw.exclusions {
        None => base.exclusions,
        Some(RawExclusions::PerParent(per_parent)) => {
            let exclusions_path = format!("{path}.exclusions");
            PerParent {
                pat: chr_indices(issues, &exclusions_path, &per_parent.pat),
                mat: chr_indices(issues, &exclusions_path, &per_parent.mat),
            }
        }
        Some(RawExclusions::List(_)) => {
            issues.push(
                &format!("{path}.exclusions"),
                "combined (dip) exclusions must be given per haplotype as {pat, mat}",
            );
            base.exclusions
        }
    };
    let hapnames = match &raw.hapnames {
        Some(names) => HapNames {
            pat: names.pat.clone(),
            mat: names.mat.clone(),
        },
        None => base.hapnames,
    };
    let pattern = DipChrPattern {
        template: raw.template.clone().unwrap_or(base.template),
        special: special_map(issues, path, &raw.special),
        hapnames,
        exclusions,
    };
    for problem in pattern.problems() {
        issues.push(path, problem);
    }
    (issues.len() == before).then_some(pattern)
}

fn check_shape(
    issues: &mut Issues,
    path: &str,
    topology: Topology,
    shape: SourceShape,
    rule: ShapeRule,
) {
    let (legal, expected) = match rule {
        ShapeRule::Topology => (topology.accepts(shape).is_some(), topology.legal_shapes()),
        ShapeRule::AllowHaploid => (
            shape == SourceShape::Hap || topology.accepts(shape).is_some(),
            "hap, dip, or pat+mat",
        ),
        ShapeRule::Vcf => match topology {
            Topology::Haploid => (shape == SourceShape::Hap, "hap"),
            Topology::Diploid1 => (shape == SourceShape::Dip, "dip"),
            Topology::Diploid2 => (shape == SourceShape::Split, "pat+mat"),
        },
    };
    if !legal {
        issues.push(
            path,
            format!(
                "{} sources are not valid for {topology} references (expected {expected})",
                shape.as_str()
            ),
        );
    }
}

fn bed_input(
    issues: &mut Issues,
    path: &str,
    raw: &RawBedInput,
    topology: Topology,
    rule: ShapeRule,
    extra: ExtraColumn,
) -> Option<BedInput> {
    let fallback = raw.params.as_ref().and_then(|params| params.chr_pattern.as_ref());
    let sources = source_set(issues, path, &raw.tagged(), fallback);
    if let Some(sources) = &sources {
        check_shape(issues, path, topology, sources.shape(), rule);
    }
    let params = bed_params(issues, &format!("{path}.params"), raw.params.as_ref(), extra);
    Some(BedInput {
        sources: sources?,
        params: params?,
    })
}

fn bed_params(
    issues: &mut Issues,
    path: &str,
    raw: Option<&RawParams>,
    extra: ExtraColumn,
) -> Option<BedParams> {
    let before = issues.len();
    let empty = RawParams::default();
    let raw = raw.unwrap_or(&empty);
    let bed_cols = raw
        .bed_cols
        .as_ref()
        .map(|cols| BedColumns {
            chr: cols.chr,
            start: cols.start,
            end: cols.end,
        })
        .unwrap_or_default();
    let coordinates = [bed_cols.chr, bed_cols.start, bed_cols.end];
    if bed_cols.chr == bed_cols.start
        || bed_cols.chr == bed_cols.end
        || bed_cols.start == bed_cols.end
    {
        issues.push(&format!("{path}.bed_cols"), "bed columns must be different");
    }
    let sep = raw.sep.clone().unwrap_or_else(|| "\t".to_string());
    if sep.is_empty() {
        issues.push(&format!("{path}.sep"), "separator must be non-empty");
    }
    let mut check_extra = |name: &str, value: Option<u32>, wanted: bool| match (value, wanted) {
        (Some(column), true) => {
            if coordinates.contains(&column) {
                issues.push(
                    &format!("{path}.{name}"),
                    format!("{name} {column} must differ from the bed coordinate columns"),
                );
            }
        }
        (None, true) => issues.push(path, format!("{name} is required for this input")),
        (Some(_), false) => issues.push(
            &format!("{path}.{name}"),
            format!("{name} is not used by this input"),
        ),
        (None, false) => {}
    };
    check_extra("class_col", raw.class_col, extra == ExtraColumn::Class);
    check_extra("level_col", raw.level_col, extra == ExtraColumn::Level);
    (issues.len() == before).then(|| BedParams {
        bed_cols,
        sep,
        skip_lines: raw.skip_lines.unwrap_or(0),
        class_col: raw.class_col,
        level_col: raw.level_col,
    })
}

fn convert_inputs(
    issues: &mut Issues,
    path: &str,
    topology: Topology,
    raw: &RawStratInputs,
) -> Option<StratInputs> {
    let before = issues.len();
    let gap = raw.gap.as_ref().and_then(|gap| {
        bed_input(
            issues,
            &format!("{path}.gap"),
            gap,
            topology,
            ShapeRule::Topology,
            ExtraColumn::None,
        )
    });
    let low_complexity = raw
        .low_complexity
        .as_ref()
        .and_then(|raw| {
            convert_low_complexity(issues, &format!("{path}.low_complexity"), topology, raw)
        });
    let xy = raw
        .xy
        .as_ref()
        .and_then(|raw| convert_xy(issues, &format!("{path}.xy"), topology, raw));
    let mappability = raw.mappability.as_ref().map(|raw| {
        for (idx, pattern) in raw.unplaced_chr_patterns.iter().enumerate() {
            if let Err(err) = Regex::new(pattern) {
                issues.push(
                    &format!("{path}.mappability.unplaced_chr_patterns[{idx}]"),
                    format!("invalid regex: {err}"),
                );
            }
        }
        MappabilityInputs {
            unplaced_chr_patterns: raw.unplaced_chr_patterns.clone(),
        }
    });
    let segdups = raw
        .segdups
        .as_ref()
        .and_then(|segdups| segdups.superdups.as_ref())
        .and_then(|superdups| {
            bed_input(
                issues,
                &format!("{path}.segdups.superdups"),
                superdups,
                topology,
                ShapeRule::Topology,
                ExtraColumn::None,
            )
        });
    let functional = raw.functional.as_ref().and_then(|functional| {
        let functional_path = format!("{path}.functional");
        match (&functional.ftbl, &functional.gff) {
            (Some(ftbl), Some(gff)) => {
                let ftbl = bed_input(
                    issues,
                    &format!("{functional_path}.ftbl"),
                    ftbl,
                    topology,
                    ShapeRule::Topology,
                    ExtraColumn::None,
                );
                let gff = bed_input(
                    issues,
                    &format!("{functional_path}.gff"),
                    gff,
                    topology,
                    ShapeRule::Topology,
                    ExtraColumn::None,
                );
                Some(FunctionalInputs {
                    ftbl: ftbl?,
                    gff: gff?,
                })
            }
            (None, None) => None,
            _ => {
                issues.push(&functional_path, "ftbl and gff must be declared together");
                None
            }
        }
    });
    (issues.len() == before).then_some(StratInputs {
        gap,
        low_complexity,
        xy,
        mappability,
        segdups,
        functional,
    })
}

fn convert_low_complexity(
    issues: &mut Issues,
    path: &str,
    topology: Topology,
    raw: &RawLowComplexity,
) -> Option<LowComplexityInputs> {
    match (&raw.rmsk, &raw.simreps) {
        (Some(rmsk), Some(simreps)) => {
            let rmsk = bed_input(
                issues,
                &format!("{path}.rmsk"),
                rmsk,
                topology,
                ShapeRule::Topology,
                ExtraColumn::Class,
            );
            let simreps = bed_input(
                issues,
                &format!("{path}.simreps"),
                simreps,
                topology,
                ShapeRule::Topology,
                ExtraColumn::None,
            );
            let satellites = match &raw.satellites {
                Some(satellites) => Some(bed_input(
                    issues,
                    &format!("{path}.satellites"),
                    satellites,
                    topology,
                    ShapeRule::Topology,
                    ExtraColumn::Class,
                )?),
                None => None,
            };
            Some(LowComplexityInputs {
                rmsk: rmsk?,
                simreps: simreps?,
                satellites,
            })
        }
        (None, None) if raw.satellites.is_none() => None,
        _ => {
            issues.push(
                path,
                "low_complexity needs both rmsk and simreps; satellites may be omitted and are then derived from the rmsk class column",
            );
            None
        }
    }
}

fn convert_xy(
    issues: &mut Issues,
    path: &str,
    topology: Topology,
    raw: &RawXy,
) -> Option<XyInputs> {
    let before = issues.len();
    let features = raw.features.as_ref().and_then(|features| {
        let features_path = format!("{path}.features");
        match (&features.x_bed, &features.y_bed) {
            (Some(x_bed), Some(y_bed)) => {
                let x_bed = bed_input(
                    issues,
                    &format!("{features_path}.x_bed"),
                    x_bed,
                    topology,
                    ShapeRule::AllowHaploid,
                    ExtraColumn::Level,
                );
                let y_bed = bed_input(
                    issues,
                    &format!("{features_path}.y_bed"),
                    y_bed,
                    topology,
                    ShapeRule::AllowHaploid,
                    ExtraColumn::Level,
                );
                Some(XyFeatures {
                    x_bed: x_bed?,
                    y_bed: y_bed?,
                    xtr: features.xtr,
                    ampliconic: features.ampliconic,
                })
            }
            _ => {
                issues.push(&features_path, "x_bed and y_bed must be declared together");
                None
            }
        }
    });
    let x_par = raw
        .x_par
        .as_ref()
        .map(|par| convert_par(issues, &format!("{path}.x_par"), par));
    let y_par = raw
        .y_par
        .as_ref()
        .map(|par| convert_par(issues, &format!("{path}.y_par"), par));
    (issues.len() == before).then_some(XyInputs {
        features,
        x_par,
        y_par,
    })
}

fn convert_par(issues: &mut Issues, path: &str, raw: &RawPar) -> ParRegions {
    for (name, (start, end)) in [("start", raw.start), ("end", raw.end)] {
        if end <= start {
            issues.push(
                &format!("{path}.{name}"),
                "region end must be greater than its start",
            );
        }
    }
    ParRegions {
        start: raw.start,
        end: raw.end,
    }
}

fn convert_build(
    issues: &mut Issues,
    context: &ReferenceContext<'_>,
    path: &str,
    key: &str,
    raw: RawBuild,
) -> Option<Build> {
    let before = issues.len();
    let filter_path = format!("{path}.chr_filter");
    let chr_filter = chr_indices(issues, &filter_path, &raw.chr_filter);
    if let Some(defined) = &context.defined {
        for index in chr_filter.difference(defined) {
            issues.push(
                &filter_path,
                format!(
                    "chromosome {index} is not defined by reference {}",
                    context.key
                ),
            );
        }
    }
    let include = convert_include(
        issues,
        &format!("{path}.include"),
        context.topology,
        &raw.include,
    );
    let other_strats = convert_other_strats(issues, context, path, raw.other_strats);
    let bench = raw.bench.as_ref().and_then(|bench| {
        let bench_path = format!("{path}.bench");
        let topology = context.topology;
        let bench_vcf = bed_input(
            issues,
            &format!("{bench_path}.bench_vcf"),
            &bench.bench_vcf,
            topology,
            ShapeRule::Vcf,
            ExtraColumn::None,
        );
        let query_vcf = bed_input(
            issues,
            &format!("{bench_path}.query_vcf"),
            &bench.query_vcf,
            topology,
            ShapeRule::Vcf,
            ExtraColumn::None,
        );
        let bench_bed = bed_input(
            issues,
            &format!("{bench_path}.bench_bed"),
            &bench.bench_bed,
            topology,
            ShapeRule::Topology,
            ExtraColumn::None,
        );
        Some(Bench {
            bench_vcf: bench_vcf?,
            query_vcf: query_vcf?,
            bench_bed: bench_bed?,
        })
    });
    let comparison = raw
        .comparison
        .map(|comparison| {
            convert_comparison(issues, context, &format!("{path}.comparison"), comparison)
        });
    (issues.len() == before).then(|| Build {
        key: key.to_string(),
        chr_filter,
        include,
        other_strats,
        bench,
        comparison,
        bigbed: raw.bigbed,
    })
}

fn toggle(raw: Option<RawToggle>, default: Toggle) -> Toggle {
    match raw {
        None => default,
        Some(RawToggle::Flag(true)) => Toggle::On,
        Some(RawToggle::Flag(false)) => Toggle::Off,
        Some(RawToggle::Options(options)) if options.required => Toggle::Required,
        Some(RawToggle::Options(_)) => Toggle::On,
    }
}

fn convert_include(
    issues: &mut Issues,
    path: &str,
    topology: Topology,
    raw: &RawInclude,
) -> Include {
    let defaults = Include::defaults(topology);
    if !topology.is_diploid() && raw.hets.is_some() {
        issues.push(
            &format!("{path}.hets"),
            "hets only applies to diploid references",
        );
    }
    let mappability = convert_mappability(
        issues,
        &format!("{path}.mappability"),
        raw.mappability.as_ref(),
    );
    let gc = convert_gc(issues, &format!("{path}.gc"), raw.gc.as_ref());
    Include {
        gaps: toggle(raw.gaps, defaults.gaps),
        low_complexity: toggle(raw.low_complexity, defaults.low_complexity),
        xy: toggle(raw.xy, defaults.xy),
        segdups: toggle(raw.segdups, defaults.segdups),
        functional: toggle(raw.functional, defaults.functional),
        vdj: toggle(raw.vdj, defaults.vdj),
        kir: toggle(raw.kir, defaults.kir),
        mhc: toggle(raw.mhc, defaults.mhc),
        telomeres: toggle(raw.telomeres, defaults.telomeres),
        union: toggle(raw.union, defaults.union),
        hets: if topology.is_diploid() {
            toggle(raw.hets, defaults.hets)
        } else {
            Toggle::Off
        },
        mappability,
        gc,
    }
}

fn low_map_params(issues: &mut Issues, path: &str, raw: &[RawLowMap]) -> BTreeSet<LowMapParams> {
    let mut params = BTreeSet::new();
    for (idx, entry) in raw.iter().enumerate() {
        if entry.length == 0 {
            issues.push(&format!("{path}[{idx}]"), "read length must be positive");
        }
        params.insert(LowMapParams {
            length: entry.length,
            mismatches: entry.mismatches,
            indels: entry.indels,
        });
    }
    params
}

fn convert_mappability(
    issues: &mut Issues,
    path: &str,
    raw: Option<&RawMappabilityInclude>,
) -> MappabilityInclude {
    let defaults = MappabilityInclude::default();
    let include = match raw {
        None | Some(RawMappabilityInclude::Flag(true)) => defaults,
        Some(RawMappabilityInclude::Flag(false)) => MappabilityInclude {
            params: BTreeSet::new(),
            required: false,
        },
        Some(RawMappabilityInclude::List(list)) => MappabilityInclude {
            params: low_map_params(issues, path, list),
            required: false,
        },
        Some(RawMappabilityInclude::Options(options)) => MappabilityInclude {
            params: match &options.params {
                Some(list) => low_map_params(issues, &format!("{path}.params"), list),
                None => defaults.params,
            },
            required: options.required,
        },
    };
    if include.required && include.params.is_empty() {
        issues.push(path, "mappability cannot be required with an empty parameter list");
    }
    include
}

fn convert_gc(issues: &mut Issues, path: &str, raw: Option<&RawGcInclude>) -> GcInclude {
    let include = match raw {
        None | Some(RawGcInclude::Flag(true)) => GcInclude::default(),
        Some(RawGcInclude::Flag(false)) => GcInclude {
            params: None,
            required: false,
        },
        Some(RawGcInclude::Options(options)) => {
            let defaults = GcParams::default();
            let bounds = |list: &Option<Vec<(u32, bool)>>, fallback: Vec<GcBound>| match list {
                Some(list) => list
                    .iter()
                    .map(|(percent, range_bound)| GcBound::new(*percent, *range_bound))
                    .collect(),
                None => fallback,
            };
            GcInclude {
                params: Some(GcParams {
                    low: bounds(&options.low, defaults.low),
                    high: bounds(&options.high, defaults.high),
                }),
                required: options.required,
            }
        }
    };
    if let Some(params) = &include.params {
        check_gc(issues, path, params);
    }
    include
}

fn check_gc(issues: &mut Issues, path: &str, params: &GcParams) {
    for (side, bounds) in [("low", &params.low), ("high", &params.high)] {
        let side_path = format!("{path}.{side}");
        if bounds.is_empty() {
            issues.push(&side_path, "at least one bound is required");
        }
        let mut seen = BTreeSet::new();
        for bound in bounds {
            if bound.percent > 100 {
                issues.push(
                    &side_path,
                    format!("GC bound {} is not a percentage", bound.percent),
                );
            }
            if !seen.insert(bound.percent) {
                issues.push(
                    &side_path,
                    format!("GC bound {} is listed twice", bound.percent),
                );
            }
        }
    }
    let max_low = params.low.iter().map(|bound| bound.percent).max();
    let min_high = params.high.iter().map(|bound| bound.percent).min();
    if let (Some(max_low), Some(min_high)) = (max_low, min_high) {
        if max_low >= min_high {
            issues.push(
                path,
                format!("highest low bound {max_low} must be below lowest high bound {min_high}"),
            );
        }
    }
    let low_ranges = params.low.iter().filter(|bound| bound.range_bound).count();
    let high_ranges = params.high.iter().filter(|bound| bound.range_bound).count();
    if low_ranges != high_ranges {
        issues.push(
            path,
            format!(
                "GC low/high must have the same number of range boundaries ({low_ranges} vs {high_ranges})"
            ),
        );
    }
}

fn convert_other_strats(
    issues: &mut Issues,
    context: &ReferenceContext<'_>,
    path: &str,
    raw: BTreeMap<String, BTreeMap<String, RawOtherStrat>>,
) -> BTreeMap<String, BTreeMap<String, OtherStrat>> {
    let mut levels = BTreeMap::new();
    for (level, strats) in raw {
        let level_path = format!("{path}.other_strats.{level}");
        if !context.levels.contains(&level) {
            issues.push(
                &level_path,
                format!("level {level:?} is not listed in other_levels"),
            );
        }
        let mut converted = BTreeMap::new();
        for (name, strat) in strats {
            let strat_path = format!("{level_path}.{name}");
            if !is_plain_key(&name) {
                issues.push(
                    &strat_path,
                    "strat name must be non-empty without '@', '/', or whitespace",
                );
            }
            if is_reserved_name(&name) {
                issues.push(
                    &strat_path,
                    format!("{name:?} collides with a built-in stratification name"),
                );
            }
            if strat.remove_gaps && !context.has_gap {
                issues.push(&strat_path, "remove_gaps requires strat_inputs.gap");
            }
            let data_path = format!("{strat_path}.data");
            let data = match strat.data {
                RawOtherData::Literal(records) => {
                    Some(OtherData::Literal(literal_records(issues, &data_path, records)))
                }
                RawOtherData::Source(source) => bed_input(
                    issues,
                    &data_path,
                    &source,
                    context.topology,
                    ShapeRule::Topology,
                    ExtraColumn::None,
                )
                .map(OtherData::Source),
            };
            if let Some(data) = data {
                converted.insert(
                    name,
                    OtherStrat {
                        data,
                        description: strat.description,
                        remove_gaps: strat.remove_gaps,
                    },
                );
            }
        }
        levels.insert(level, converted);
    }
    levels
}

fn literal_records(
    issues: &mut Issues,
    path: &str,
    raw: Vec<(String, u64, u64)>,
) -> Vec<LiteralRecord> {
    if raw.is_empty() {
        issues.push(path, "literal data must contain at least one record");
    }
    let mut records: Vec<LiteralRecord> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(idx, (chr, start, end))| {
            if chr.trim().is_empty() || end <= start {
                issues.push(
                    &format!("{path}[{idx}]"),
                    "record needs a chromosome and end greater than start",
                );
                return None;
            }
            Some(LiteralRecord { chr, start, end })
        })
        .collect();
    records.sort();
    records
}

fn convert_comparison(
    issues: &mut Issues,
    context: &ReferenceContext<'_>,
    path: &str,
    raw: RawComparison,
) -> Comparison {
    if !context.comparison_strats.contains_key(&raw.other) {
        issues.push(
            &format!("{path}.other"),
            format!("comparison target {:?} is not in comparison_strats", raw.other),
        );
    }
    for (list, patterns) in [
        ("ignore_other", &raw.ignore_other),
        ("ignore_generated", &raw.ignore_generated),
    ] {
        for (idx, pattern) in patterns.iter().enumerate() {
            if let Err(err) = Regex::new(pattern) {
                issues.push(
                    &format!("{path}.{list}[{idx}]"),
                    format!("invalid regex: {err}"),
                );
            }
        }
    }
    for (idx, (from, _)) in raw.replacements.iter().enumerate() {
        if from.is_empty() {
            issues.push(
                &format!("{path}.replacements[{idx}]"),
                "replacement pattern must be non-empty",
            );
        }
    }
    Comparison {
        other: raw.other,
        replacements: raw.replacements,
        path_mapper: raw.path_mapper,
        ignore_other: raw.ignore_other,
        ignore_generated: raw.ignore_generated,
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
