use super::convert;
use crate::chrom::ChrIndex;
use crate::config::parse_document;
use crate::errors::{PlanError, PlanReport};
use crate::model::{Config, GcBound, Location, OtherData, SourceSet, Toggle};
use crate::topology::Topology;

const HAPLOID: &str = r#"
haploid_stratifications:
  GRCh38:
    ref:
      hap:
        url: https://example.org/GRCh38.fa.gz
        md5: 0123456789ABCDEF0123456789abcdef
    strat_inputs:
      gap:
        hap:
          url: https://example.org/gap.txt.gz
        params:
          bed_cols: {chr: 1, start: 2, end: 3}
          skip_lines: 1
      low_complexity:
        rmsk:
          hap:
            url: https://example.org/rmsk.txt.gz
          params:
            bed_cols: {chr: 5, start: 6, end: 7}
            class_col: 11
        simreps:
          hap:
            url: https://example.org/simreps.txt.gz
    builds:
      default:
        chr_filter: [21, 22]
        include:
          mappability: []
"#;

fn check(text: &str) -> Result<Config, PlanReport> {
    let doc = parse_document(text).expect("parse yaml");
    convert(&doc)
}

fn messages(report: &PlanReport) -> Vec<String> {
    report.errors.iter().map(|err| err.to_string()).collect()
}

fn expect_problem(text: &str, needle: &str) {
    let report = check(text).expect_err("config should be rejected");
    let messages = messages(&report);
    assert!(
        messages.iter().any(|message| message.contains(needle)),
        "expected {needle:?} in {messages:?}"
    );
}

#[test]
fn haploid_config_converts() {
    let config = check(HAPLOID).expect("valid config");
    let reference = &config.references["GRCh38"];
    assert_eq!(reference.topology, Topology::Haploid);
    let SourceSet::Hap(sequence) = &reference.sequence else {
        panic!("expected haploid reference");
    };
    assert_eq!(
        sequence.file.md5.as_deref(),
        Some("0123456789abcdef0123456789abcdef")
    );
    assert!(matches!(sequence.file.location, Location::Url(_)));
    let build = &reference.builds["default"];
    let filter: Vec<u8> = build.chr_filter.iter().map(|index| index.value()).collect();
    assert_eq!(filter, vec![21, 22]);
    assert!(build.include.mappability.params.is_empty());
    assert_eq!(build.include.hets, Toggle::Off);
    assert_eq!(config.results_dir, "results");
    assert_eq!(config.other_levels.len(), 4);
    let low_complexity = reference
        .inputs
        .low_complexity
        .as_ref()
        .expect("low complexity");
    assert_eq!(low_complexity.rmsk.params.class_col, Some(11));
    assert!(low_complexity.satellites.is_none());
}

#[test]
fn problems_are_collected_not_short_circuited() {
    let text = HAPLOID
        .replace("md5: 0123456789ABCDEF0123456789abcdef", "md5: nothex")
        .replace("chr_filter: [21, 22]", "chr_filter: [21, 30]")
        .replace("class_col: 11", "class_col: 6");
    let report = check(&text).expect_err("invalid");
    assert!(report.errors.len() >= 3, "{:?}", messages(&report));
    assert!(report
        .errors
        .iter()
        .all(|err| matches!(err, PlanError::ConfigValidation { .. })));
}

#[test]
fn reference_under_wrong_section_is_rejected() {
    let text = HAPLOID.replace("haploid_stratifications", "diploid1_stratifications");
    expect_problem(&text, "listed under diploid1_stratifications");
}

#[test]
fn unknown_keys_are_rejected() {
    expect_problem(&format!("{HAPLOID}\nextra: 1\n"), "unknown top-level key");
    let text = HAPLOID.replace("skip_lines: 1", "skip_lines: 1\n          colour: red");
    expect_problem(&text, "colour");
}

#[test]
fn reference_keys_cannot_look_like_labels() {
    let text = HAPLOID.replace("GRCh38:", "HG002_pat:");
    expect_problem(&text, "_pat or _mat");
}

#[test]
fn rmsk_requires_class_column() {
    let text = HAPLOID.replace("            class_col: 11\n", "");
    expect_problem(&text, "class_col is required");
}

#[test]
fn low_complexity_needs_rmsk_and_simreps() {
    let start = HAPLOID.find("        simreps:").expect("simreps block");
    let end = HAPLOID.find("    builds:").expect("builds block");
    let text = format!("{}{}", &HAPLOID[..start], &HAPLOID[end..]);
    expect_problem(&text, "needs both rmsk and simreps");
}

#[test]
fn chr_filter_must_be_defined_by_reference() {
    let text = HAPLOID.replace(
        "        md5: 0123456789ABCDEF0123456789abcdef\n",
        "        chr_pattern:\n          exclusions: [22]\n",
    );
    expect_problem(&text, "chromosome 22 is not defined");
}

#[test]
fn split_reference_defaults_parent_exclusions() {
    let text = r#"
diploid2_stratifications:
  HG002:
    ref:
      pat:
        filepath: pat.fa.gz
      mat:
        filepath: mat.fa.gz
    builds:
      draft: {}
"#;
    let config = check(text).expect("valid diploid2");
    let reference = &config.references["HG002"];
    assert_eq!(reference.topology, Topology::Diploid2);
    let SourceSet::Split(split) = &reference.sequence else {
        panic!("expected split reference");
    };
    assert!(split.pat.pattern.exclusions.contains(&ChrIndex::X));
    assert!(split.mat.pattern.exclusions.contains(&ChrIndex::Y));
    assert_eq!(reference.builds["draft"].include.hets, Toggle::On);
}

#[test]
fn diploid_inputs_must_match_topology() {
    let text = r#"
diploid2_stratifications:
  HG002:
    ref:
      pat: {filepath: pat.fa.gz}
      mat: {filepath: mat.fa.gz}
    strat_inputs:
      gap:
        hap: {filepath: gap.bed.gz}
    builds:
      draft: {}
"#;
    expect_problem(text, "hap sources are not valid for diploid2");
}

#[test]
fn haploid_rejects_hets_toggle() {
    let text = HAPLOID.replace("          mappability: []", "          hets: true");
    expect_problem(&text, "hets only applies to diploid");
}

#[test]
fn dip_hapnames_only_on_combined_sources() {
    let text = HAPLOID.replace(
        "        md5: 0123456789ABCDEF0123456789abcdef\n",
        "        chr_pattern:\n          hapnames: {pat: P, mat: M}\n",
    );
    expect_problem(&text, "hapnames only apply");
}

#[test]
fn gc_bounds_are_checked() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          gc:\n            low: [[30, true], [40, false]]\n            high: [[35, true]]",
    );
    expect_problem(&text, "must be below lowest high bound");

    let text = HAPLOID.replace(
        "          mappability: []",
        "          gc:\n            low: [[20, true], [25, true]]\n            high: [[60, true]]",
    );
    expect_problem(&text, "same number of range boundaries");
}

#[test]
fn gc_options_keep_given_bounds() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          gc:\n            low: [[25, true], [30, true]]\n            high: [[55, true], [65, true]]\n            required: true",
    );
    let config = check(&text).expect("valid gc");
    let gc = &config.references["GRCh38"].builds["default"].include.gc;
    assert!(gc.required);
    let params = gc.params.as_ref().expect("gc params");
    assert_eq!(params.low, vec![GcBound::new(25, true), GcBound::new(30, true)]);
}

#[test]
fn required_mappability_needs_params() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          mappability: {required: true, params: []}",
    );
    expect_problem(&text, "cannot be required with an empty");
}

#[test]
fn other_strats_follow_naming_rules() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          mappability: []\n        other_strats:\n          Ancestry:\n            segdups:\n              data: [[chr21, 10, 20]]",
    );
    expect_problem(&text, "collides with a built-in");

    let text = HAPLOID.replace(
        "          mappability: []",
        "          mappability: []\n        other_strats:\n          Nowhere:\n            custom:\n              data: [[chr21, 10, 20]]",
    );
    expect_problem(&text, "not listed in other_levels");
}

#[test]
fn literal_other_strats_are_sorted() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          mappability: []\n        other_strats:\n          GenomeSpecific:\n            hotspots:\n              data: [[chr22, 5, 9], [chr21, 10, 20]]\n              remove_gaps: true",
    );
    let config = check(&text).expect("valid literal strat");
    let strat = &config.references["GRCh38"].builds["default"].other_strats["GenomeSpecific"]
        ["hotspots"];
    assert!(strat.remove_gaps);
    let OtherData::Literal(records) = &strat.data else {
        panic!("expected literal data");
    };
    assert_eq!(records[0].chr, "chr21");
}

#[test]
fn comparison_target_must_be_declared() {
    let text = HAPLOID.replace(
        "          mappability: []",
        "          mappability: []\n        comparison:\n          other: v3.0",
    );
    expect_problem(&text, "not in comparison_strats");
}

#[test]
fn duplicate_reference_keys_across_sections() {
    let text = format!(
        "{HAPLOID}\ndiploid1_stratifications:\n  GRCh38:\n    ref:\n      dip: {{filepath: d.fa.gz}}\n"
    );
    expect_problem(&text, "also declared under");
}
