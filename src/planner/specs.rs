//! Benchmark and comparison specifications attached to a build.
use super::{BenchmarkSpec, BuildCtx, ComparisonSpec, Emitted};
use crate::category::{Level, SourceRole};
use crate::model::{Bench, Comparison};

/// Levels whose comparison differences are reported but tolerated; the
/// mappability scanner is not deterministic across runs.
pub(super) const TOLERATED_LEVELS: [Level; 1] = [Level::Mappability];

pub(super) fn benchmark(ctx: &BuildCtx<'_>, bench: &Bench, out: &Emitted) -> BenchmarkSpec {
    let reference = ctx.catalog.reference();
    let view = ctx.view(reference.topology.merged_view(&reference.key));
    let subsets = &ctx.config.benchmark_subsets;
    let mut paths: Vec<String> = out
        .artifacts
        .iter()
        .filter(|artifact| {
            subsets
                .iter()
                .any(|entry| subset_matches(entry, &artifact.id.name))
        })
        .map(|artifact| artifact.path.clone())
        .collect();
    paths.sort();
    BenchmarkSpec {
        bench_vcf: view.input(SourceRole::BenchVcf, &bench.bench_vcf),
        query_vcf: view.input(SourceRole::QueryVcf, &bench.query_vcf),
        bench_bed: view.input(SourceRole::BenchBed, &bench.bench_bed),
        subsets: paths,
    }
}

/// A subset entry names one artifact exactly, or a banded family such as
/// `AllTandemRepeats` for `AllTandemRepeats_le50bp_slop5`.
fn subset_matches(entry: &str, name: &str) -> bool {
    if entry == name {
        return true;
    }
    name.strip_prefix(entry)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix("_slop5"))
        .is_some_and(|band| !band.is_empty() && !band.contains('_'))
}

pub(super) fn comparison(ctx: &BuildCtx<'_>, comparison: &Comparison) -> ComparisonSpec {
    let url = ctx
        .config
        .comparison_strats
        .get(&comparison.other)
        .cloned()
        .unwrap_or_default();
    ComparisonSpec {
        other: comparison.other.clone(),
        url,
        replacements: comparison.replacements.clone(),
        path_mapper: comparison.path_mapper.clone(),
        ignore_other: comparison.ignore_other.clone(),
        ignore_generated: comparison.ignore_generated.clone(),
        tolerate_levels: TOLERATED_LEVELS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::subset_matches;

    #[test]
    fn subset_entries_match_names_and_banded_families() {
        assert!(subset_matches("segdups", "segdups"));
        assert!(subset_matches("AllTandemRepeats", "AllTandemRepeats_le50bp_slop5"));
        assert!(subset_matches("AllTandemRepeats", "AllTandemRepeats_ge10001bp_slop5"));
        assert!(!subset_matches("segdups", "segdups_gt10kb"));
        assert!(!subset_matches(
            "AllTandemRepeats",
            "AllTandemRepeatsandHomopolymers_slop5"
        ));
        assert!(!subset_matches(
            "SimpleRepeat_homopolymer_ge21_slop5",
            "SimpleRepeat_homopolymer_ge21_AT_slop5"
        ));
    }
}
