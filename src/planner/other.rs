//! User-imported stratifications under configured levels.
use super::{Draft, Emitted, OmissionReason, Operation, ViewPlan};
use crate::catalog::{reference_pattern, view_parents};
use crate::category::{Level, SourceRole, StratCategory};
use crate::chrom::{ChrClass, ChrNameMapper, UnplacedMatcher};
use crate::errors::PlanError;
use crate::model::{LiteralRecord, OtherData, OtherStrat, SourceSet};
use crate::topology::{Haplotype, Parent};
use std::collections::BTreeSet;

pub(super) fn plan(view: &ViewPlan<'_>, out: &mut Emitted) {
    for (level, strats) in &view.ctx.build.other_strats {
        for (name, strat) in strats {
            plan_strat(view, Level::from(level.clone()), name, strat, out);
        }
    }
}

fn plan_strat(
    view: &ViewPlan<'_>,
    level: Level,
    name: &str,
    strat: &OtherStrat,
    out: &mut Emitted,
) {
    let mut draft = match &strat.data {
        OtherData::Source(input) => Draft::new(StratCategory::Other, name, Operation::Normalize)
            .sources(view.input(SourceRole::Other, input)),
        OtherData::Literal(records) => {
            let Some(kept) = place_records(view, name, records, out) else {
                return;
            };
            let rows: Vec<serde_json::Value> = kept
                .iter()
                .map(|record| serde_json::json!([record.chr, record.start, record.end]))
                .collect();
            Draft::new(StratCategory::Other, name, Operation::Literal).param("records", rows)
        }
    };
    draft = draft
        .level(level)
        .param("description", strat.description.as_str());
    if strat.remove_gaps {
        if let Some(gaps) = view.gaps() {
            draft = draft.sources(gaps).param("remove_gaps", true);
        }
    }
    out.add(view.finish(draft));
}

fn mappers(sequence: &SourceSet, parents: Vec<Option<Parent>>) -> Vec<ChrNameMapper> {
    parents
        .into_iter()
        .filter_map(|parent| reference_pattern(sequence, parent))
        .map(ChrNameMapper::new)
        .collect()
}

/// Records of this view that survive the chromosome filter. Records placed
/// on the other haplotype are skipped; unplaced ones become omissions and
/// unknown ones errors. `None` when nothing is left to write.
fn place_records(
    view: &ViewPlan<'_>,
    name: &str,
    records: &[LiteralRecord],
    out: &mut Emitted,
) -> Option<Vec<LiteralRecord>> {
    let reference = view.ctx.catalog.reference();
    let own = mappers(&reference.sequence, view_parents(view.view.haplotype));
    let every = mappers(&reference.sequence, view_parents(Haplotype::Dip));
    let patterns = reference
        .inputs
        .mappability
        .as_ref()
        .map(|inputs| inputs.unplaced_chr_patterns.clone())
        .unwrap_or_default();
    let matcher = match UnplacedMatcher::new(&patterns) {
        Ok(matcher) => matcher,
        Err(err) => {
            out.errors.push(PlanError::validation(
                format!("{}.strat_inputs.mappability.unplaced_chr_patterns", reference.key),
                err.to_string(),
            ));
            return None;
        }
    };

    let mut kept = Vec::new();
    let mut needed = BTreeSet::new();
    for record in records {
        let placed = own.iter().find_map(|mapper| mapper.to_index(&record.chr).ok());
        if let Some(index) = placed {
            needed.insert(index);
            if view.chromosomes.contains(&index) {
                kept.push(record.clone());
            }
            continue;
        }
        if every.iter().any(|mapper| mapper.to_index(&record.chr).is_ok()) {
            continue;
        }
        let Some(mapper) = own.first() else {
            continue;
        };
        match matcher.classify(mapper, &record.chr) {
            Ok(ChrClass::Unplaced) => out.omissions.push(view.omission(
                StratCategory::Other,
                Some(name),
                OmissionReason::UnplacedRecord {
                    chr: record.chr.clone(),
                    start: record.start,
                    end: record.end,
                },
            )),
            Ok(ChrClass::Placed(_)) => kept.push(record.clone()),
            Err(err) => out.errors.push(err),
        }
    }
    if kept.is_empty() {
        out.omissions.push(view.omission(
            StratCategory::Other,
            Some(name),
            OmissionReason::ChromosomesFiltered { needed },
        ));
        return None;
    }
    kept.sort();
    Some(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom::{ChrIndex, ChrPattern};
    use crate::model::{HapSource, Location, SourceFile};
    use crate::topology::PerParent;

    fn half(location: &str, parent: Parent) -> HapSource {
        HapSource {
            file: SourceFile {
                location: Location::File(location.to_string()),
                md5: None,
            },
            pattern: ChrPattern::parent_default(parent),
        }
    }

    #[test]
    fn diploid_mappers_cover_both_parents() {
        let sequence = SourceSet::Split(PerParent {
            pat: half("pat.fa", Parent::Pat),
            mat: half("mat.fa", Parent::Mat),
        });
        let every = mappers(&sequence, view_parents(Haplotype::Dip));
        assert_eq!(every.len(), 2);
        let pat = mappers(&sequence, view_parents(Haplotype::Pat));
        assert_eq!(pat.len(), 1);
        assert!(pat[0].to_index("chrX").is_err());
        assert_eq!(
            every
                .iter()
                .find_map(|mapper| mapper.to_index("chrX").ok()),
            Some(ChrIndex::X)
        );
    }
}
