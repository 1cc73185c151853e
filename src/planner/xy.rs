//! Sex chromosome features and the autosome set.
use super::{Draft, Emitted, NodeRef, OmissionReason, Operation, ViewPlan};
use crate::catalog::{reference_pattern, view_chromosomes, view_parents};
use crate::category::{SourceRole, StratCategory};
use crate::chrom::ChrIndex;
use crate::model::{BedInput, ParRegions, XyInputs};
use crate::naming::UniverseKind;
use std::collections::BTreeSet;

const XTR_FEATURE: &str = "XTR";
const AMPLICONIC_FEATURE: &str = "Ampliconic";

/// Literal names of `index` in the reference, one per parental copy that
/// carries it.
fn literals(view: &ViewPlan<'_>, index: ChrIndex) -> Vec<String> {
    let sequence = &view.ctx.catalog.reference().sequence;
    let mut names: Vec<String> = view_parents(view.view.haplotype)
        .into_iter()
        .filter_map(|parent| reference_pattern(sequence, parent))
        .filter_map(|pattern| pattern.to_literal(index))
        .collect();
    names.dedup();
    names
}

fn par_records(names: &[String], par: &ParRegions) -> serde_json::Value {
    let records: Vec<serde_json::Value> = names
        .iter()
        .flat_map(|name| {
            [par.start, par.end]
                .into_iter()
                .map(move |(start, end)| serde_json::json!([name, start, end]))
        })
        .collect();
    serde_json::Value::Array(records)
}

pub(super) fn plan(view: &ViewPlan<'_>, inputs: &XyInputs, out: &mut Emitted) {
    let category = StratCategory::Xy;
    let defined = view_chromosomes(&view.ctx.catalog.reference().sequence, view.view.haplotype);
    let sexes = [
        (ChrIndex::X, inputs.x_par, SourceRole::XFeatures),
        (ChrIndex::Y, inputs.y_par, SourceRole::YFeatures),
    ];
    for (index, par, role) in sexes {
        let chr = format!("chr{}", index.designator());
        let features = inputs.features.as_ref().map(|features| {
            let bed = if index == ChrIndex::X {
                &features.x_bed
            } else {
                &features.y_bed
            };
            (bed, features.xtr, features.ampliconic)
        });
        let mut wanted: Vec<String> = Vec::new();
        if par.is_some() {
            wanted.push(format!("{chr}_PAR"));
        }
        if let Some((_, xtr, ampliconic)) = features {
            if xtr {
                wanted.push(format!("{chr}_XTR"));
            }
            if ampliconic {
                wanted.push(format!("{chr}_ampliconic"));
            }
        }
        if !view.chromosomes.contains(&index) {
            if defined.contains(&index) {
                for name in &wanted {
                    out.omissions.push(view.omission(
                        category,
                        Some(name),
                        OmissionReason::ChromosomesFiltered {
                            needed: BTreeSet::from([index]),
                        },
                    ));
                }
            }
            continue;
        }
        let names = literals(view, index);
        if let Some(par) = par {
            let draft = Draft::new(category, format!("{chr}_PAR"), Operation::Literal)
                .universe(UniverseKind::ParY)
                .param("records", par_records(&names, &par));
            out.add(view.finish(draft));
        }
        if let Some((bed, xtr, ampliconic)) = features {
            if xtr {
                let name = format!("{chr}_XTR");
                out.add(view.finish(feature(view, bed, role, &name, XTR_FEATURE, &names)));
            }
            if ampliconic {
                out.add(view.finish(feature(
                    view,
                    bed,
                    role,
                    &format!("{chr}_ampliconic"),
                    AMPLICONIC_FEATURE,
                    &names,
                )));
            }
        }
    }

    let autosomes: Vec<u8> = view
        .chromosomes
        .iter()
        .filter(|index| index.is_autosome())
        .map(|index| index.value())
        .collect();
    if !autosomes.is_empty() {
        let draft = Draft::new(category, "AllAutosomes", Operation::Normalize)
            .input(NodeRef::Universe {
                path: view.universe(UniverseKind::Auto),
            })
            .param("autosomes", autosomes);
        out.add(view.finish(draft));
    }
}

fn feature(
    view: &ViewPlan<'_>,
    bed: &BedInput,
    role: SourceRole,
    name: &str,
    feature: &str,
    literals: &[String],
) -> Draft {
    Draft::new(StratCategory::Xy, name, Operation::Normalize)
        .universe(UniverseKind::ParY)
        .sources(view.input(role, bed))
        .param("feature", feature)
        .param("chromosomes", literals.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn par_records_cover_both_regions_per_copy() {
        let par = ParRegions {
            start: (10_000, 2_781_479),
            end: (155_701_383, 156_030_895),
        };
        let records = par_records(&["chrX".to_string()], &par);
        assert_eq!(
            records,
            serde_json::json!([["chrX", 10_000, 2_781_479], ["chrX", 155_701_383, 156_030_895]])
        );
    }
}
