//! Difficult-region unions built from other categories of the same label.
use super::{Draft, Emitted, OmissionReason, Operation, ViewPlan};
use crate::category::StratCategory;
use crate::pairs::complement_name;

const LOWMAP_AND_SEGDUPS: &str = "alllowmapandsegdupregions";
const ALL_DIFFICULT: &str = "alldifficultregions";

/// Optional contributors picked up when the label has them.
const EXTRAS: [&str; 7] = [
    "chrX_XTR",
    "chrY_XTR",
    "chrX_ampliconic",
    "chrY_ampliconic",
    "VDJ",
    "KIR",
    "MHC",
];

/// Artifact path for each prerequisite, or the categories that are missing.
fn prerequisites(
    view: &ViewPlan<'_>,
    out: &Emitted,
    needs: &[(StratCategory, &str)],
) -> Result<Vec<String>, Vec<StratCategory>> {
    let mut paths = Vec::new();
    let mut missing = Vec::new();
    for (category, name) in needs {
        match out.find(view.label(), name) {
            Some(artifact) => paths.push(artifact.path.clone()),
            None => missing.push(*category),
        }
    }
    if missing.is_empty() {
        Ok(paths)
    } else {
        Err(missing)
    }
}

/// The widest GC meta range of the label, if one was planned.
fn gc_meta(view: &ViewPlan<'_>, out: &Emitted) -> Option<String> {
    out.labelled(view.label())
        .filter(|artifact| {
            artifact.id.category == StratCategory::Gc && artifact.id.name.contains("orgt")
        })
        .map(|artifact| artifact.path.clone())
        .next()
}

pub(super) fn plan(view: &ViewPlan<'_>, required: bool, out: &mut Emitted) {
    let base = [
        (StratCategory::Segdups, "segdups"),
        (StratCategory::Mappability, "lowmappabilityall"),
    ];
    let lowmap = match prerequisites(view, out, &base) {
        Ok(paths) => {
            let mut draft = Draft::new(StratCategory::Union, LOWMAP_AND_SEGDUPS, Operation::Union);
            for path in &paths {
                draft = draft.after(path);
            }
            Some(out.add_pair(view.pair(draft, &complement_name(LOWMAP_AND_SEGDUPS))))
        }
        Err(needs) => {
            missing(view, LOWMAP_AND_SEGDUPS, needs, required, out);
            None
        }
    };

    let gc = gc_meta(view, out);
    let complexity = prerequisites(
        view,
        out,
        &[(StratCategory::LowComplexity, "AllTandemRepeatsandHomopolymers_slop5")],
    );
    let (Some(lowmap), Ok(complexity), Some(gc)) = (lowmap, &complexity, &gc) else {
        let mut needs: Vec<StratCategory> = base
            .iter()
            .filter(|(_, name)| out.find(view.label(), name).is_none())
            .map(|(category, _)| *category)
            .collect();
        if complexity.is_err() {
            needs.push(StratCategory::LowComplexity);
        }
        if gc.is_none() {
            needs.push(StratCategory::Gc);
        }
        missing(view, ALL_DIFFICULT, needs, required, out);
        return;
    };
    let mut draft =
        Draft::new(StratCategory::Union, ALL_DIFFICULT, Operation::Union).after(&lowmap);
    for path in complexity.iter().chain(std::iter::once(gc)) {
        draft = draft.after(path);
    }
    let extras: Vec<String> = EXTRAS
        .iter()
        .filter_map(|name| out.find(view.label(), name))
        .map(|artifact| artifact.path.clone())
        .collect();
    for path in &extras {
        draft = draft.after(path);
    }
    out.add_pair(view.pair(draft, &complement_name(ALL_DIFFICULT)));
}

fn missing(
    view: &ViewPlan<'_>,
    name: &str,
    needs: Vec<StratCategory>,
    required: bool,
    out: &mut Emitted,
) {
    if required {
        let missing = needs.iter().map(|category| category.as_str().to_string()).collect();
        out.errors
            .push(view.ctx.missing_required(StratCategory::Union, missing));
    } else {
        out.omissions.push(view.omission(
            StratCategory::Union,
            Some(name),
            OmissionReason::MissingPrerequisite { needs },
        ));
    }
}
