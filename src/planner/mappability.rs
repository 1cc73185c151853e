//! Low-mappability regions.
use super::{Draft, Emitted, Operation, ViewPlan};
use crate::category::StratCategory;
use crate::model::{LowMapParams, MappabilityInputs};
use crate::pairs::complement_name;
use std::collections::BTreeSet;

const LOW_MAPPABILITY_ALL: &str = "lowmappabilityall";

pub(super) fn nonunique_name(params: &LowMapParams) -> String {
    format!(
        "nonunique_l{}_m{}_e{}",
        params.length, params.mismatches, params.indels
    )
}

pub(super) fn plan(
    view: &ViewPlan<'_>,
    params: &BTreeSet<LowMapParams>,
    inputs: &MappabilityInputs,
    out: &mut Emitted,
) {
    let sequence = view.sequence();
    let mut all = Draft::new(StratCategory::Mappability, LOW_MAPPABILITY_ALL, Operation::Union);
    for entry in params {
        // unplaced contigs stay in the alignment index
        let draft = Draft::scan(StratCategory::Mappability, nonunique_name(entry), "gem")
            .sources(sequence.clone())
            .param("length", entry.length)
            .param("mismatches", entry.mismatches)
            .param("indels", entry.indels)
            .param("unplaced_chr_patterns", inputs.unplaced_chr_patterns.clone());
        let path = out.add(view.finish(draft));
        all = all.after(&path);
    }
    out.add_pair(view.pair(all, &complement_name(LOW_MAPPABILITY_ALL)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_embed_every_parameter() {
        let params = LowMapParams {
            length: 100,
            mismatches: 2,
            indels: 1,
        };
        assert_eq!(nonunique_name(&params), "nonunique_l100_m2_e1");
    }
}
