//! Annotation-derived regions: coding sequence and the immune loci.
use super::{Draft, Emitted, OmissionReason, Operation, ViewPlan};
use crate::catalog::SourceUse;
use crate::category::{SourceRole, StratCategory};
use crate::chrom::ChrIndex;
use crate::model::FunctionalInputs;
use crate::pairs::complement_name;
use std::collections::BTreeSet;

const CDS: &str = "refseq_cds";

/// Loci and the chromosomes that carry them.
const LOCI: [(StratCategory, &str, &[u32]); 3] = [
    (StratCategory::Vdj, "VDJ", &[2, 7, 14, 22]),
    (StratCategory::Kir, "KIR", &[19]),
    (StratCategory::Mhc, "MHC", &[6]),
];

/// Which annotation categories the build switched on.
#[derive(Debug, Clone, Copy)]
pub(super) struct Wanted {
    pub(super) cds: bool,
    pub(super) vdj: bool,
    pub(super) kir: bool,
    pub(super) mhc: bool,
}

impl Wanted {
    fn locus(&self, category: StratCategory) -> bool {
        match category {
            StratCategory::Vdj => self.vdj,
            StratCategory::Kir => self.kir,
            StratCategory::Mhc => self.mhc,
            _ => false,
        }
    }
}

pub(super) fn plan(
    view: &ViewPlan<'_>,
    inputs: &FunctionalInputs,
    wanted: Wanted,
    out: &mut Emitted,
) {
    let mut annotations: Vec<SourceUse> = view.input(SourceRole::Ftbl, &inputs.ftbl);
    annotations.extend(view.input(SourceRole::Gff, &inputs.gff));
    if wanted.cds {
        let draft = Draft::new(StratCategory::Functional, CDS, Operation::Normalize)
            .sources(annotations.clone())
            .param("feature", "CDS")
            .param("source", "BestRefSeq");
        out.add_pair(view.pair(draft, &complement_name(CDS)));
    }
    for (category, name, carriers) in LOCI {
        if !wanted.locus(category) {
            continue;
        }
        let needed: BTreeSet<ChrIndex> = carriers
            .iter()
            .filter_map(|value| ChrIndex::new(*value))
            .collect();
        if view.chromosomes.is_disjoint(&needed) {
            out.omissions.push(view.omission(
                category,
                Some(name),
                OmissionReason::ChromosomesFiltered { needed },
            ));
            continue;
        }
        let draft = Draft::new(category, name, Operation::Normalize)
            .sources(annotations.clone())
            .param("locus", name);
        out.add(view.finish(draft));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loci_live_in_other_difficult() {
        for (category, _, carriers) in LOCI {
            assert_eq!(category.level(), Some(crate::category::Level::OtherDifficult));
            assert!(!carriers.is_empty());
        }
    }
}
