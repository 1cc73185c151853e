//! Heterozygous and homozygous regions of a diploid assembly.
use super::{Draft, Emitted, ViewPlan};
use crate::category::StratCategory;
use crate::topology::{Haplotype, OutputView};

const SLOP: u32 = 50;

/// Regions where the two haplotypes differ, paired with the regions where
/// they agree. Both haplotypes' sequences feed every label.
pub(super) fn plan(view: &ViewPlan<'_>, out: &mut Emitted) {
    let both = OutputView::new(view.label(), Haplotype::Dip);
    let mut sequence = view
        .ctx
        .catalog
        .sequence_uses(&both, &view.chromosomes);
    sequence.sort_by(|a, b| a.haplotype.cmp(&b.haplotype));
    let draft = Draft::scan(StratCategory::Diploid, "het_regions_slop50", "dipcall")
        .sources(sequence)
        .param("slop", SLOP);
    out.add_pair(view.pair(draft, "hom_regions_slop50"));
}
