//! GC content ranges.
use super::{Draft, Emitted, Operation, ViewPlan};
use crate::category::StratCategory;
use crate::model::GcParams;

const SLOP: u32 = 50;
const WINDOW: u32 = 100;

/// One GC bucket, named without the slop suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcRange {
    /// Percent in `[lower, upper)`; a missing bound is open.
    Simple {
        name: String,
        lower: Option<u32>,
        upper: Option<u32>,
    },
    /// Below `low` or at least `high`.
    Meta { name: String, low: u32, high: u32 },
}

impl GcRange {
    pub fn name(&self) -> &str {
        match self {
            GcRange::Simple { name, .. } | GcRange::Meta { name, .. } => name,
        }
    }

    fn covered_by(&self, low: u32, high: u32) -> bool {
        match self {
            GcRange::Simple { upper: Some(upper), .. } if *upper <= low => true,
            GcRange::Simple { lower: Some(lower), .. } => *lower >= high,
            _ => false,
        }
    }
}

/// Every range for validated bounds: simple ranges in ascending order, then
/// meta ranges pairing range-bound lows ascending with range-bound highs
/// descending.
pub(super) fn gc_ranges(params: &GcParams) -> Vec<GcRange> {
    let lows: Vec<u32> = params.low_sorted().iter().map(|bound| bound.percent).collect();
    let highs: Vec<u32> = params.high_sorted().iter().map(|bound| bound.percent).collect();
    let (Some(first), Some(last)) = (lows.first(), highs.last()) else {
        return Vec::new();
    };
    let mut ranges = vec![GcRange::Simple {
        name: format!("gclt{first}"),
        lower: None,
        upper: Some(*first),
    }];
    let cuts: Vec<u32> = lows.iter().chain(highs.iter()).copied().collect();
    for pair in cuts.windows(2) {
        ranges.push(GcRange::Simple {
            name: format!("gc{}to{}", pair[0], pair[1]),
            lower: Some(pair[0]),
            upper: Some(pair[1]),
        });
    }
    ranges.push(GcRange::Simple {
        name: format!("gcgt{last}"),
        lower: Some(*last),
        upper: None,
    });

    let meta_lows = params
        .low_sorted()
        .into_iter()
        .filter(|bound| bound.range_bound)
        .map(|bound| bound.percent);
    let meta_highs = params
        .high_sorted()
        .into_iter()
        .rev()
        .filter(|bound| bound.range_bound)
        .map(|bound| bound.percent);
    for (low, high) in meta_lows.zip(meta_highs) {
        ranges.push(GcRange::Meta {
            name: format!("gclt{low}orgt{high}"),
            low,
            high,
        });
    }
    ranges
}

pub(super) fn plan(view: &ViewPlan<'_>, params: &GcParams, out: &mut Emitted) {
    let ranges = gc_ranges(params);
    let mut simple: Vec<(&GcRange, String)> = Vec::new();
    for range in &ranges {
        let name = format!("{}_slop{SLOP}", range.name());
        match range {
            GcRange::Simple { lower, upper, .. } => {
                let mut draft = Draft::scan(StratCategory::Gc, name, "gc_content")
                    .sources(view.sequence())
                    .param("window", WINDOW)
                    .param("slop", SLOP);
                if let Some(lower) = lower {
                    draft = draft.param("lower", *lower);
                }
                if let Some(upper) = upper {
                    draft = draft.param("upper", *upper);
                }
                simple.push((range, out.add(view.finish(draft))));
            }
            GcRange::Meta { low, high, .. } => {
                let mut draft = Draft::new(StratCategory::Gc, name, Operation::Union)
                    .param("low", *low)
                    .param("high", *high);
                for (part, path) in &simple {
                    if part.covered_by(*low, *high) {
                        draft = draft.after(path);
                    }
                }
                out.add(view.finish(draft));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GcBound;

    fn params(low: &[(u32, bool)], high: &[(u32, bool)]) -> GcParams {
        let bounds = |items: &[(u32, bool)]| {
            items
                .iter()
                .map(|(percent, flag)| GcBound::new(*percent, *flag))
                .collect()
        };
        GcParams {
            low: bounds(low),
            high: bounds(high),
        }
    }

    fn names(ranges: &[GcRange]) -> Vec<&str> {
        ranges.iter().map(GcRange::name).collect()
    }

    #[test]
    fn meta_ranges_pair_in_reverse_order() {
        let ranges = gc_ranges(&params(&[(25, true), (30, true)], &[(55, true), (65, true)]));
        assert_eq!(
            names(&ranges),
            vec![
                "gclt25",
                "gc25to30",
                "gc30to55",
                "gc55to65",
                "gcgt65",
                "gclt25orgt65",
                "gclt30orgt55",
            ]
        );
    }

    #[test]
    fn unflagged_bounds_only_make_simple_ranges() {
        let ranges = gc_ranges(&params(&[(30, false), (20, false)], &[(60, false)]));
        assert_eq!(names(&ranges), vec!["gclt20", "gc20to30", "gc30to60", "gcgt60"]);
    }

    #[test]
    fn meta_range_covers_outer_buckets() {
        let ranges = gc_ranges(&GcParams::default());
        let covered: Vec<&str> = ranges
            .iter()
            .filter(|range| range.covered_by(25, 65))
            .map(GcRange::name)
            .collect();
        assert_eq!(
            covered,
            vec![
                "gclt15", "gc15to20", "gc20to25", "gc65to70", "gc70to75", "gc75to80", "gc80to85",
                "gcgt85"
            ]
        );
    }
}
