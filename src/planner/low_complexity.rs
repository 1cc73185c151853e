//! Homopolymers, tandem repeats, and satellites.
use super::{Discovered, Discovery, Draft, Emitted, NodeRef, OmissionReason, Operation, ViewPlan};
use crate::catalog::{SatelliteSource, SATELLITE_CLASS};
use crate::category::{SourceRole, StratCategory};
use crate::model::BedInput;
use crate::pairs::complement_name;

const SLOP: u32 = 5;
const REPSEQ: &str = "repseq";

/// Repeat-masker classes folded into the tandem repeat union.
const RMSK_TANDEM_CLASSES: [&str; 2] = ["Simple_repeat", "Low_complexity"];

/// `(name, min, max)` length bands.
type Band = (&'static str, u32, Option<u32>);

const HOMOPOLYMER_BANDS: [Band; 5] = [
    ("ge4", 4, None),
    ("4to6", 4, Some(6)),
    ("7to11", 7, Some(11)),
    ("12to20", 12, Some(20)),
    ("ge21", 21, None),
];

const IMPERFECT_BANDS: [Band; 2] = [("ge11", 11, None), ("ge21", 21, None)];

/// Unit length, table name, and bands of each simple-repeat table.
const TR_TABLES: [(u32, &str, [Band; 3]); 3] = [
    (
        2,
        "diTR",
        [
            ("11to50", 11, Some(50)),
            ("51to200", 51, Some(200)),
            ("ge201", 201, None),
        ],
    ),
    (
        3,
        "triTR",
        [
            ("15to50", 15, Some(50)),
            ("51to200", 51, Some(200)),
            ("ge201", 201, None),
        ],
    ),
    (
        4,
        "quadTR",
        [
            ("20to50", 20, Some(50)),
            ("51to200", 51, Some(200)),
            ("ge201", 201, None),
        ],
    ),
];

const TANDEM_BANDS: [Band; 5] = [
    ("le50bp", 0, Some(50)),
    ("51to200bp", 51, Some(200)),
    ("201to10000bp", 201, Some(10_000)),
    ("ge10001bp", 10_001, None),
    ("ge101bp", 101, None),
];

const ALL_HOMOPOLYMERS: &str = "AllHomopolymers_ge7bp_imperfectge11bp_slop5";
const ALL_TANDEM_AND_HOMOPOLYMERS: &str = "AllTandemRepeatsandHomopolymers_slop5";
const SATELLITES: &str = "satellites_slop5";

fn banded(draft: Draft, (_, min, max): Band) -> Draft {
    let draft = draft.param("min_length", min).param("slop", SLOP);
    match max {
        Some(max) => draft.param("max_length", max),
        None => draft,
    }
}

/// Homopolymers are called on all bases and on A/T and G/C runs alone.
const BASES: [Option<&str>; 3] = [None, Some("AT"), Some("GC")];

fn slop_name(stem: &str, bases: Option<&str>) -> String {
    match bases {
        Some(bases) => format!("{stem}_{bases}_slop5"),
        None => format!("{stem}_slop5"),
    }
}

fn homopolymer_name(band: &str, bases: Option<&str>) -> String {
    slop_name(&format!("SimpleRepeat_homopolymer_{band}"), bases)
}

fn imperfect_name(band: &str, bases: Option<&str>) -> String {
    slop_name(&format!("SimpleRepeat_imperfecthomopol{band}"), bases)
}

pub(super) fn plan(
    view: &ViewPlan<'_>,
    rmsk: &BedInput,
    simreps: &BedInput,
    satellites: SatelliteSource<'_>,
    out: &mut Emitted,
) {
    let category = StratCategory::LowComplexity;
    let sequence = view.sequence();

    let mut perfect = Vec::new();
    let mut imperfect = Vec::new();
    for bases in BASES {
        let homopolymer = |name: String| {
            let draft = Draft::scan(category, name, REPSEQ)
                .sources(sequence.clone())
                .param("unit_length", 1);
            match bases {
                Some(bases) => draft.param("bases", bases),
                None => draft,
            }
        };
        let mut called = Vec::new();
        for band in HOMOPOLYMER_BANDS {
            let draft = homopolymer(homopolymer_name(band.0, bases));
            called.push((band.0, out.add(view.finish(banded(draft, band)))));
        }
        // imperfect homopolymers grow out of the ge4 calls of the same bases
        let seed = called[0].1.clone();
        for band in IMPERFECT_BANDS {
            let draft = homopolymer(imperfect_name(band.0, bases))
                .after(&seed)
                .param("max_gap", 1);
            let path = out.add(view.finish(banded(draft, band)));
            if bases.is_none() {
                imperfect.push((band.0, path));
            }
        }
        if bases.is_none() {
            perfect = called;
        }
    }

    let simreps_uses = view.input(SourceRole::Simreps, simreps);
    for (unit, table, bands) in TR_TABLES {
        for band in bands {
            let name = format!("SimpleRepeat_{table}_{}_slop5", band.0);
            let draft = Draft::new(category, name, Operation::Normalize)
                .sources(simreps_uses.clone())
                .param("unit_length", unit);
            out.add(view.finish(banded(draft, band)));
        }
    }

    let satellite_path = plan_satellites(view, satellites, out);

    let rmsk_uses = view.input(SourceRole::Rmsk, rmsk);
    let mut tandem = Vec::new();
    for band in TANDEM_BANDS {
        let name = format!("AllTandemRepeats_{}_slop5", band.0);
        let mut draft = Draft::new(category, name, Operation::Union)
            .sources(simreps_uses.clone())
            .sources(rmsk_uses.clone())
            .param("rmsk_classes", RMSK_TANDEM_CLASSES.to_vec());
        if let Some(path) = &satellite_path {
            draft = draft.after(path);
        }
        tandem.push(out.add(view.finish(banded(draft, band))));
    }

    let mut homopolymers =
        Draft::new(category, ALL_HOMOPOLYMERS, Operation::Union).param("slop", SLOP);
    for (band, path) in &perfect {
        if matches!(*band, "7to11" | "12to20" | "ge21") {
            homopolymers = homopolymers.after(path);
        }
    }
    for (band, path) in &imperfect {
        if *band == "ge11" {
            homopolymers = homopolymers.after(path);
        }
    }
    let homopolymers_path =
        out.add_pair(view.pair(homopolymers, &complement_name(ALL_HOMOPOLYMERS)));

    let mut all = Draft::new(category, ALL_TANDEM_AND_HOMOPOLYMERS, Operation::Union)
        .after(&homopolymers_path)
        .param("slop", SLOP);
    // the four disjoint bands cover every length
    for path in tandem.iter().take(4) {
        all = all.after(path);
    }
    out.add_pair(view.pair(all, &complement_name(ALL_TANDEM_AND_HOMOPOLYMERS)));
}

/// Plan the satellite pair, or record why it is held back. Returns the
/// region path when one was planned.
fn plan_satellites(
    view: &ViewPlan<'_>,
    satellites: SatelliteSource<'_>,
    out: &mut Emitted,
) -> Option<String> {
    let category = StratCategory::LowComplexity;
    let draft = Draft::new(category, SATELLITES, Operation::Normalize)
        .selection(satellites.selection())
        .param("slop", SLOP);
    let (rmsk_input, class_col) = match satellites {
        SatelliteSource::Explicit(input) => {
            let draft = draft.sources(view.input(SourceRole::Satellites, input));
            return Some(out.add_pair(view.pair(draft, &complement_name(SATELLITES))));
        }
        SatelliteSource::FromRmsk { rmsk, class_col } => (rmsk, class_col),
    };
    let outcome = match view.ctx.catalog.rmsk_classes(rmsk_input) {
        Some(classes) => Discovered::Known(classes.contains(SATELLITE_CLASS)),
        None => Discovered::Pending,
    };
    let id = format!(
        "{}@{}:rmsk-class:{SATELLITE_CLASS}",
        view.label(),
        view.ctx.build.key
    );
    let uses = view.input(SourceRole::Rmsk, rmsk_input);
    let producers = uses
        .iter()
        .map(|source| NodeRef::Source {
            location: source.location.as_str().to_string(),
        })
        .collect();
    let planned = match outcome {
        Discovered::Known(false) => {
            out.omissions.push(view.omission(
                category,
                Some(SATELLITES),
                OmissionReason::DiscoveryEmpty {
                    class: SATELLITE_CLASS.to_string(),
                },
            ));
            None
        }
        Discovered::Known(true) | Discovered::Pending => {
            let draft = draft
                .sources(uses)
                .input(NodeRef::Discovery { id: id.clone() })
                .param("class_col", class_col)
                .param("class", SATELLITE_CLASS);
            let pair = view.pair(draft, &complement_name(SATELLITES));
            let consumers = vec![pair.region.path.clone(), pair.complement.path.clone()];
            Some((out.add_pair(pair), consumers))
        }
    };
    tracing::debug!(
        label = view.label(),
        discovery = %id,
        pending = matches!(outcome, Discovered::Pending),
        "satellites drawn from rmsk class column"
    );
    let (region, consumers) = match planned {
        Some((region, consumers)) => (Some(region), consumers),
        None => (None, Vec::new()),
    };
    out.discoveries.push(Discovery {
        id,
        producers,
        column: class_col,
        wanted: SATELLITE_CLASS.to_string(),
        consumers,
        outcome,
    });
    region
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homopolymer_names_carry_base_composition() {
        assert_eq!(
            homopolymer_name("7to11", None),
            "SimpleRepeat_homopolymer_7to11_slop5"
        );
        assert_eq!(
            homopolymer_name("ge21", Some("AT")),
            "SimpleRepeat_homopolymer_ge21_AT_slop5"
        );
        assert_eq!(
            imperfect_name("ge11", Some("GC")),
            "SimpleRepeat_imperfecthomopolge11_GC_slop5"
        );
        assert_eq!(
            imperfect_name("ge21", None),
            "SimpleRepeat_imperfecthomopolge21_slop5"
        );
    }

    #[test]
    fn tandem_bands_are_contiguous() {
        let bands: Vec<Band> = TANDEM_BANDS.iter().take(4).copied().collect();
        for pair in bands.windows(2) {
            assert_eq!(pair[0].2.map(|max| max + 1), Some(pair[1].1));
        }
        assert_eq!(bands[3].2, None);
    }
}
