//! Stratification categories, output levels, and source roles.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role a declared source plays for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Reference,
    Gap,
    Rmsk,
    Simreps,
    Satellites,
    XFeatures,
    YFeatures,
    XPar,
    YPar,
    UnplacedPatterns,
    Superdups,
    Ftbl,
    Gff,
    Other,
    BenchVcf,
    QueryVcf,
    BenchBed,
}

impl SourceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceRole::Reference => "reference",
            SourceRole::Gap => "gap",
            SourceRole::Rmsk => "rmsk",
            SourceRole::Simreps => "simreps",
            SourceRole::Satellites => "satellites",
            SourceRole::XFeatures => "x_features",
            SourceRole::YFeatures => "y_features",
            SourceRole::XPar => "x_par",
            SourceRole::YPar => "y_par",
            SourceRole::UnplacedPatterns => "unplaced_chr_patterns",
            SourceRole::Superdups => "superdups",
            SourceRole::Ftbl => "ftbl",
            SourceRole::Gff => "gff",
            SourceRole::Other => "other",
            SourceRole::BenchVcf => "bench_vcf",
            SourceRole::QueryVcf => "query_vcf",
            SourceRole::BenchBed => "bench_bed",
        }
    }
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StratCategory {
    Gap,
    LowComplexity,
    Xy,
    Segdups,
    Functional,
    Vdj,
    Kir,
    Mhc,
    Mappability,
    Gc,
    Telomere,
    Union,
    Other,
    Diploid,
}

impl StratCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StratCategory::Gap => "gap",
            StratCategory::LowComplexity => "low_complexity",
            StratCategory::Xy => "xy",
            StratCategory::Segdups => "segdups",
            StratCategory::Functional => "functional",
            StratCategory::Vdj => "vdj",
            StratCategory::Kir => "kir",
            StratCategory::Mhc => "mhc",
            StratCategory::Mappability => "mappability",
            StratCategory::Gc => "gc",
            StratCategory::Telomere => "telomere",
            StratCategory::Union => "union",
            StratCategory::Other => "other",
            StratCategory::Diploid => "diploid",
        }
    }

    /// Declared roles backing this category. The category resolves to
    /// absent when none of them is declared; an empty list means the
    /// reference sequence alone suffices.
    pub fn source_roles(self) -> &'static [SourceRole] {
        match self {
            StratCategory::Gap => &[SourceRole::Gap],
            StratCategory::LowComplexity => &[SourceRole::Rmsk, SourceRole::Simreps],
            StratCategory::Xy => &[
                SourceRole::XFeatures,
                SourceRole::YFeatures,
                SourceRole::XPar,
                SourceRole::YPar,
            ],
            StratCategory::Segdups => &[SourceRole::Superdups],
            StratCategory::Functional
            | StratCategory::Vdj
            | StratCategory::Kir
            | StratCategory::Mhc => &[SourceRole::Ftbl, SourceRole::Gff],
            StratCategory::Mappability => &[SourceRole::UnplacedPatterns],
            StratCategory::Gc
            | StratCategory::Telomere
            | StratCategory::Union
            | StratCategory::Other
            | StratCategory::Diploid => &[],
        }
    }

    /// Built-in level, `None` for user-defined other strats.
    pub fn level(self) -> Option<Level> {
        match self {
            StratCategory::Gap | StratCategory::Vdj | StratCategory::Kir | StratCategory::Mhc => {
                Some(Level::OtherDifficult)
            }
            StratCategory::LowComplexity => Some(Level::LowComplexity),
            StratCategory::Xy => Some(Level::Xy),
            StratCategory::Segdups => Some(Level::SegmentalDuplications),
            StratCategory::Functional => Some(Level::Functional),
            StratCategory::Mappability => Some(Level::Mappability),
            StratCategory::Gc => Some(Level::GcContent),
            StratCategory::Telomere => Some(Level::Telomere),
            StratCategory::Union => Some(Level::Union),
            StratCategory::Diploid => Some(Level::Diploid),
            StratCategory::Other => None,
        }
    }
}

impl fmt::Display for StratCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output directory under a build, e.g. `LowComplexity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    OtherDifficult,
    LowComplexity,
    GcContent,
    Mappability,
    SegmentalDuplications,
    Functional,
    Telomere,
    Xy,
    Union,
    Diploid,
    Other(String),
}

impl Level {
    const BUILT_IN: [Level; 10] = [
        Level::OtherDifficult,
        Level::LowComplexity,
        Level::GcContent,
        Level::Mappability,
        Level::SegmentalDuplications,
        Level::Functional,
        Level::Telomere,
        Level::Xy,
        Level::Union,
        Level::Diploid,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Level::OtherDifficult => "OtherDifficult",
            Level::LowComplexity => "LowComplexity",
            Level::GcContent => "GCcontent",
            Level::Mappability => "Mappability",
            Level::SegmentalDuplications => "SegmentalDuplications",
            Level::Functional => "Functional",
            Level::Telomere => "Telomere",
            Level::Xy => "XY",
            Level::Union => "Union",
            Level::Diploid => "Diploid",
            Level::Other(key) => key,
        }
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Level::BUILT_IN
            .into_iter()
            .find(|level| level.as_str() == value)
            .unwrap_or(Level::Other(value))
    }
}

impl From<Level> for String {
    fn from(level: Level) -> String {
        level.as_str().to_string()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RESERVED_NAMES: &[&str] = &[
    "gaps_slop15kb",
    "VDJ",
    "KIR",
    "MHC",
    "AllTandemRepeatsandHomopolymers_slop5",
    "AllHomopolymers_ge7bp_imperfectge11bp_slop5",
    "satellites_slop5",
    "lowmappabilityall",
    "segdups",
    "segdups_gt10kb",
    "refseq_cds",
    "telomeres",
    "AllAutosomes",
    "alllowmapandsegdupregions",
    "alldifficultregions",
    "het_regions_slop50",
    "hom_regions_slop50",
];

const RESERVED_PREFIXES: &[&str] = &[
    "notin",
    "nonunique_",
    "gclt",
    "gcgt",
    "SimpleRepeat_",
    "AllTandemRepeats_",
    "chrX_",
    "chrY_",
];

/// True when `name` is, or belongs to a family of, built-in artifact names.
pub fn is_reserved_name(name: &str) -> bool {
    if RESERVED_NAMES.contains(&name) {
        return true;
    }
    if RESERVED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
    {
        return true;
    }
    // simple GC ranges: gc{a}to{b}_slop50
    name.strip_prefix("gc")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_cover_fixed_and_family_names() {
        for name in [
            "segdups",
            "notinsegdups",
            "nonunique_l100_m2_e1",
            "gc25to30_slop50",
            "gclt25orgt65_slop50",
            "SimpleRepeat_diTR_11to50_slop5",
            "chrX_PAR",
        ] {
            assert!(is_reserved_name(name), "{name}");
        }
        for name in ["Ancestry_AFR", "gcc", "my_segdups", "KIR_extra"] {
            assert!(!is_reserved_name(name), "{name}");
        }
    }

    #[test]
    fn levels_round_trip_through_strings() {
        assert_eq!(Level::from("GCcontent".to_string()), Level::GcContent);
        assert_eq!(
            Level::from("Ancestry".to_string()),
            Level::Other("Ancestry".to_string())
        );
        assert_eq!(String::from(Level::Xy), "XY");
    }

    #[test]
    fn reference_only_categories_have_no_roles() {
        assert!(StratCategory::Gc.source_roles().is_empty());
        assert_eq!(StratCategory::Vdj.level(), Some(Level::OtherDifficult));
        assert_eq!(StratCategory::Other.level(), None);
    }
}
