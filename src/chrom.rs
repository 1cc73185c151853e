//! Chromosome indices and per-source naming conventions.
//!
//! Every literal chromosome name goes through a `ChrNameMapper`. Names from a
//! source file reach the reference only through an explicit `ChrConversion`
//! that composes the source mapping with the reference mapping.
use crate::errors::PlanError;
use crate::topology::{Haplotype, Parent, PerParent};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const INDEX_PLACEHOLDER: &str = "%i";
pub const HAP_PLACEHOLDER: &str = "%h";

/// Canonical chromosome index, 1-22 plus X (23) and Y (24).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChrIndex(u8);

impl ChrIndex {
    pub const X: ChrIndex = ChrIndex(23);
    pub const Y: ChrIndex = ChrIndex(24);

    pub fn new(value: u32) -> Option<ChrIndex> {
        if (1..=24).contains(&value) {
            Some(ChrIndex(value as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = ChrIndex> {
        (1u8..=24).map(ChrIndex)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_autosome(self) -> bool {
        self.0 <= 22
    }

    /// Standard designator substituted into templates: `1`..`22`, `X`, `Y`.
    pub fn designator(self) -> String {
        match self.0 {
            23 => "X".to_string(),
            24 => "Y".to_string(),
            n => n.to_string(),
        }
    }

    pub fn from_designator(text: &str) -> Option<ChrIndex> {
        match text {
            "X" => Some(ChrIndex::X),
            "Y" => Some(ChrIndex::Y),
            _ => {
                if text.starts_with('0') {
                    return None;
                }
                let value: u32 = text.parse().ok()?;
                if (1..=22).contains(&value) {
                    ChrIndex::new(value)
                } else {
                    None
                }
            }
        }
    }
}

impl TryFrom<u8> for ChrIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ChrIndex::new(u32::from(value))
            .ok_or_else(|| format!("chromosome index {value} outside 1-24"))
    }
}

impl From<ChrIndex> for u8 {
    fn from(index: ChrIndex) -> u8 {
        index.0
    }
}

impl fmt::Display for ChrIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.designator())
    }
}

/// Naming convention for a single-haplotype file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChrPattern {
    pub template: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub special: BTreeMap<ChrIndex, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub exclusions: BTreeSet<ChrIndex>,
}

impl Default for ChrPattern {
    fn default() -> Self {
        Self {
            template: "chr%i".to_string(),
            special: BTreeMap::new(),
            exclusions: BTreeSet::new(),
        }
    }
}

impl ChrPattern {
    /// Default pattern for one haplotype file of a split diploid reference;
    /// the paternal haplotype carries no X and the maternal no Y.
    pub fn parent_default(parent: Parent) -> Self {
        Self {
            exclusions: BTreeSet::from([default_exclusion(parent)]),
            ..Self::default()
        }
    }

    pub fn to_literal(&self, index: ChrIndex) -> Option<String> {
        if self.exclusions.contains(&index) {
            return None;
        }
        if let Some(name) = self.special.get(&index) {
            return Some(name.clone());
        }
        Some(self.template.replace(INDEX_PLACEHOLDER, &index.designator()))
    }

    /// Indices this pattern names.
    pub fn defined(&self) -> BTreeSet<ChrIndex> {
        ChrIndex::all()
            .filter(|index| !self.exclusions.contains(index))
            .collect()
    }

    /// Structural problems with this pattern; empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let count = self.template.matches(INDEX_PLACEHOLDER).count();
        if count != 1 {
            problems.push(format!(
                "template {:?} must contain '{INDEX_PLACEHOLDER}' exactly once",
                self.template
            ));
        }
        if self.template.contains(HAP_PLACEHOLDER) {
            problems.push(format!(
                "template {:?} is single-haplotype and must not contain '{HAP_PLACEHOLDER}'",
                self.template
            ));
        }
        problems.extend(special_problems(&self.special));
        if problems.is_empty() {
            problems.extend(duplicate_literals(ChrIndex::all().filter_map(|index| {
                self.to_literal(index).map(|name| (index.designator(), name))
            })));
        }
        problems
    }
}

fn default_exclusion(parent: Parent) -> ChrIndex {
    match parent {
        Parent::Pat => ChrIndex::X,
        Parent::Mat => ChrIndex::Y,
    }
}

/// Haplotype names embedded in combined diploid chromosome names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapNames {
    pub pat: String,
    pub mat: String,
}

/// Naming convention for a combined diploid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DipChrPattern {
    pub template: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub special: BTreeMap<ChrIndex, String>,
    pub hapnames: HapNames,
    pub exclusions: PerParent<BTreeSet<ChrIndex>>,
}

impl Default for DipChrPattern {
    fn default() -> Self {
        Self {
            template: "chr%i_%h".to_string(),
            special: BTreeMap::new(),
            hapnames: HapNames {
                pat: "PATERNAL".to_string(),
                mat: "MATERNAL".to_string(),
            },
            exclusions: PerParent {
                pat: BTreeSet::from([default_exclusion(Parent::Pat)]),
                mat: BTreeSet::from([default_exclusion(Parent::Mat)]),
            },
        }
    }
}

impl DipChrPattern {
    /// The single-haplotype view of this pattern.
    pub fn for_parent(&self, parent: Parent) -> ChrPattern {
        let hapname = match parent {
            Parent::Pat => &self.hapnames.pat,
            Parent::Mat => &self.hapnames.mat,
        };
        ChrPattern {
            template: self.template.replace(HAP_PLACEHOLDER, hapname),
            special: self.special.clone(),
            exclusions: self.exclusions.get(parent).clone(),
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.template.matches(INDEX_PLACEHOLDER).count() != 1
            || self.template.matches(HAP_PLACEHOLDER).count() != 1
        {
            problems.push(format!(
                "template {:?} must contain '{INDEX_PLACEHOLDER}' and '{HAP_PLACEHOLDER}' exactly once",
                self.template
            ));
        }
        if self.hapnames.pat.is_empty() || self.hapnames.mat.is_empty() {
            problems.push("hapnames must be non-empty".to_string());
        } else if self.hapnames.pat == self.hapnames.mat {
            problems.push(format!(
                "hapnames must differ (both are {:?})",
                self.hapnames.pat
            ));
        }
        problems.extend(special_problems(&self.special));
        if problems.is_empty() {
            // pat and mat copies are distinct sequences, so each owns its names
            let literals = Parent::BOTH.into_iter().flat_map(|parent| {
                let pattern = self.for_parent(parent);
                ChrIndex::all().filter_map(move |index| {
                    let owner = format!("{}_{}", index.designator(), parent.haplotype().as_str());
                    pattern.to_literal(index).map(|name| (owner, name))
                })
            });
            problems.extend(duplicate_literals(literals));
        }
        problems
    }
}

fn special_problems(special: &BTreeMap<ChrIndex, String>) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen: BTreeMap<&str, ChrIndex> = BTreeMap::new();
    for (index, name) in special {
        if name.trim().is_empty() {
            problems.push(format!("special name for chromosome {index} is empty"));
            continue;
        }
        if let Some(previous) = seen.insert(name.as_str(), *index) {
            problems.push(format!(
                "special name {name:?} is used for both chromosome {previous} and {index}"
            ));
        }
    }
    problems
}

/// Names produced by more than one owner, where an owner is one chromosome
/// of one sequence.
fn duplicate_literals(literals: impl Iterator<Item = (String, String)>) -> Vec<String> {
    let mut owners: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (owner, name) in literals {
        owners.entry(name).or_default().insert(owner);
    }
    owners
        .into_iter()
        .filter(|(_, owned_by)| owned_by.len() > 1)
        .map(|(name, owned_by)| {
            let listed: Vec<String> = owned_by.into_iter().collect();
            format!(
                "chromosome name {name:?} is produced by several chromosomes ({})",
                listed.join(", ")
            )
        })
        .collect()
}

/// Bidirectional index/name mapping for one pattern.
#[derive(Debug, Clone)]
pub struct ChrNameMapper {
    pattern: ChrPattern,
    reverse_special: BTreeMap<String, ChrIndex>,
    template_parts: Option<(String, String)>,
}

impl ChrNameMapper {
    pub fn new(pattern: ChrPattern) -> Self {
        let reverse_special = pattern
            .special
            .iter()
            .filter(|(index, _)| !pattern.exclusions.contains(index))
            .map(|(index, name)| (name.clone(), *index))
            .collect();
        let template_parts = pattern
            .template
            .split_once(INDEX_PLACEHOLDER)
            .map(|(prefix, suffix)| (prefix.to_string(), suffix.to_string()));
        Self {
            pattern,
            reverse_special,
            template_parts,
        }
    }

    /// Literal name for `index`, or `None` when the pattern excludes it.
    pub fn to_literal(&self, index: ChrIndex) -> Option<String> {
        self.pattern.to_literal(index)
    }

    /// Inverse of `to_literal`. Names that match neither a special entry nor
    /// the template shape are unmapped; callers decide whether they are
    /// unplaced contigs.
    pub fn to_index(&self, name: &str) -> Result<ChrIndex, PlanError> {
        if let Some(index) = self.reverse_special.get(name) {
            return Ok(*index);
        }
        self.template_index(name).ok_or_else(|| PlanError::UnmappedChromosome {
            name: name.to_string(),
            pattern: self.pattern.template.clone(),
        })
    }

    fn template_index(&self, name: &str) -> Option<ChrIndex> {
        let (prefix, suffix) = self.template_parts.as_ref()?;
        let designator = name.strip_prefix(prefix.as_str())?;
        let designator = designator.strip_suffix(suffix.as_str())?;
        let index = ChrIndex::from_designator(designator)?;
        // special names replace the template form outright
        if self.pattern.special.contains_key(&index) || self.pattern.exclusions.contains(&index) {
            return None;
        }
        Some(index)
    }
}

/// One step of a source-to-reference chromosome translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChrConversionEntry {
    pub index: ChrIndex,
    pub haplotype: Haplotype,
    pub from: String,
    pub to: String,
}

/// Explicit composition `source literal -> ChrIndex -> reference literal`,
/// restricted to the chromosomes of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChrConversion {
    pub entries: Vec<ChrConversionEntry>,
}

impl ChrConversion {
    pub fn compose(
        source: &ChrNameMapper,
        reference: &ChrNameMapper,
        indices: &BTreeSet<ChrIndex>,
        haplotype: Haplotype,
    ) -> Self {
        let entries = indices
            .iter()
            .filter_map(|index| {
                let from = source.to_literal(*index)?;
                let to = reference.to_literal(*index)?;
                Some(ChrConversionEntry {
                    index: *index,
                    haplotype,
                    from,
                    to,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn extend(&mut self, other: ChrConversion) {
        self.entries.extend(other.entries);
    }

    /// Reference name for a source name, `None` when the chromosome is not
    /// part of this conversion.
    #[cfg(test)]
    pub fn translate(&self, source_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.from == source_name)
            .map(|entry| entry.to.as_str())
    }
}

/// Classification of a literal name against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChrClass {
    Placed(ChrIndex),
    Unplaced,
}

/// Regexes recognising non-primary contigs (mitochondria, unplaced
/// scaffolds). Each pattern is anchored at the start of the name.
#[derive(Debug, Clone, Default)]
pub struct UnplacedMatcher {
    patterns: Vec<Regex>,
}

impl UnplacedMatcher {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(&format!("^(?:{pattern})")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_unplaced(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }

    /// Placed through the mapper, unplaced through the regex list, or an
    /// `UnmappedChromosome` error.
    pub fn classify(&self, mapper: &ChrNameMapper, name: &str) -> Result<ChrClass, PlanError> {
        match mapper.to_index(name) {
            Ok(index) => Ok(ChrClass::Placed(index)),
            Err(err) => {
                if self.is_unplaced(name) {
                    Ok(ChrClass::Unplaced)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refseq_pattern() -> ChrPattern {
        let special = ChrIndex::all()
            .map(|index| (index, format!("NC_0000{:02}.11", index.value())))
            .collect();
        ChrPattern {
            template: "chr%i".to_string(),
            special,
            exclusions: BTreeSet::new(),
        }
    }

    #[test]
    fn designators_cover_all_indices() {
        let names: Vec<String> = ChrIndex::all().map(ChrIndex::designator).collect();
        assert_eq!(names.len(), 24);
        assert_eq!(names[0], "1");
        assert_eq!(names[22], "X");
        assert_eq!(names[23], "Y");
        assert_eq!(ChrIndex::from_designator("X"), Some(ChrIndex::X));
        assert_eq!(ChrIndex::from_designator("23"), None);
        assert_eq!(ChrIndex::from_designator("01"), None);
        assert_eq!(ChrIndex::new(0), None);
        assert_eq!(ChrIndex::new(25), None);
    }

    #[test]
    fn literal_round_trips_for_every_index() {
        for pattern in [
            ChrPattern::default(),
            refseq_pattern(),
            ChrPattern {
                template: "%i".to_string(),
                special: BTreeMap::from([(ChrIndex::Y, "chrY_hg".to_string())]),
                exclusions: BTreeSet::new(),
            },
        ] {
            assert!(pattern.problems().is_empty(), "{:?}", pattern.problems());
            let mapper = ChrNameMapper::new(pattern);
            let mut seen = BTreeSet::new();
            for index in ChrIndex::all() {
                let name = mapper.to_literal(index).expect("named");
                assert!(seen.insert(name.clone()), "duplicate {name}");
                assert_eq!(mapper.to_index(&name).expect("maps back"), index);
            }
        }
    }

    #[test]
    fn special_names_override_template() {
        let mapper = ChrNameMapper::new(ChrPattern {
            template: "chr%i".to_string(),
            special: BTreeMap::from([(ChrIndex::new(1).expect("idx"), "NC_000001.11".to_string())]),
            exclusions: BTreeSet::new(),
        });
        assert_eq!(
            mapper.to_literal(ChrIndex::new(1).expect("idx")).as_deref(),
            Some("NC_000001.11")
        );
        let err = mapper.to_index("chr1").expect_err("template form replaced");
        assert!(matches!(err, PlanError::UnmappedChromosome { .. }));
    }

    #[test]
    fn excluded_indices_have_no_name() {
        let mapper = ChrNameMapper::new(ChrPattern::parent_default(Parent::Pat));
        assert_eq!(mapper.to_literal(ChrIndex::X), None);
        assert!(mapper.to_index("chrX").is_err());
        assert_eq!(mapper.to_index("chrY").expect("Y"), ChrIndex::Y);
    }

    #[test]
    fn unmapped_names_report_the_pattern() {
        let mapper = ChrNameMapper::new(ChrPattern::default());
        let err = mapper.to_index("chrM").expect_err("unmapped");
        assert_eq!(
            err,
            PlanError::UnmappedChromosome {
                name: "chrM".to_string(),
                pattern: "chr%i".to_string()
            }
        );
        assert!(mapper.to_index("chr23").is_err());
        assert!(mapper.to_index("1").is_err());
    }

    #[test]
    fn duplicate_special_targets_are_problems() {
        let pattern = ChrPattern {
            template: "chr%i".to_string(),
            special: BTreeMap::from([
                (ChrIndex::new(1).expect("idx"), "dup".to_string()),
                (ChrIndex::new(2).expect("idx"), "dup".to_string()),
            ]),
            exclusions: BTreeSet::new(),
        };
        let problems = pattern.problems();
        assert!(problems.iter().any(|p| p.contains("\"dup\"")), "{problems:?}");
    }

    #[test]
    fn special_name_colliding_with_template_is_a_problem() {
        let pattern = ChrPattern {
            template: "chr%i".to_string(),
            special: BTreeMap::from([(ChrIndex::new(1).expect("idx"), "chr2".to_string())]),
            exclusions: BTreeSet::new(),
        };
        let problems = pattern.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("\"chr2\""));
    }

    #[test]
    fn template_placeholder_count_is_checked() {
        let pattern = ChrPattern {
            template: "chr".to_string(),
            ..ChrPattern::default()
        };
        assert!(pattern.problems()[0].contains("exactly once"));
        let dip = DipChrPattern {
            template: "chr%i".to_string(),
            ..DipChrPattern::default()
        };
        assert!(dip.problems()[0].contains("'%h'"));
    }

    #[test]
    fn dip_pattern_splits_per_parent() {
        let dip = DipChrPattern::default();
        assert!(dip.problems().is_empty());
        let pat = ChrNameMapper::new(dip.for_parent(Parent::Pat));
        let mat = ChrNameMapper::new(dip.for_parent(Parent::Mat));
        assert_eq!(
            pat.to_literal(ChrIndex::new(1).expect("idx")).as_deref(),
            Some("chr1_PATERNAL")
        );
        assert_eq!(pat.to_literal(ChrIndex::X), None);
        assert_eq!(mat.to_literal(ChrIndex::Y), None);
        assert_eq!(mat.to_index("chrX_MATERNAL").expect("X"), ChrIndex::X);
        assert!(mat.to_index("chrX_PATERNAL").is_err());
    }

    #[test]
    fn dip_special_shared_by_both_parents_collides() {
        let dip = DipChrPattern {
            special: BTreeMap::from([(ChrIndex::new(5).expect("idx"), "ctg5".to_string())]),
            ..DipChrPattern::default()
        };
        let problems = dip.problems();
        assert!(problems.iter().any(|p| p.contains("\"ctg5\"") && p.contains("5_mat, 5_pat")));

        // X only exists on the maternal copy, so its special name has one owner
        let dip = DipChrPattern {
            special: BTreeMap::from([(ChrIndex::X, "ctgX".to_string())]),
            ..DipChrPattern::default()
        };
        assert!(dip.problems().is_empty(), "{:?}", dip.problems());
    }

    #[test]
    fn conversion_composes_source_and_reference_names() {
        let source = ChrNameMapper::new(ChrPattern {
            template: "%i".to_string(),
            ..ChrPattern::default()
        });
        let reference = ChrNameMapper::new(refseq_pattern());
        let indices: BTreeSet<ChrIndex> = [21, 22]
            .iter()
            .filter_map(|value| ChrIndex::new(*value))
            .collect();
        let conversion = ChrConversion::compose(&source, &reference, &indices, Haplotype::Hap);
        assert_eq!(conversion.entries.len(), 2);
        assert_eq!(conversion.translate("21"), Some("NC_000021.11"));
        assert_eq!(conversion.translate("1"), None);
    }

    #[test]
    fn unplaced_patterns_classify_contigs() {
        let mapper = ChrNameMapper::new(ChrPattern::default());
        let unplaced =
            UnplacedMatcher::new(&["chrM".to_string(), "chr.*_random".to_string()]).expect("regex");
        assert_eq!(
            unplaced.classify(&mapper, "chr7").expect("placed"),
            ChrClass::Placed(ChrIndex::new(7).expect("idx"))
        );
        assert_eq!(
            unplaced.classify(&mapper, "chr1_KI270706v1_random").expect("unplaced"),
            ChrClass::Unplaced
        );
        assert!(unplaced.classify(&mapper, "HLA-A*01").is_err());
    }
}
