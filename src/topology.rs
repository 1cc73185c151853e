//! Reference topology and haplotype tags.
//!
//! A reference is haploid, a single combined diploid file, or two haplotype
//! files. The topology decides which haplotype tags a source may carry and
//! how many output views (labels) a build produces.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Haploid,
    Diploid1,
    Diploid2,
}

impl Topology {
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Haploid => "haploid",
            Topology::Diploid1 => "diploid1",
            Topology::Diploid2 => "diploid2",
        }
    }

    /// Config section that declares references of this topology.
    pub fn section(self) -> &'static str {
        match self {
            Topology::Haploid => "haploid_stratifications",
            Topology::Diploid1 => "diploid1_stratifications",
            Topology::Diploid2 => "diploid2_stratifications",
        }
    }

    pub fn is_diploid(self) -> bool {
        !matches!(self, Topology::Haploid)
    }

    /// Determine the topology from the haplotype tags declared under `ref`.
    pub fn from_ref_tags(tags: &BTreeSet<Haplotype>) -> Result<Topology, String> {
        let listed: Vec<&str> = tags.iter().map(|tag| tag.as_str()).collect();
        let only = |wanted: &[Haplotype]| {
            tags.len() == wanted.len() && wanted.iter().all(|tag| tags.contains(tag))
        };
        if only(&[Haplotype::Hap]) {
            Ok(Topology::Haploid)
        } else if only(&[Haplotype::Dip]) {
            Ok(Topology::Diploid1)
        } else if only(&[Haplotype::Pat, Haplotype::Mat]) {
            Ok(Topology::Diploid2)
        } else if listed.is_empty() {
            Err("ref must declare hap, dip, or pat+mat".to_string())
        } else {
            Err(format!(
                "ref haplotype tags [{}] must be exactly one of hap, dip, or pat+mat",
                listed.join(", ")
            ))
        }
    }

    /// How a source of the given shape is consumed by this topology, or
    /// `None` when the shape is not legal here.
    pub fn accepts(self, shape: SourceShape) -> Option<SourceHandling> {
        match (self, shape) {
            (Topology::Haploid, SourceShape::Hap) => Some(SourceHandling::Direct),
            (Topology::Diploid1, SourceShape::Dip) => Some(SourceHandling::Direct),
            (Topology::Diploid1, SourceShape::Split) => Some(SourceHandling::CombineHaplotypes),
            (Topology::Diploid2, SourceShape::Split) => Some(SourceHandling::Direct),
            (Topology::Diploid2, SourceShape::Dip) => Some(SourceHandling::SplitByHapname),
            _ => None,
        }
    }

    /// Legal shapes, for error messages.
    pub fn legal_shapes(self) -> &'static str {
        match self {
            Topology::Haploid => "hap",
            Topology::Diploid1 | Topology::Diploid2 => "dip or pat+mat",
        }
    }

    /// Output views for one reference, in label order.
    pub fn views(self, reference: &str) -> Vec<OutputView> {
        match self {
            Topology::Haploid => vec![OutputView::new(reference, Haplotype::Hap)],
            Topology::Diploid1 => vec![OutputView::new(reference, Haplotype::Dip)],
            Topology::Diploid2 => vec![
                OutputView::new(&format!("{reference}_pat"), Haplotype::Pat),
                OutputView::new(&format!("{reference}_mat"), Haplotype::Mat),
            ],
        }
    }

    /// View that carries artifacts merged across both haplotypes.
    pub fn merged_view(self, reference: &str) -> OutputView {
        match self {
            Topology::Haploid => OutputView::new(reference, Haplotype::Hap),
            Topology::Diploid1 | Topology::Diploid2 => OutputView::new(reference, Haplotype::Dip),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Haplotype {
    Hap,
    Pat,
    Mat,
    Dip,
}

impl Haplotype {
    pub fn as_str(self) -> &'static str {
        match self {
            Haplotype::Hap => "hap",
            Haplotype::Pat => "pat",
            Haplotype::Mat => "mat",
            Haplotype::Dip => "dip",
        }
    }

    pub fn parent(self) -> Option<Parent> {
        match self {
            Haplotype::Pat => Some(Parent::Pat),
            Haplotype::Mat => Some(Parent::Mat),
            _ => None,
        }
    }
}

impl fmt::Display for Haplotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parental haplotype of a diploid genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parent {
    Pat,
    Mat,
}

impl Parent {
    pub const BOTH: [Parent; 2] = [Parent::Pat, Parent::Mat];

    pub fn haplotype(self) -> Haplotype {
        match self {
            Parent::Pat => Haplotype::Pat,
            Parent::Mat => Haplotype::Mat,
        }
    }
}

/// A value held once per parental haplotype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerParent<T> {
    pub pat: T,
    pub mat: T,
}

impl<T> PerParent<T> {
    pub fn get(&self, parent: Parent) -> &T {
        match parent {
            Parent::Pat => &self.pat,
            Parent::Mat => &self.mat,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Parent, &T) -> U) -> PerParent<U> {
        PerParent {
            pat: f(Parent::Pat, &self.pat),
            mat: f(Parent::Mat, &self.mat),
        }
    }
}

/// The haplotype layout of one declared source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    Hap,
    Dip,
    Split,
}

impl SourceShape {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceShape::Hap => "hap",
            SourceShape::Dip => "dip",
            SourceShape::Split => "pat+mat",
        }
    }
}

/// How a source is brought into the reference's haplotype layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHandling {
    Direct,
    /// Two haplotype files concatenated, paternal first within each chromosome.
    CombineHaplotypes,
    /// One combined file split using the haplotype name embedded in each
    /// chromosome name.
    SplitByHapname,
}

/// One output label of a reference, e.g. `HG002_pat`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputView {
    pub label: String,
    pub haplotype: Haplotype,
}

impl OutputView {
    pub fn new(label: &str, haplotype: Haplotype) -> Self {
        Self {
            label: label.to_string(),
            haplotype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[Haplotype]) -> BTreeSet<Haplotype> {
        list.iter().copied().collect()
    }

    #[test]
    fn ref_tags_determine_topology() {
        assert_eq!(
            Topology::from_ref_tags(&tags(&[Haplotype::Hap])),
            Ok(Topology::Haploid)
        );
        assert_eq!(
            Topology::from_ref_tags(&tags(&[Haplotype::Dip])),
            Ok(Topology::Diploid1)
        );
        assert_eq!(
            Topology::from_ref_tags(&tags(&[Haplotype::Mat, Haplotype::Pat])),
            Ok(Topology::Diploid2)
        );
    }

    #[test]
    fn mixed_or_partial_ref_tags_are_rejected() {
        let err = Topology::from_ref_tags(&tags(&[Haplotype::Pat])).expect_err("pat only");
        assert!(err.contains("[pat]"));
        assert!(Topology::from_ref_tags(&tags(&[Haplotype::Hap, Haplotype::Dip])).is_err());
        assert!(Topology::from_ref_tags(&BTreeSet::new()).is_err());
    }

    #[test]
    fn shapes_legal_per_topology() {
        assert_eq!(
            Topology::Haploid.accepts(SourceShape::Hap),
            Some(SourceHandling::Direct)
        );
        assert_eq!(Topology::Haploid.accepts(SourceShape::Dip), None);
        assert_eq!(
            Topology::Diploid1.accepts(SourceShape::Split),
            Some(SourceHandling::CombineHaplotypes)
        );
        assert_eq!(
            Topology::Diploid2.accepts(SourceShape::Dip),
            Some(SourceHandling::SplitByHapname)
        );
        assert_eq!(Topology::Diploid2.accepts(SourceShape::Hap), None);
    }

    #[test]
    fn diploid2_has_one_view_per_parent() {
        let views = Topology::Diploid2.views("HG002");
        let labels: Vec<&str> = views.iter().map(|view| view.label.as_str()).collect();
        assert_eq!(labels, vec!["HG002_pat", "HG002_mat"]);
        assert_eq!(Topology::Diploid2.merged_view("HG002").label, "HG002");
        assert_eq!(Topology::Diploid1.views("HG002")[0].haplotype, Haplotype::Dip);
    }
}
