//! Build-graph planner.
//!
//! `plan` resolves every build of every reference into a static graph of
//! artifacts. Builds are independent: each one only reads the immutable
//! config and its reference's catalog. Category planners live in the
//! submodules and only ever add to an `Emitted` collector.
mod diploid;
mod functional;
mod gc;
mod low_complexity;
mod mappability;
mod other;
mod specs;
mod types;
mod unions;
mod xy;

pub use types::{
    Artifact, BenchmarkSpec, BuildPlan, ComparisonSpec, Discovered, Discovery, LabelOutputs,
    NodeRef, Omission, OmissionReason, Operation, PairRecord, Plan, Universe,
};

use crate::catalog::{
    view_chromosomes, CategoryInputs, Observations, Resolution, Selection, SourceCatalog,
    SourceUse,
};
use crate::category::{Level, SourceRole, StratCategory};
use crate::chrom::ChrIndex;
use crate::config::config_digest;
use crate::errors::{PlanError, PlanReport};
use crate::model::{BedInput, Build, Config, Toggle};
use crate::naming::{ArtifactId, PathNamer, UniverseKind};
use crate::pairs::{check_record, mutual_pair, MutualPair};
use crate::provenance::Software;
use crate::topology::{OutputView, Topology};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Resolve every build in `config`. Fails with every planning error found.
pub fn plan(config: &Config, observations: &Observations) -> Result<Plan, PlanReport> {
    let namer = PathNamer::new(&config.results_dir);
    let mut errors = Vec::new();
    let mut builds = Vec::new();
    for reference in config.references.values() {
        let (catalog, checksum_errors) = SourceCatalog::new(reference, observations);
        errors.extend(checksum_errors);
        for build in reference.builds.values() {
            let ctx = BuildCtx {
                config,
                catalog: &catalog,
                build,
                namer: &namer,
            };
            match plan_build(&ctx) {
                Ok(plan) => {
                    tracing::info!(
                        reference = %plan.reference,
                        build = %plan.build,
                        artifacts = plan.artifacts.len(),
                        omissions = plan.omissions.len(),
                        "planned build"
                    );
                    builds.push(plan);
                }
                Err(build_errors) => errors.extend(build_errors),
            }
        }
    }
    errors.extend(path_collisions(&builds));
    if !errors.is_empty() {
        return Err(PlanReport::new(errors));
    }
    let digest = serde_json::to_value(config)
        .map(|value| config_digest(&value))
        .unwrap_or_default();
    Ok(Plan {
        software: Software::current(),
        config_digest: digest,
        results_dir: namer.results_dir().to_string(),
        builds,
    })
}

/// Inputs shared by every view of one build.
pub(crate) struct BuildCtx<'a> {
    pub(crate) config: &'a Config,
    pub(crate) catalog: &'a SourceCatalog<'a>,
    pub(crate) build: &'a Build,
    pub(crate) namer: &'a PathNamer,
}

impl<'a> BuildCtx<'a> {
    fn reference_key(&self) -> &'a str {
        &self.catalog.reference().key
    }

    /// Chromosomes requested by the build; an empty filter means all.
    fn selected(&self) -> BTreeSet<ChrIndex> {
        if self.build.chr_filter.is_empty() {
            ChrIndex::all().collect()
        } else {
            self.build.chr_filter.clone()
        }
    }

    fn view(&'a self, view: OutputView) -> ViewPlan<'a> {
        let defined = view_chromosomes(&self.catalog.reference().sequence, view.haplotype);
        let chromosomes = self.selected().intersection(&defined).copied().collect();
        ViewPlan {
            ctx: self,
            view,
            chromosomes,
        }
    }

    /// Resolve a category behind its toggle. Absent sources are an omission,
    /// or an error when the toggle demands the category.
    fn gate(
        &self,
        category: StratCategory,
        toggle: Toggle,
        out: &mut Emitted,
    ) -> Option<CategoryInputs<'a>> {
        if !toggle.enabled() {
            return None;
        }
        match self.catalog.resolve(category) {
            Resolution::Present(inputs) => Some(inputs),
            Resolution::Absent { missing } if toggle.required() => {
                out.errors.push(self.missing_required(
                    category,
                    missing.iter().map(|role| role.as_str().to_string()).collect(),
                ));
                None
            }
            Resolution::Absent { missing } => {
                tracing::debug!(
                    reference = self.reference_key(),
                    build = %self.build.key,
                    category = category.as_str(),
                    "category omitted, sources absent"
                );
                out.omissions.push(Omission {
                    category,
                    label: None,
                    name: None,
                    reason: OmissionReason::AbsentSource { missing },
                });
                None
            }
        }
    }

    fn missing_required(&self, category: StratCategory, missing: Vec<String>) -> PlanError {
        PlanError::MissingRequiredSource {
            reference: self.reference_key().to_string(),
            build: self.build.key.clone(),
            category: category.as_str().to_string(),
            missing,
        }
    }
}

fn toggle_of(enabled: bool, required: bool) -> Toggle {
    match (enabled, required) {
        (false, _) => Toggle::Off,
        (true, true) => Toggle::Required,
        (true, false) => Toggle::On,
    }
}

/// One output label of a build and the chromosomes it covers.
pub(crate) struct ViewPlan<'a> {
    pub(crate) ctx: &'a BuildCtx<'a>,
    pub(crate) view: OutputView,
    pub(crate) chromosomes: BTreeSet<ChrIndex>,
}

impl ViewPlan<'_> {
    pub(crate) fn label(&self) -> &str {
        &self.view.label
    }

    pub(crate) fn universe(&self, kind: UniverseKind) -> String {
        self.ctx
            .namer
            .universe(&self.view.label, &self.ctx.build.key, kind)
    }

    pub(crate) fn sequence(&self) -> Vec<SourceUse> {
        self.ctx.catalog.sequence_uses(&self.view, &self.chromosomes)
    }

    pub(crate) fn input(&self, role: SourceRole, input: &BedInput) -> Vec<SourceUse> {
        self.ctx
            .catalog
            .input_uses(role, input, &self.view, &self.chromosomes)
    }

    /// Gap uses when the reference declares gaps, regardless of the gaps
    /// toggle.
    pub(crate) fn gaps(&self) -> Option<Vec<SourceUse>> {
        self.ctx
            .catalog
            .reference()
            .inputs
            .gap
            .as_ref()
            .map(|gap| self.input(SourceRole::Gap, gap))
    }

    pub(crate) fn id(&self, category: StratCategory, level: Level, name: &str) -> ArtifactId {
        ArtifactId {
            reference: self.ctx.reference_key().to_string(),
            build: self.ctx.build.key.clone(),
            label: self.view.label.clone(),
            haplotype: self.view.haplotype,
            category,
            level,
            name: name.to_string(),
        }
    }

    pub(crate) fn finish(&self, draft: Draft) -> Artifact {
        let id = self.id(draft.category, draft.level, &draft.name);
        let path = self.ctx.namer.name(&id);
        let indexed_path = self.ctx.build.bigbed.then(|| self.ctx.namer.indexed(&id));
        let mut inputs: Vec<NodeRef> = Vec::new();
        for source in &draft.sources {
            let node = NodeRef::Source {
                location: source.location.as_str().to_string(),
            };
            if !inputs.contains(&node) {
                inputs.push(node);
            }
        }
        inputs.extend(draft.inputs);
        Artifact {
            id,
            path,
            indexed_path,
            operation: draft.operation,
            inputs,
            chromosomes: self.chromosomes.clone(),
            universe: self.universe(draft.universe),
            complement_of: None,
            sources: draft.sources,
            selection: draft.selection,
            parameters: draft.parameters,
        }
    }

    pub(crate) fn pair(&self, region: Draft, complement_name: &str) -> MutualPair {
        mutual_pair(
            self.finish(region),
            complement_name,
            self.ctx.namer,
            self.ctx.build.bigbed,
        )
    }

    pub(crate) fn omission(
        &self,
        category: StratCategory,
        name: Option<&str>,
        reason: OmissionReason,
    ) -> Omission {
        Omission {
            category,
            label: Some(self.view.label.clone()),
            name: name.map(str::to_string),
            reason,
        }
    }
}

/// Recipe for one artifact before it is placed in a view.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    category: StratCategory,
    level: Level,
    name: String,
    operation: Operation,
    inputs: Vec<NodeRef>,
    sources: Vec<SourceUse>,
    selection: Option<Selection>,
    parameters: BTreeMap<String, Value>,
    universe: UniverseKind,
}

impl Draft {
    pub(crate) fn new(
        category: StratCategory,
        name: impl Into<String>,
        operation: Operation,
    ) -> Self {
        let level = category
            .level()
            .unwrap_or_else(|| Level::Other(category.as_str().to_string()));
        Self {
            category,
            level,
            name: name.into(),
            operation,
            inputs: Vec::new(),
            sources: Vec::new(),
            selection: None,
            parameters: BTreeMap::new(),
            universe: UniverseKind::Auto,
        }
    }

    pub(crate) fn scan(category: StratCategory, name: impl Into<String>, tool: &str) -> Self {
        Self::new(
            category,
            name,
            Operation::Scan {
                tool: tool.to_string(),
            },
        )
    }

    pub(crate) fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub(crate) fn sources(mut self, uses: Vec<SourceUse>) -> Self {
        self.sources.extend(uses);
        self
    }

    pub(crate) fn input(mut self, node: NodeRef) -> Self {
        self.inputs.push(node);
        self
    }

    pub(crate) fn after(self, path: &str) -> Self {
        self.input(NodeRef::Artifact {
            path: path.to_string(),
        })
    }

    pub(crate) fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub(crate) fn universe(mut self, kind: UniverseKind) -> Self {
        self.universe = kind;
        self
    }
}

/// Collector for everything one build produces.
#[derive(Debug, Default)]
pub(crate) struct Emitted {
    artifacts: Vec<Artifact>,
    pairs: Vec<PairRecord>,
    pub(crate) omissions: Vec<Omission>,
    pub(crate) discoveries: Vec<Discovery>,
    pub(crate) errors: Vec<PlanError>,
}

impl Emitted {
    /// Add a standalone artifact and return its path.
    pub(crate) fn add(&mut self, artifact: Artifact) -> String {
        let path = artifact.path.clone();
        self.artifacts.push(artifact);
        path
    }

    /// Add both members of a pair and return the region path.
    pub(crate) fn add_pair(&mut self, pair: MutualPair) -> String {
        let record = pair.record();
        if !pair.verify(&record.universe) {
            self.errors.push(PlanError::MutualPairViolation {
                region: record.region.clone(),
                complement: record.complement.clone(),
                reason: "members disagree on universe or chromosome filter".to_string(),
            });
        }
        let MutualPair { region, complement } = pair;
        self.artifacts.push(region);
        self.artifacts.push(complement);
        self.pairs.push(record.clone());
        record.region
    }

    pub(crate) fn find(&self, label: &str, name: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.id.label == label && artifact.id.name == name)
    }

    pub(crate) fn labelled<'e>(
        &'e self,
        label: &'e str,
    ) -> impl Iterator<Item = &'e Artifact> + 'e {
        self.artifacts
            .iter()
            .filter(move |artifact| artifact.id.label == label)
    }
}

fn plan_build(ctx: &BuildCtx<'_>) -> Result<BuildPlan, Vec<PlanError>> {
    let reference = ctx.catalog.reference();
    let build = ctx.build;
    let include = &build.include;
    let topology = reference.topology;
    let mut out = Emitted::default();

    let gaps = ctx.gate(StratCategory::Gap, include.gaps, &mut out);
    let low_complexity = ctx.gate(StratCategory::LowComplexity, include.low_complexity, &mut out);
    let xy = ctx.gate(StratCategory::Xy, include.xy, &mut out);
    let segdups = ctx.gate(StratCategory::Segdups, include.segdups, &mut out);
    let mappability_toggle = toggle_of(
        !include.mappability.params.is_empty(),
        include.mappability.required,
    );
    let mappability = ctx.gate(StratCategory::Mappability, mappability_toggle, &mut out);
    let gc_toggle = toggle_of(include.gc.params.is_some(), include.gc.required);
    let gc = ctx.gate(StratCategory::Gc, gc_toggle, &mut out);
    let telomeres = ctx.gate(StratCategory::Telomere, include.telomeres, &mut out);
    let functional = ctx.gate(StratCategory::Functional, include.functional, &mut out);
    let vdj = ctx.gate(StratCategory::Vdj, include.vdj, &mut out);
    let kir = ctx.gate(StratCategory::Kir, include.kir, &mut out);
    let mhc = ctx.gate(StratCategory::Mhc, include.mhc, &mut out);
    let hets = if topology.is_diploid() {
        ctx.gate(StratCategory::Diploid, include.hets, &mut out)
    } else {
        None
    };

    let (views, filtered_out): (Vec<ViewPlan<'_>>, Vec<ViewPlan<'_>>) = topology
        .views(&reference.key)
        .into_iter()
        .map(|view| ctx.view(view))
        .partition(|view| !view.chromosomes.is_empty());
    let active: Vec<StratCategory> = [
        (StratCategory::Gap, gaps.is_some()),
        (StratCategory::LowComplexity, low_complexity.is_some()),
        (StratCategory::Xy, xy.is_some()),
        (StratCategory::Segdups, segdups.is_some()),
        (StratCategory::Mappability, mappability.is_some()),
        (StratCategory::Gc, gc.is_some()),
        (StratCategory::Telomere, telomeres.is_some()),
        (StratCategory::Diploid, hets.is_some()),
        (StratCategory::Other, !build.other_strats.is_empty()),
        (StratCategory::Union, include.union.enabled()),
    ]
    .into_iter()
    .filter_map(|(category, on)| on.then_some(category))
    .collect();
    for view in &filtered_out {
        // the filter keeps none of this haplotype's chromosomes
        let needed = view_chromosomes(&reference.sequence, view.view.haplotype);
        tracing::debug!(
            reference = %reference.key,
            build = %build.key,
            label = %view.view.label,
            "label omitted, no chromosome survives the filter"
        );
        for category in &active {
            out.omissions.push(view.omission(
                *category,
                None,
                OmissionReason::ChromosomesFiltered {
                    needed: needed.clone(),
                },
            ));
        }
    }
    for view in &views {
        if let Some(CategoryInputs::Gap(gap)) = gaps {
            let draft = Draft::new(StratCategory::Gap, "gaps_slop15kb", Operation::Normalize)
                .sources(view.input(SourceRole::Gap, gap))
                .param("slop", 15_000);
            out.add(view.finish(draft));
        }
        if let Some(CategoryInputs::LowComplexity {
            rmsk,
            simreps,
            satellites,
        }) = low_complexity
        {
            low_complexity::plan(view, rmsk, simreps, satellites, &mut out);
        }
        if let Some(CategoryInputs::Xy(inputs)) = xy {
            xy::plan(view, inputs, &mut out);
        }
        if let Some(CategoryInputs::Segdups(superdups)) = segdups {
            plan_segdups(view, superdups, &mut out);
        }
        if let Some(CategoryInputs::Mappability(inputs)) = mappability {
            mappability::plan(view, &include.mappability.params, inputs, &mut out);
        }
        if let (Some(_), Some(params)) = (gc, &include.gc.params) {
            gc::plan(view, params, &mut out);
        }
        if telomeres.is_some() {
            let draft = Draft::scan(StratCategory::Telomere, "telomeres", "telomeres")
                .sources(view.sequence())
                .param("motif", "TTAGGG");
            out.add(view.finish(draft));
        }
        if hets.is_some() {
            diploid::plan(view, &mut out);
        }
        other::plan(view, &mut out);
    }

    let functional_views: Vec<ViewPlan<'_>> = match topology {
        Topology::Diploid2 => vec![ctx.view(topology.merged_view(&reference.key))],
        Topology::Haploid | Topology::Diploid1 => topology
            .views(&reference.key)
            .into_iter()
            .map(|view| ctx.view(view))
            .filter(|view| !view.chromosomes.is_empty())
            .collect(),
    };
    if let Some(CategoryInputs::Functional(inputs)) = functional.or(vdj).or(kir).or(mhc) {
        let wanted = functional::Wanted {
            cds: functional.is_some(),
            vdj: vdj.is_some(),
            kir: kir.is_some(),
            mhc: mhc.is_some(),
        };
        for view in &functional_views {
            functional::plan(view, inputs, wanted, &mut out);
        }
    }

    if include.union.enabled() {
        for view in &views {
            unions::plan(view, include.union.required(), &mut out);
        }
    }

    let mut all_views: Vec<&ViewPlan<'_>> = views.iter().collect();
    all_views.extend(
        functional_views
            .iter()
            .filter(|view| !views.iter().any(|known| known.view == view.view)),
    );
    let benchmark = build
        .bench
        .as_ref()
        .map(|bench| specs::benchmark(ctx, bench, &out));
    let comparison = build
        .comparison
        .as_ref()
        .map(|comparison| specs::comparison(ctx, comparison));

    let Emitted {
        mut artifacts,
        mut pairs,
        mut omissions,
        mut discoveries,
        mut errors,
    } = out;
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    pairs.sort();
    omissions.sort();
    omissions.dedup();
    discoveries.sort_by(|a, b| a.id.cmp(&b.id));

    let universes = plan_universes(ctx, &all_views, &artifacts);
    let labels = all_views
        .iter()
        .filter(|view| {
            views.iter().any(|known| known.view == view.view)
                || artifacts.iter().any(|artifact| artifact.id.label == view.view.label)
        })
        .map(|view| LabelOutputs {
            label: view.view.label.clone(),
            haplotype: view.view.haplotype,
            build_dir: ctx.namer.build_dir(&view.view.label, &build.key),
            checksum_manifest: ctx.namer.checksum_manifest(&view.view.label, &build.key),
            strat_list: ctx.namer.strat_list(&view.view.label, &build.key),
            chromosomes: view.chromosomes.clone(),
        })
        .collect();

    let lookup = |path: &str| {
        artifacts
            .binary_search_by(|artifact| artifact.path.as_str().cmp(path))
            .ok()
            .map(|idx| &artifacts[idx])
    };
    for record in &pairs {
        if let Err(err) = check_record(record, lookup) {
            errors.push(err);
        }
    }

    if !errors.is_empty() {
        // per-label planners can report the same problem once per label
        let mut unique: Vec<PlanError> = Vec::new();
        for err in errors {
            if !unique.contains(&err) {
                unique.push(err);
            }
        }
        return Err(unique);
    }
    Ok(BuildPlan {
        reference: reference.key.clone(),
        build: build.key.clone(),
        topology,
        labels,
        universes,
        artifacts,
        pairs,
        omissions,
        discoveries,
        benchmark,
        comparison,
    })
}

fn plan_segdups(view: &ViewPlan<'_>, superdups: &BedInput, out: &mut Emitted) {
    let uses = view.input(SourceRole::Superdups, superdups);
    let all = Draft::new(StratCategory::Segdups, "segdups", Operation::Normalize)
        .sources(uses.clone())
        .param("merge", true);
    let all_path = out.add_pair(view.pair(all, "notinsegdups"));
    let long = Draft::new(StratCategory::Segdups, "segdups_gt10kb", Operation::Normalize)
        .sources(uses)
        .after(&all_path)
        .param("min_length", 10_000);
    out.add_pair(view.pair(long, "notinsegdups_gt10kb"));
}

/// Universes referenced by at least one artifact.
fn plan_universes(
    ctx: &BuildCtx<'_>,
    views: &[&ViewPlan<'_>],
    artifacts: &[Artifact],
) -> Vec<Universe> {
    let reference = ctx.catalog.reference();
    let used: BTreeSet<&str> = artifacts
        .iter()
        .map(|artifact| artifact.universe.as_str())
        .collect();
    let mut universes = Vec::new();
    for view in views {
        for kind in [UniverseKind::Auto, UniverseKind::ParY] {
            let path = view.universe(kind);
            if !used.contains(path.as_str()) {
                continue;
            }
            let mut sources = view.sequence();
            let mut parameters = BTreeMap::new();
            if let Some(gaps) = view.gaps() {
                sources.extend(gaps);
                parameters.insert("gap_merge_distance".to_string(), Value::from(100));
            }
            let y_par = reference.inputs.xy.as_ref().and_then(|xy| xy.y_par);
            if let (UniverseKind::Auto, Topology::Haploid, Some(y_par)) =
                (kind, reference.topology, y_par)
            {
                if view.chromosomes.contains(&ChrIndex::Y) {
                    parameters.insert(
                        "subtract_y_par".to_string(),
                        serde_json::json!([
                            [y_par.start.0, y_par.start.1],
                            [y_par.end.0, y_par.end.1]
                        ]),
                    );
                }
            }
            let mut inputs: Vec<NodeRef> = Vec::new();
            for source in &sources {
                let node = NodeRef::Source {
                    location: source.location.as_str().to_string(),
                };
                if !inputs.contains(&node) {
                    inputs.push(node);
                }
            }
            universes.push(Universe {
                label: view.view.label.clone(),
                kind,
                path,
                chromosomes: view.chromosomes.clone(),
                inputs,
                sources,
                parameters,
            });
        }
    }
    universes.sort_by(|a, b| a.path.cmp(&b.path));
    universes
}

/// Every output path must belong to exactly one artifact across the plan.
fn path_collisions(builds: &[BuildPlan]) -> Vec<PlanError> {
    let mut owners: BTreeMap<&str, String> = BTreeMap::new();
    let mut errors = Vec::new();
    for build in builds {
        let mut claims: Vec<(&str, String)> = Vec::new();
        for artifact in &build.artifacts {
            claims.push((artifact.path.as_str(), artifact.id.to_string()));
            if let Some(indexed) = &artifact.indexed_path {
                claims.push((indexed.as_str(), format!("{} (indexed)", artifact.id)));
            }
        }
        for universe in &build.universes {
            claims.push((
                universe.path.as_str(),
                format!("{}@{}:universe:{}", universe.label, build.build, universe.kind.as_str()),
            ));
        }
        for label in &build.labels {
            let owner = format!("{}@{}", label.label, build.build);
            claims.push((label.checksum_manifest.as_str(), format!("{owner}:checksum_manifest")));
            claims.push((label.strat_list.as_str(), format!("{owner}:strat_list")));
        }
        for (path, owner) in claims {
            match owners.get(path) {
                Some(first) => errors.push(PlanError::PathCollision {
                    path: path.to_string(),
                    first: first.clone(),
                    second: owner,
                }),
                None => {
                    owners.insert(path, owner);
                }
            }
        }
    }
    errors
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
