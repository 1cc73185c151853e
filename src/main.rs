use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod catalog;
mod category;
mod chrom;
mod cli;
mod config;
mod errors;
mod manifest;
mod model;
mod naming;
mod output;
mod pairs;
mod planner;
mod provenance;
mod topology;
mod util;

use crate::catalog::Observations;
use crate::cli::{Command, DiffArgs, ManifestArgs, PathsArgs, PlanArgs, RootArgs, ValidateArgs};
use crate::errors::PlanReport;
use crate::output::{read_json, write_json};
use crate::planner::Plan;
use crate::util::{display_path, join_names};

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Validate(args) => run_validate(args),
        Command::Plan(args) => run_plan(args),
        Command::Paths(args) => run_paths(args),
        Command::Diff(args) => run_diff(args),
        Command::Manifest(args) => run_manifest(args),
    }
}

fn run_validate(args: ValidateArgs) -> Result<ExitCode> {
    let doc = config::load_document(&args.config)?;
    let report = match config::validate(&doc) {
        Ok(config) => {
            tracing::info!(references = config.references.len(), "config is valid");
            PlanReport::default()
        }
        Err(report) => report,
    };
    if args.json {
        print_json(&report)?;
    } else if report.is_empty() {
        println!("{}: ok", args.config.display());
    } else {
        print!("{report}");
    }
    Ok(exit_for(&report))
}

fn run_plan(args: PlanArgs) -> Result<ExitCode> {
    let plan = match resolve(&args.config, args.observed.as_deref())? {
        Ok(plan) => plan,
        Err(report) => {
            eprint!("{report}");
            return Ok(ExitCode::FAILURE);
        }
    };
    match &args.out {
        Some(out) => {
            write_json(out, &plan)?;
            tracing::info!(path = %display_path(out, None), "wrote plan");
        }
        None => print_json(&plan)?,
    }
    if let Some(path) = &args.provenance {
        write_json(path, &plan.provenance())?;
        tracing::info!(path = %display_path(path, None), "wrote provenance");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_paths(args: PathsArgs) -> Result<ExitCode> {
    let mut plan = match resolve(&args.config, args.observed.as_deref())? {
        Ok(plan) => plan,
        Err(report) => {
            eprint!("{report}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let known: Vec<String> = plan
        .builds
        .iter()
        .map(|build| format!("{}@{}", build.reference, build.build))
        .collect();
    plan.builds.retain(|build| {
        args.reference.as_deref().is_none_or(|r| build.reference == r)
            && args.build.as_deref().is_none_or(|b| build.build == b)
    });
    if plan.builds.is_empty() && !known.is_empty() {
        return Err(anyhow!(
            "no build matches the filter (known: {})",
            join_names(&known)
        ));
    }
    let mut stdout = std::io::stdout().lock();
    for path in plan.paths() {
        writeln!(stdout, "{path}").context("write paths")?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_diff(args: DiffArgs) -> Result<ExitCode> {
    let old: Plan = read_json(&args.old)?;
    let new: Plan = read_json(&args.new)?;
    let diff = provenance::diff_plans(&old, &new);
    tracing::info!(
        added = diff.added.len(),
        removed = diff.removed.len(),
        changed = diff.changed.len(),
        unchanged = diff.unchanged,
        "compared plans"
    );
    print_json(&diff)?;
    if args.check && !diff.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_manifest(args: ManifestArgs) -> Result<ExitCode> {
    let plan: Plan = read_json(&args.plan)?;
    let written = manifest::write_manifests(&plan, &args.root)?;
    for label in written.iter().filter(|label| !label.missing.is_empty()) {
        tracing::warn!(
            label = %label.label,
            build = %label.build,
            missing = label.missing.len(),
            "planned outputs not found under root"
        );
    }
    if let Some(path) = &args.status_out {
        write_json(path, &manifest::settle_statuses(&plan, &args.root))?;
    }
    print_json(&written)?;
    Ok(ExitCode::SUCCESS)
}

/// Load, validate, and plan. The outer error is I/O; the inner one is the
/// aggregated report of config or planning problems.
fn resolve(
    config_path: &Path,
    observed: Option<&Path>,
) -> Result<std::result::Result<Plan, PlanReport>> {
    let doc = config::load_document(config_path)?;
    let config = match config::validate(&doc) {
        Ok(config) => config,
        Err(report) => return Ok(Err(report)),
    };
    let observations: Observations = match observed {
        Some(path) => read_json(path)?,
        None => Observations::default(),
    };
    Ok(planner::plan(&config, &observations))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize JSON")?;
    println!("{json}");
    Ok(())
}

fn exit_for(report: &PlanReport) -> ExitCode {
    if report.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
