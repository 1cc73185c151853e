//! CLI argument parsing for the stratification planner.
//!
//! The CLI is thin: every command loads inputs, calls into the library
//! modules, and writes the result.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "stratplan",
    version,
    about = "Resolve stratification configs into deterministic build plans",
    after_help = "Commands:\n  validate --config <file>            Check a config and list every problem\n  plan --config <file>                Resolve every build into a plan\n  paths --config <file>               List every planned output path\n  diff --old <plan> --new <plan>      Compare provenance of two plans\n  manifest --plan <plan> --root <dir> Write checksum manifests and strat lists\n\nExamples:\n  stratplan validate --config config/all.yml\n  stratplan plan --config config/all.yml --out plan.json\n  stratplan paths --config config/all.yml --reference GRCh38\n  stratplan diff --old old.json --new plan.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Raise log output to debug (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Validate(ValidateArgs),
    Plan(PlanArgs),
    Paths(PathsArgs),
    Diff(DiffArgs),
    Manifest(ManifestArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Validate a config and report every problem")]
pub struct ValidateArgs {
    /// YAML or JSON stratification config
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Emit the error report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resolve every build into a build plan")]
pub struct PlanArgs {
    /// YAML or JSON stratification config
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Observed source checksums and rmsk classes (JSON)
    #[arg(long, value_name = "FILE")]
    pub observed: Option<PathBuf>,

    /// Write the plan here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Also write provenance records keyed by output path
    #[arg(long, value_name = "FILE")]
    pub provenance: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "List planned output paths, sorted")]
pub struct PathsArgs {
    /// YAML or JSON stratification config
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Observed source checksums and rmsk classes (JSON)
    #[arg(long, value_name = "FILE")]
    pub observed: Option<PathBuf>,

    /// Only list outputs of this reference
    #[arg(long, value_name = "KEY")]
    pub reference: Option<String>,

    /// Only list outputs of this build
    #[arg(long, value_name = "KEY")]
    pub build: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Compare the provenance of two plans")]
pub struct DiffArgs {
    /// Earlier plan JSON
    #[arg(long, value_name = "FILE")]
    pub old: PathBuf,

    /// Later plan JSON
    #[arg(long, value_name = "FILE")]
    pub new: PathBuf,

    /// Exit non-zero when the plans differ
    #[arg(long)]
    pub check: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Write checksum manifests and stratification lists")]
pub struct ManifestArgs {
    /// Plan JSON produced by `plan`
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,

    /// Directory the plan's output paths are relative to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Write provenance with settled execution status here
    #[arg(long, value_name = "FILE")]
    pub status_out: Option<PathBuf>,
}
