//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use fastedge::ops::VersionSelector;

/// fastedge - build and deploy edge-compute Wasm packages
#[derive(Parser)]
#[command(name = "fastedge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub auto_yes: bool,

    /// Never prompt; use default values
    #[arg(short = 'i', long, global = true)]
    pub non_interactive: bool,

    /// Take default values instead of prompting for them
    #[arg(short = 'd', long, global = true)]
    pub accept_defaults: bool,

    /// API token
    #[arg(long, global = true, env = "FASTEDGE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API endpoint
    #[arg(long, global = true, env = "FASTEDGE_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project and write its package to pkg/
    Build(BuildArgs),

    /// Deploy a package to a service
    Deploy(DeployArgs),

    /// Check the installed toolchain against the project's requirements
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Package name (overrides the manifest)
    #[arg(long)]
    pub name: Option<String>,

    /// Skip checking the installed toolchain
    #[arg(long)]
    pub skip_verification: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Path to a package archive (defaults to pkg/<name>.tar.gz)
    #[arg(short, long)]
    pub package: Option<PathBuf>,

    /// Package name (overrides the manifest)
    #[arg(long)]
    pub name: Option<String>,

    /// Service ID (overrides the manifest)
    #[arg(short, long)]
    pub service_id: Option<String>,

    /// Version to deploy from: "latest", "active" or a version number
    #[arg(long)]
    pub version: Option<VersionSelector>,

    /// Comment to set on the deployed version
    #[arg(long)]
    pub comment: Option<String>,

    /// Domain to attach when the service has none
    #[arg(long)]
    pub domain: Option<String>,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Language to check (defaults to the manifest's language)
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
