//! fastedge CLI - build and deploy edge-compute Wasm packages

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fastedge::util::diagnostic::{emit, Diagnostic};
use fastedge::util::shell::{ColorChoice, Shell};
use fastedge::util::{Flags, GlobalContext};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color));

    if let Err(e) = run(cli, Arc::clone(&shell)) {
        let diagnostic = match e.downcast_ref::<fastedge::Error>() {
            Some(err) => err.to_diagnostic(),
            None => Diagnostic::error(format!("{:#}", e)),
        };
        emit(&diagnostic, shell.use_color());
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: Arc<Shell>) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("fastedge=debug")
    } else {
        EnvFilter::new("fastedge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // The working directory is read once; everything below takes the root.
    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut ctx = GlobalContext::new(root, shell);
    ctx.set_flags(Flags {
        auto_yes: cli.auto_yes,
        non_interactive: cli.non_interactive,
        accept_defaults: cli.accept_defaults,
        verbose: cli.verbose,
    });
    ctx.set_token(cli.token);
    ctx.set_endpoint(cli.endpoint);

    match cli.command {
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Deploy(args) => commands::deploy::execute(&ctx, args),
        Commands::Toolchain(args) => commands::toolchain::execute(&ctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
