//! `fastedge build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use fastedge::builder::{CommandProbe, ToolchainVerifier};
use fastedge::core::CargoSnapshot;
use fastedge::ops::{build, BuildOptions};
use fastedge::sources::CratesIo;
use fastedge::util::{stdio_prompt, GlobalContext};

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let opts = BuildOptions {
        name: args.name,
        skip_verification: args.skip_verification,
    };

    let probe = CommandProbe::new(ctx.root());
    let index = CratesIo::new()?;
    let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

    build(ctx, &opts, stdio_prompt().as_mut(), &verifier)?;
    Ok(())
}
