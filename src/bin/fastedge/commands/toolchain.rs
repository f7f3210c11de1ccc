//! `fastedge toolchain` command

use anyhow::{bail, Result};

use crate::cli::ToolchainArgs;
use fastedge::builder::{CommandProbe, Language, ToolchainVerifier};
use fastedge::core::{CargoSnapshot, ManifestData};
use fastedge::sources::CratesIo;
use fastedge::util::diagnostic::{emit, Diagnostic};
use fastedge::util::{GlobalContext, Status};

pub fn execute(ctx: &GlobalContext, args: ToolchainArgs) -> Result<()> {
    let language: Language = match args.language {
        Some(language) => language.parse()?,
        None => {
            let manifest = ManifestData::load(ctx.root());
            manifest.check_readable()?;
            manifest.file.language.parse()?
        }
    };

    let toolchain = language.toolchain(ctx.config())?;
    let probe = CommandProbe::new(ctx.root());
    let index = CratesIo::new()?;
    let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

    let shell = ctx.shell();
    let reports = verifier.report(ctx.root(), &toolchain);
    let mut unsatisfied = 0;
    for report in &reports {
        if report.satisfied {
            shell.status(Status::Verified, report);
        } else {
            unsatisfied += 1;
            let mut diagnostic = Diagnostic::warning(report.to_string());
            if let Some(remediation) = &report.remediation {
                diagnostic = diagnostic.with_suggestion(remediation);
            }
            emit(&diagnostic, shell.use_color());
        }
    }

    if unsatisfied > 0 {
        bail!(
            "{} of {} {} toolchain requirements not met",
            unsatisfied,
            reports.len(),
            language
        );
    }
    Ok(())
}
