//! `fastedge deploy` command

use anyhow::Result;

use crate::cli::DeployArgs;
use fastedge::api::HttpClient;
use fastedge::core::ManifestData;
use fastedge::ops::{validate_package, DeployOrchestrator, DeployOutcome, DeployRequest};
use fastedge::util::{stdio_prompt, GlobalContext};

pub fn execute(ctx: &GlobalContext, args: DeployArgs) -> Result<()> {
    let token = ctx.require_token()?;
    let root = ctx.root();

    let package_path = args.package.map(|p| if p.is_absolute() { p } else { root.join(p) });

    let mut manifest = ManifestData::load(root)
        .with_name_flag(args.name)
        .with_service_id_flag(args.service_id);
    let package = validate_package(root, &mut manifest, package_path.as_deref())?;

    let (service_id, _) = manifest.service_id();
    let request = DeployRequest {
        package,
        service_id: Some(service_id).filter(|s| !s.is_empty()),
        version: args.version.unwrap_or_default(),
        comment: args.comment,
        domain: args.domain,
        // An explicit package may not belong to this project.
        manifest_path: package_path.is_none().then(|| ctx.manifest_path()),
        setup: manifest.file.setup.clone(),
    };

    let client = HttpClient::new(ctx.endpoint(), token)?;
    let shell = ctx.shell();
    let mut orchestrator = DeployOrchestrator::new(&client, &client, shell, ctx.flags());
    match orchestrator.deploy(&request, stdio_prompt().as_mut())? {
        DeployOutcome::Declined => tracing::info!("service creation declined"),
        DeployOutcome::Deployed { service_id, version }
        | DeployOutcome::Unchanged { service_id, version } => {
            tracing::debug!(%service_id, version, "deploy finished");
        }
    }
    Ok(())
}
