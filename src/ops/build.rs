//! Implementation of `fastedge build`.

use std::path::PathBuf;

use anyhow::Context;

use crate::builder::language::{Language, RUST_WASM_TARGET};
use crate::builder::package::{write_package, WASM_BINARY_PATH};
use crate::builder::verify::ToolchainVerifier;
use crate::core::errors::{Error, Result};
use crate::core::manifest::ManifestData;
use crate::util::context::GlobalContext;
use crate::util::fs::copy_file;
use crate::util::process::ProcessBuilder;
use crate::util::prompt::Prompt;
use crate::util::shell::Status;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Package name override (`--name`)
    pub name: Option<String>,

    /// Skip toolchain verification
    pub skip_verification: bool,
}

/// Build the project and package it.
///
/// Returns the path of the written package archive.
pub fn build(
    ctx: &GlobalContext,
    opts: &BuildOptions,
    prompt: &mut dyn Prompt,
    verifier: &ToolchainVerifier<'_>,
) -> Result<PathBuf> {
    let root = ctx.root();
    let shell = ctx.shell();

    let manifest = ManifestData::load(root).with_name_flag(opts.name.clone());
    manifest.check_readable()?;
    manifest.file.validate()?;
    let (name, _) = manifest.name();
    let language: Language = manifest.file.language.parse()?;
    tracing::debug!(%name, %language, root = %root.display(), "building");

    if opts.skip_verification {
        tracing::debug!("skipping toolchain verification");
    } else {
        let toolchain = language.toolchain(ctx.config())?;
        let spinner = shell.spinner(Status::Verifying, format!("{} toolchain...", language));
        verifier.verify(root, &toolchain)?;
        spinner.finish();
        shell.status(Status::Verified, format!("{} toolchain", language));
    }

    let command = match &manifest.file.scripts.build {
        Some(script) if !script.trim().is_empty() => {
            let script = script.trim().to_string();
            if ctx.flags().confirmations_allowed() {
                shell.note(format!(
                    "This project has a custom build script defined in the manifest: {}",
                    script
                ));
                if !prompt.confirm("Do you want to run this now?", false)? {
                    return Err(Error::BuildStopped);
                }
            }
            script
        }
        _ => language
            .default_build_command()
            .ok_or_else(|| {
                Error::invalid_manifest(format!(
                    "language '{}' has no default build command, add [scripts] build to the manifest",
                    language
                ))
            })?
            .to_string(),
    };

    run_build_command(ctx, &command)?;

    if language == Language::Rust {
        copy_rust_binary(ctx, verifier)?;
    } else if !root.join(WASM_BINARY_PATH).is_file() {
        return Err(Error::invalid_manifest(format!(
            "build finished without producing {}",
            WASM_BINARY_PATH
        )));
    }

    let spinner = shell.spinner(Status::Packaging, format!("'{}'...", name));
    let path = write_package(root, &name)?;
    spinner.finish();

    tracing::info!(package_path = %path.display(), "wrote package");
    shell.status(Status::Built, format!("package '{}'", name));
    Ok(path)
}

fn run_build_command(ctx: &GlobalContext, command: &str) -> Result<()> {
    let span = ctx.shell().span(Status::Building, command);
    let output = ProcessBuilder::shell(command).cwd(ctx.root()).exec()?;

    if ctx.shell().is_verbose() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            ctx.shell().out(line);
        }
    }

    if !output.status.success() {
        return Err(Error::BuildFailed {
            command: command.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    span.finish_with_message(command);
    Ok(())
}

/// Copy cargo's output to where every other language leaves its binary.
fn copy_rust_binary(ctx: &GlobalContext, verifier: &ToolchainVerifier<'_>) -> Result<()> {
    let root = ctx.root();
    let graph = verifier
        .snapshot()
        .read(root)
        .map_err(|e| Error::DependencyMetadataUnreadable {
            path: e.path().to_path_buf(),
            reason: e.to_string(),
        })?;
    let package = graph.package().ok_or_else(|| Error::DependencyMetadataUnreadable {
        path: root.join("Cargo.toml"),
        reason: "no package name".to_string(),
    })?;

    let built = root
        .join("target")
        .join(RUST_WASM_TARGET)
        .join("release")
        .join(format!("{}.wasm", package));
    let dest = root.join(WASM_BINARY_PATH);
    copy_file(&built, &dest)
        .with_context(|| format!("failed to copy {} to {}", built.display(), dest.display()))?;
    tracing::debug!(from = %built.display(), to = %dest.display(), "copied wasm binary");
    Ok(())
}
