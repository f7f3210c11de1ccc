//! Toolchain verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. each required tool is installed,
//! 2. each installed tool satisfies its constraint,
//! 3. the dependency snapshot is readable,
//! 4. the companion library is locked (when the declared library is new
//!    enough to need it),
//! 5. the locked companion satisfies its constraint.

use std::fmt;
use std::path::Path;

use semver::Version;

use crate::builder::language::{CompanionRule, LanguageToolchain, ToolRequirement};
use crate::builder::toolchain::{ProbeError, ToolchainProbe};
use crate::core::errors::{Error, Result};
use crate::core::lockfile::{DependencyGraph, DependencySnapshot};
use crate::sources::ReleaseIndex;

/// Outcome of checking one tool or library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainReport {
    pub tool: String,
    /// Detected version; `None` when the tool or library wasn't found.
    pub version: Option<Version>,
    pub constraint: String,
    pub satisfied: bool,
    pub remediation: Option<String>,
}

impl fmt::Display for ToolchainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, self.satisfied) {
            (Some(v), true) => write!(f, "{} {} satisfies '{}'", self.tool, v, self.constraint),
            (Some(v), false) => write!(
                f,
                "{} {} does not satisfy '{}'",
                self.tool, v, self.constraint
            ),
            (None, _) => write!(f, "{} not found (requires '{}')", self.tool, self.constraint),
        }
    }
}

/// Verifies a build environment against a language's requirements.
pub struct ToolchainVerifier<'a> {
    probe: &'a dyn ToolchainProbe,
    snapshot: &'a dyn DependencySnapshot,
    index: &'a dyn ReleaseIndex,
}

impl<'a> ToolchainVerifier<'a> {
    pub fn new(
        probe: &'a dyn ToolchainProbe,
        snapshot: &'a dyn DependencySnapshot,
        index: &'a dyn ReleaseIndex,
    ) -> Self {
        ToolchainVerifier {
            probe,
            snapshot,
            index,
        }
    }

    /// The dependency metadata source this verifier reads.
    pub fn snapshot(&self) -> &dyn DependencySnapshot {
        self.snapshot
    }

    /// Run every check, failing on the first problem.
    pub fn verify(&self, project_root: &Path, toolchain: &LanguageToolchain) -> Result<()> {
        for tool in &toolchain.tools {
            let version = self.detect(tool)?;
            check_constraint(tool, &version)?;
            tracing::debug!(tool = %tool.name, %version, constraint = %tool.constraint, "toolchain ok");
        }

        if let Some(rule) = &toolchain.companion {
            self.verify_companion(project_root, rule)?;
        }

        Ok(())
    }

    /// Run every check and report each result instead of failing.
    pub fn report(
        &self,
        project_root: &Path,
        toolchain: &LanguageToolchain,
    ) -> Vec<ToolchainReport> {
        let mut reports = Vec::new();

        for tool in &toolchain.tools {
            let report = match self.detect(tool) {
                Ok(version) => {
                    let satisfied = tool.constraint.matches(&version);
                    ToolchainReport {
                        tool: tool.name.clone(),
                        version: Some(version),
                        constraint: tool.constraint.to_string(),
                        satisfied,
                        remediation: (!satisfied).then(|| tool.constraint_remediation.clone()),
                    }
                }
                Err(e) => ToolchainReport {
                    tool: tool.name.clone(),
                    version: None,
                    constraint: tool.constraint.to_string(),
                    satisfied: false,
                    remediation: e.remediation().map(str::to_string),
                },
            };
            reports.push(report);
        }

        if let Some(rule) = &toolchain.companion {
            let outcome = self.verify_companion(project_root, rule);
            let locked = self
                .snapshot
                .read(project_root)
                .ok()
                .and_then(|graph| graph.locked(&rule.companion).cloned());
            reports.push(ToolchainReport {
                tool: rule.companion.clone(),
                version: locked,
                constraint: rule.constraint.to_string(),
                satisfied: outcome.is_ok(),
                remediation: outcome
                    .err()
                    .and_then(|e| e.remediation().map(str::to_string)),
            });
        }

        reports
    }

    fn detect(&self, tool: &ToolRequirement) -> Result<Version> {
        self.probe.version(&tool.spec).map_err(|e| match e {
            ProbeError::NotFound(_) => Error::ToolchainNotFound {
                tool: tool.name.clone(),
                remediation: tool.not_found_remediation.clone(),
            },
            other => Error::Other(
                anyhow::Error::new(other).context(format!("error detecting {} version", tool.name)),
            ),
        })
    }

    fn verify_companion(&self, project_root: &Path, rule: &CompanionRule) -> Result<()> {
        let graph = self.snapshot.read(project_root).map_err(|e| {
            Error::DependencyMetadataUnreadable {
                path: e.path().to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let Some(declared) = declared_version(&graph, &rule.library) else {
            tracing::debug!(library = %rule.library, "library not declared, skipping companion check");
            return Ok(());
        };

        if declared < rule.introduced {
            tracing::debug!(
                library = %rule.library,
                %declared,
                introduced = %rule.introduced,
                "library predates companion, skipping companion check"
            );
            return Ok(());
        }

        let Some(locked) = graph.locked(&rule.companion) else {
            return Err(Error::CompanionLibraryMissing {
                library: rule.library.clone(),
                companion: rule.companion.clone(),
                remediation: self.pin_remediation(rule),
            });
        };

        if !rule.constraint.matches(locked) {
            return Err(Error::CompanionLibraryOutdated {
                library: rule.library.clone(),
                companion: rule.companion.clone(),
                found: locked.clone(),
                constraint: rule.constraint.to_string(),
                remediation: self.pin_remediation(rule),
            });
        }

        tracing::debug!(companion = %rule.companion, version = %locked, "companion ok");
        Ok(())
    }

    fn latest_known_good(&self, rule: &CompanionRule) -> Version {
        match self.index.latest_stable(&rule.library) {
            Ok(version) => version,
            Err(e) => {
                tracing::debug!(
                    library = %rule.library,
                    fallback = %rule.fallback_version,
                    "release lookup failed: {:#}",
                    e
                );
                rule.fallback_version.clone()
            }
        }
    }

    fn pin_remediation(&self, rule: &CompanionRule) -> String {
        let latest = self.latest_known_good(rule);
        format!(
            "Update the `{lib}` dependency in Cargo.toml: `{lib} = \"^{latest}\"`",
            lib = rule.library,
            latest = latest
        )
    }
}

fn check_constraint(tool: &ToolRequirement, version: &Version) -> Result<()> {
    if tool.constraint.matches(version) {
        return Ok(());
    }
    Err(Error::ConstraintNotMet {
        tool: tool.name.clone(),
        constraint: tool.constraint.to_string(),
        found: version.clone(),
        remediation: tool.constraint_remediation.clone(),
    })
}

/// The declared version of a library: the floor of its requirement, or the
/// locked version when the requirement has no usable floor.
fn declared_version(graph: &DependencyGraph, library: &str) -> Option<Version> {
    graph
        .declared_floor(library)
        .or_else(|| graph.locked(library).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::language::Language;
    use crate::core::errors::ErrorKind;
    use crate::core::lockfile::CargoSnapshot;
    use crate::sources::FixedRelease;
    use crate::test_support::{FailingRelease, StaticProbe};
    use crate::util::config::Config;
    use tempfile::TempDir;

    fn rust_project(cargo_toml: &str, cargo_lock: Option<&str>) -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Cargo.toml"), cargo_toml).unwrap();
        if let Some(lock) = cargo_lock {
            std::fs::write(tmp.path().join("Cargo.lock"), lock).unwrap();
        }
        tmp
    }

    fn cargo_toml(fastly: &str) -> String {
        format!(
            "[package]\nname = \"test\"\nversion = \"0.1.0\"\n\n[dependencies]\nfastly = \"{}\"\n",
            fastly
        )
    }

    fn rust_toolchain(companion_constraint: &str) -> LanguageToolchain {
        let mut config = Config::default();
        config.language.rust.companion_constraint = Some(companion_constraint.to_string());
        Language::Rust.toolchain(&config).unwrap()
    }

    #[test]
    fn test_library_predating_companion_skips_check() {
        let project = rust_project(&cargo_toml("=0.3.2"), None);
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 4, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        verifier
            .verify(project.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap();
    }

    #[test]
    fn test_companion_missing() {
        let project = rust_project(
            &cargo_toml("=0.4.0"),
            Some("[[package]]\nname = \"fastly\"\nversion = \"0.4.0\"\n"),
        );
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 4, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let err = verifier
            .verify(project.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap_err();
        assert_eq!(err.to_string(), "fastly-sys crate not found");
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.remediation().unwrap().contains("fastly = \"^0.4.0\""));
    }

    #[test]
    fn test_companion_outdated() {
        let project = rust_project(
            &cargo_toml("=0.4.0"),
            Some("[[package]]\nname = \"fastly-sys\"\nversion = \"0.3.7\"\n"),
        );
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let err = verifier
            .verify(project.path(), &rust_toolchain(">= 0.4.0 <= 0.9.0"))
            .unwrap_err();
        assert!(err.to_string().contains("fastly crate not up-to-date"));
        assert!(err.remediation().unwrap().contains("fastly = \"^0.6.0\""));
    }

    #[test]
    fn test_companion_satisfied() {
        let project = rust_project(
            &cargo_toml("0.6.0"),
            Some(
                "[[package]]\nname = \"fastly-sys\"\nversion = \"0.3.7\"\n\n[[package]]\nname = \"fastly\"\nversion = \"0.6.0\"\n",
            ),
        );
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        verifier
            .verify(project.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap();
    }

    #[test]
    fn test_index_failure_uses_fallback() {
        let project = rust_project(&cargo_toml("=0.4.0"), None);
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &FailingRelease);

        let mut config = Config::default();
        config.language.rust.fallback_library_version = Some("0.9.1".to_string());
        let toolchain = Language::Rust.toolchain(&config).unwrap();

        let err = verifier.verify(project.path(), &toolchain).unwrap_err();
        assert!(err.remediation().unwrap().contains("fastly = \"^0.9.1\""));
    }

    #[test]
    fn test_unreadable_metadata() {
        let project = rust_project("[package]\nname = \"test\"\n", None);
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let err = verifier
            .verify(project.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap_err();
        assert!(matches!(err, Error::DependencyMetadataUnreadable { .. }));
        assert!(err.to_string().contains("reading cargo metadata"));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let empty = TempDir::new().unwrap();
        let err = verifier
            .verify(empty.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap_err();
        assert!(matches!(err, Error::DependencyMetadataUnreadable { .. }));
    }

    #[test]
    fn test_toolchain_constraint_not_met() {
        let project = rust_project(&cargo_toml("=0.4.0"), None);
        let probe = StaticProbe::new().with("rustc", "1.49.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let mut config = Config::default();
        config.language.rust.toolchain_constraint = Some(">= 1.0.0 < 1.40.0".to_string());
        let toolchain = Language::Rust.toolchain(&config).unwrap();

        let err = verifier.verify(project.path(), &toolchain).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("rustc constraint '>= 1.0.0 < 1.40.0' not met:"));
        assert_eq!(
            err.remediation(),
            Some("Run `rustup update stable`, or ensure your `rust-toolchain` file specifies a version matching the constraint (e.g. `channel = \"stable\"`).")
        );
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        // No Cargo.toml at all: the missing tool must still be reported first.
        let empty = TempDir::new().unwrap();
        let probe = StaticProbe::new();
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let err = verifier
            .verify(empty.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"))
            .unwrap_err();
        assert!(matches!(err, Error::ToolchainNotFound { .. }));

        let config = Config::default();
        let go = Language::Go.toolchain(&config).unwrap();
        let probe = StaticProbe::new().with("go", "1.16.0").with("tinygo", "0.24.0");
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);
        let err = verifier.verify(empty.path(), &go).unwrap_err();
        assert!(err.to_string().starts_with("go constraint"));
        assert_eq!(probe.calls(), vec!["go".to_string()]);
    }

    #[test]
    fn test_report_does_not_stop() {
        let empty = TempDir::new().unwrap();
        let config = Config::default();
        let go = Language::Go.toolchain(&config).unwrap();
        let probe = StaticProbe::new().with("go", "1.16.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let reports = verifier.report(empty.path(), &go);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].tool, "go");
        assert_eq!(reports[0].version, Some(Version::new(1, 16, 0)));
        assert!(!reports[0].satisfied);
        assert!(reports[0].remediation.is_some());
        assert_eq!(reports[1].tool, "tinygo");
        assert!(reports[1].version.is_none());
        assert_eq!(
            reports[1].to_string(),
            "tinygo not found (requires '>= 0.24.0-0')"
        );
    }

    #[test]
    fn test_report_includes_companion() {
        let project = rust_project(
            &cargo_toml("0.6.0"),
            Some("[[package]]\nname = \"fastly-sys\"\nversion = \"0.3.7\"\n"),
        );
        let probe = StaticProbe::new().with("rustc", "1.60.0");
        let index = FixedRelease(Version::new(0, 6, 0));
        let verifier = ToolchainVerifier::new(&probe, &CargoSnapshot, &index);

        let reports = verifier.report(project.path(), &rust_toolchain(">= 0.3.0 <= 0.6.0"));
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.satisfied));
        assert_eq!(reports[1].to_string(), "fastly-sys 0.3.7 satisfies '>= 0.3.0 <= 0.6.0'");
    }
}
