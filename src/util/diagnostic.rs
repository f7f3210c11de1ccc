//! User-friendly diagnostic messages.
//!
//! Every error shown to the user carries its root cause, any structured
//! context, and remediation text telling them what to change.

use std::fmt;
use std::path::PathBuf;

/// Common remediation messages for consistent error handling.
pub mod suggestions {
    /// Remediation when no manifest file can be read.
    pub const NO_MANIFEST: &str =
        "Ensure a correctly configured fastedge.toml manifest exists in the project directory, or pass `--package` with an existing package archive.";

    /// Remediation for an unparsable constraint in configuration.
    pub const MALFORMED_CONSTRAINT: &str =
        "Constraints are space-separated comparator/version pairs, e.g. `>= 1.54.0 < 2.0.0`. Fix the value in .fastedge/config.toml.";

    /// Remediation when the Cargo dependency metadata cannot be read.
    pub const CARGO_METADATA: &str =
        "Ensure Cargo.toml declares a [package] with a name and version and that `cargo metadata` succeeds.";

    /// Remediation when no package artifact exists yet.
    pub const BUILD_FIRST: &str =
        "Run `fastedge build` to produce a package, or pass `--package` with the path to an existing archive.";

    /// Remediation when the operator declines a custom build script.
    pub const CUSTOM_BUILD: &str =
        "Remove or update the custom [scripts] build setting in the fastedge.toml manifest.";

    /// Remediation when the build command fails.
    pub const BUILD_FAILED: &str = "Run `fastedge build --verbose` for more details";

    /// Remediation for authentication problems.
    pub const AUTH: &str =
        "Pass a valid API token with `--token`, set FASTEDGE_API_TOKEN, or add `token` under [api] in the fastedge config.";

    /// Remediation when the trial could not be enabled.
    pub const COMPUTE_TRIAL: &str =
        "Ensure the edge-compute platform is enabled on your account. Contact support if the problem persists.";

    /// Remediation for a service that is not a Wasm service.
    pub const WRONG_SERVICE_TYPE: &str =
        "Ensure the provided service ID is associated with a 'wasm' service and not a 'vcl' service.";

    /// Remediation for unknown service IDs or versions.
    pub const SERVICE_ID: &str =
        "Check the `service_id` in fastedge.toml or the `--service-id`/`--version` flags.";

    /// Remediation when the package exceeds the size limit.
    pub const PACKAGE_SIZE: &str =
        "Reduce the size of the Wasm binary (build in release mode, strip debug info) so the package stays under 50MB.";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
