//! Lenient semver parsing helpers.

use semver::{Op, Version, VersionReq};

/// Parse a version string, allowing for incomplete versions.
///
/// Toolchains report versions like `1.17` or `v16.13.0`; missing components
/// are treated as zero and a leading `v` is ignored.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);

    // Try exact parse first
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    // Split off a pre-release tag before padding the numeric part
    let (numeric, pre) = match s.split_once('-') {
        Some((n, p)) => (n, Some(p)),
        None => (s, None),
    };

    let parts: Vec<&str> = numeric.split('.').collect();
    let padded = match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            format!("{}.0.0", major)
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            format!("{}.{}.0", major, minor)
        }
        _ => return None,
    };

    match pre {
        Some(pre) => format!("{}-{}", padded, pre).parse().ok(),
        None => padded.parse().ok(),
    }
}

/// The lowest version a dependency requirement can resolve to.
///
/// `=0.4.0`, `^0.4.0`, `~0.4` and a bare `0.4.0` all yield `0.4.0`. Requirements
/// without a lower bound (`*`, `< 1.0`) yield `None`.
pub fn requirement_floor(req: &VersionReq) -> Option<Version> {
    req.comparators
        .iter()
        .filter(|c| {
            matches!(
                c.op,
                Op::Exact | Op::GreaterEq | Op::Greater | Op::Tilde | Op::Caret | Op::Wildcard
            )
        })
        .map(|c| {
            let mut v = Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0));
            v.pre = c.pre.clone();
            v
        })
        .max()
}
