//! Compound version constraints such as `>= 1.54.0 < 2.0.0`.
//!
//! A constraint is a conjunction of comparator/version terms. There is no
//! disjunction. Pre-release versions order below the release of the same
//! numeric triple, except for `=` which requires an exact match including the
//! pre-release tag.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::core::errors::{Error, Result};
use crate::core::version::parse_version_lenient;

/// A single comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Less,
    LessEq,
    Exact,
    GreaterEq,
    Greater,
}

impl Comparator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Comparator::Less),
            "<=" => Some(Comparator::LessEq),
            "=" | "" => Some(Comparator::Exact),
            ">=" => Some(Comparator::GreaterEq),
            ">" => Some(Comparator::Greater),
            _ => None,
        }
    }

    /// The operator as written in a constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessEq => "<=",
            Comparator::Exact => "=",
            Comparator::GreaterEq => ">=",
            Comparator::Greater => ">",
        }
    }

    /// Check whether `candidate <op> bound` holds.
    pub fn holds(&self, candidate: &Version, bound: &Version) -> bool {
        let ord = precedence(candidate, bound);
        match self {
            Comparator::Less => ord == Ordering::Less,
            Comparator::LessEq => ord != Ordering::Greater,
            Comparator::Exact => ord == Ordering::Equal,
            Comparator::GreaterEq => ord != Ordering::Less,
            Comparator::Greater => ord == Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare by major, minor, patch, then pre-release. Build metadata is ignored.
///
/// `semver::Prerelease` already sorts the empty tag above any non-empty one,
/// which gives "pre-release < release" for the same triple.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// One `comparator version` term of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub op: Comparator,
    pub version: Version,
}

/// A parsed, immutable version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    terms: Vec<Term>,
}

impl VersionConstraint {
    /// Parse a constraint expression.
    ///
    /// Terms are separated by whitespace or commas. The operator may be
    /// attached to the version (`>=1.2.3`) or separated from it (`>= 1.2.3`).
    /// A bare version means `=`.
    pub fn parse(expr: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedConstraint {
            constraint: expr.to_string(),
            reason,
        };

        let normalized = expr.replace(',', " ");
        let mut tokens = normalized.split_whitespace();
        let mut terms = Vec::new();

        while let Some(token) = tokens.next() {
            let split = token
                .find(|c: char| !matches!(c, '<' | '>' | '=' | '!'))
                .unwrap_or(token.len());
            let (op_str, mut version_str) = token.split_at(split);

            let op = Comparator::parse(op_str)
                .ok_or_else(|| malformed(format!("unknown comparator '{}'", op_str)))?;

            if version_str.is_empty() {
                version_str = match tokens.next() {
                    Some(next) if !next.starts_with(['<', '>', '=', '!']) => next,
                    _ => return Err(malformed(format!("comparator '{}' has no version", op_str))),
                };
            }

            let version = parse_version_lenient(version_str)
                .ok_or_else(|| malformed(format!("invalid version '{}'", version_str)))?;

            terms.push(Term { op, version });
        }

        if terms.is_empty() {
            return Err(malformed("constraint is empty".to_string()));
        }

        Ok(VersionConstraint {
            raw: expr.trim().to_string(),
            terms,
        })
    }

    /// Check whether a version satisfies every term.
    pub fn matches(&self, version: &Version) -> bool {
        self.terms
            .iter()
            .all(|term| term.op.holds(version, &term.version))
    }

    /// The constraint exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed terms, in the order they were written.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        VersionConstraint::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn c(s: &str) -> VersionConstraint {
        VersionConstraint::parse(s).unwrap()
    }

    #[test]
    fn test_parse_forms() {
        let spaced = c(">= 1.54.0 < 2.0.0");
        assert_eq!(spaced.terms().len(), 2);
        assert_eq!(spaced.terms()[0].op, Comparator::GreaterEq);
        assert_eq!(spaced.terms()[1].op, Comparator::Less);
        assert_eq!(spaced.terms()[1].version, Version::new(2, 0, 0));

        let attached = c(">=1.54.0 <2.0.0");
        assert_eq!(attached.terms(), spaced.terms());

        let commas = c(">= 1.54.0, < 2.0.0");
        assert_eq!(commas.terms(), spaced.terms());

        let bare = c("0.0.0");
        assert_eq!(bare.terms()[0].op, Comparator::Exact);

        let short = c(">= 1.17 < 1.19");
        assert_eq!(short.terms()[0].version, Version::new(1, 17, 0));

        assert_eq!(spaced.as_str(), ">= 1.54.0 < 2.0.0");
        assert_eq!(spaced.to_string(), ">= 1.54.0 < 2.0.0");
    }

    #[test]
    fn test_malformed() {
        for expr in ["", "   ", ">=", ">= < 1.0.0", "=> 1.0.0", "!= 1.0.0", ">= one", "^1.2.3"] {
            let err = VersionConstraint::parse(expr).unwrap_err();
            assert!(
                matches!(err, Error::MalformedConstraint { .. }),
                "expected malformed for {:?}, got {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_matches_range() {
        let range = c(">= 1.0.0 < 1.40.0");
        assert!(range.matches(&v("1.0.0")));
        assert!(range.matches(&v("1.39.9")));
        assert!(!range.matches(&v("1.40.0")));
        assert!(!range.matches(&v("0.9.9")));

        let inclusive = c(">= 0.4.0 <= 0.9.0");
        assert!(inclusive.matches(&v("0.9.0")));
        assert!(!inclusive.matches(&v("0.3.7")));
        assert!(!inclusive.matches(&v("0.9.1")));
    }

    #[test]
    fn test_prerelease_ordering() {
        // Pre-release sorts below the release for ordering comparators.
        assert!(c("< 1.0.0").matches(&v("1.0.0-beta.1")));
        assert!(!c(">= 1.0.0").matches(&v("1.0.0-beta.1")));
        assert!(c(">= 0.24.0-0").matches(&v("0.24.0")));
        assert!(c(">= 0.24.0-0").matches(&v("0.24.0-rc.1")));
        assert!(c("> 0.9.9").matches(&v("1.0.0-alpha")));

        // Exact match requires the same pre-release tag.
        assert!(c("= 1.0.0-beta.1").matches(&v("1.0.0-beta.1")));
        assert!(!c("= 1.0.0").matches(&v("1.0.0-beta.1")));
        assert!(!c("= 1.0.0-beta.1").matches(&v("1.0.0")));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert!(c("= 1.2.3").matches(&v("1.2.3+build.5")));
    }

    #[test]
    fn test_lower_bound_is_monotonic() {
        let bounds = ["0.0.1", "0.3.3", "1.0.0-rc.1", "1.54.0", "2.0.0"];
        let samples = [
            "0.0.0", "0.0.1", "0.3.2", "0.3.3", "0.9.0", "1.0.0-alpha", "1.0.0-rc.1", "1.0.0",
            "1.53.9", "1.54.0", "1.54.0-beta", "1.60.2", "2.0.0", "10.0.0",
        ];

        for bound in bounds {
            let constraint = c(&format!(">= {}", bound));
            for a in samples {
                for b in samples {
                    let (va, vb) = (v(a), v(b));
                    if precedence(&va, &vb) != Ordering::Greater && constraint.matches(&va) {
                        assert!(
                            constraint.matches(&vb),
                            "{} satisfies >= {} but larger {} does not",
                            a,
                            bound,
                            b
                        );
                    }
                }
            }
        }
    }
}
