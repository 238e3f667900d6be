//! Ordered authorization rules.
//!
//! Rules are evaluated top to bottom and the first matching pattern decides.
//! There is no specificity ordering, so a narrow rule must be declared
//! before a broader one that covers it.

use crate::auth::roles::RoleNormalizer;
use crate::authz::{Decision, Identity};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("path pattern must start with '/', got '{0}'")]
    RelativePattern(String),

    #[error("wildcards are only allowed as a final '/*' or '/**' segment, got '{0}'")]
    MisplacedWildcard(String),

    #[error("requirement must be 'public', 'authenticated' or 'role:NAME', got '{0}'")]
    UnknownRequirement(String),
}

/// Request path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),

    /// `base/**`: matches `base` itself and anything below it. An empty
    /// base (`/**`) matches every path.
    Prefix(String),

    /// `base/*`: matches exactly one segment below `base`.
    SingleSegment(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PathPattern::SingleSegment(base) => path
                .strip_prefix(base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|segment| !segment.is_empty() && !segment.contains('/')),
        }
    }
}

impl FromStr for PathPattern {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            return Err(RuleParseError::RelativePattern(s.to_string()));
        }

        let (pattern, base) = if let Some(base) = s.strip_suffix("/**") {
            (PathPattern::Prefix(base.to_string()), base)
        } else if let Some(base) = s.strip_suffix("/*") {
            (PathPattern::SingleSegment(base.to_string()), base)
        } else {
            (PathPattern::Exact(s.to_string()), s)
        };

        if base.contains('*') {
            return Err(RuleParseError::MisplacedWildcard(s.to_string()));
        }

        Ok(pattern)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(path) => write!(f, "{}", path),
            PathPattern::Prefix(base) => write!(f, "{}/**", base),
            PathPattern::SingleSegment(base) => write!(f, "{}/*", base),
        }
    }
}

/// What a matched route demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    AnyAuthenticated,
    /// Holds the role name as written until the table canonicalizes it.
    RequiresAuthority(String),
}

impl FromStr for Requirement {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        match lower.as_str() {
            "public" => Ok(Requirement::Public),
            "authenticated" => Ok(Requirement::AnyAuthenticated),
            _ => lower
                .strip_prefix("role:")
                .and_then(|_| trimmed.get("role:".len()..))
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| Requirement::RequiresAuthority(name.to_string()))
                .ok_or_else(|| RuleParseError::UnknownRequirement(s.to_string())),
        }
    }
}

/// One `(pattern, requirement)` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl Rule {
    pub fn new(pattern: PathPattern, requirement: Requirement) -> Self {
        Self {
            pattern,
            requirement,
        }
    }
}

/// Immutable, ordered rule table.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    default: Requirement,
}

impl RuleTable {
    /// Build a table, canonicalizing authority names with the same rules the
    /// normalizer applies to token roles.
    pub fn new(rules: Vec<Rule>, default: Requirement, normalizer: &RoleNormalizer) -> Self {
        let canonical = |requirement: Requirement| match requirement {
            Requirement::RequiresAuthority(name) => {
                Requirement::RequiresAuthority(normalizer.canonicalize(&name).unwrap_or_default())
            }
            other => other,
        };

        Self {
            rules: rules
                .into_iter()
                .map(|rule| Rule::new(rule.pattern, canonical(rule.requirement)))
                .collect(),
            default: canonical(default),
        }
    }

    /// Requirement for a path: the first matching rule, else the default.
    pub fn requirement_for(&self, path: &str) -> &Requirement {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map_or(&self.default, |rule| &rule.requirement)
    }

    /// Decide whether a request may proceed.
    pub fn evaluate(&self, path: &str, identity: Option<Identity>) -> Decision {
        let decision = match (self.requirement_for(path), identity) {
            (Requirement::Public, identity) => Decision::Allow(identity),
            (_, None) => Decision::RejectUnauthenticated,
            (Requirement::AnyAuthenticated, Some(identity)) => Decision::Allow(Some(identity)),
            (Requirement::RequiresAuthority(authority), Some(identity)) => {
                if identity.authorities.contains(authority) {
                    Decision::Allow(Some(identity))
                } else {
                    Decision::RejectForbidden
                }
            }
        };

        tracing::debug!(
            target: "gateway.authz",
            path = %path,
            decision = decision.as_label(),
            "Authorization decision"
        );

        decision
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
