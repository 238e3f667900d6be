//! Path-based authorization.
//!
//! # Components
//!
//! - `rules` - Path patterns, requirements and the ordered rule table
//!
//! An [`Identity`] is only ever built from a validated token. The rule table
//! turns `(path, Option<Identity>)` into a [`Decision`].

pub mod rules;

pub use rules::{PathPattern, Requirement, Rule, RuleParseError, RuleTable};

use crate::auth::roles::AuthoritySet;
use std::fmt;

/// Authenticated caller, attached to request extensions on Allow.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Token subject - redacted in Debug output.
    pub subject: String,

    /// Canonical authorities granted by the token.
    pub authorities: AuthoritySet,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("authorities", &self.authorities)
            .finish()
    }
}

/// Outcome of evaluating the rule table for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward the request, with the caller's identity if there is one.
    Allow(Option<Identity>),

    /// The route needs an authenticated caller and there is none.
    RejectUnauthenticated,

    /// The caller is authenticated but lacks the required authority.
    RejectForbidden,
}

impl Decision {
    /// Label used for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Decision::Allow(_) => "allow",
            Decision::RejectUnauthenticated => "unauthenticated",
            Decision::RejectForbidden => "forbidden",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_debug_redacts_subject() {
        let identity = Identity {
            subject: "f3a1c2d4-user".to_string(),
            authorities: ["ROLE_USER".to_string()].into_iter().collect(),
        };

        let debug_str = format!("{:?}", identity);

        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("ROLE_USER"));
        assert!(!debug_str.contains("f3a1c2d4-user"));
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(Decision::Allow(None).as_label(), "allow");
        assert_eq!(
            Decision::RejectUnauthenticated.as_label(),
            "unauthenticated"
        );
        assert_eq!(Decision::RejectForbidden.as_label(), "forbidden");
    }
}
