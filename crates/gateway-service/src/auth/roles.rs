//! Role normalization.
//!
//! Maps provider-specific role claims onto canonical authorities. A raw role
//! is trimmed, upper-cased and prefixed (`user` -> `ROLE_USER`). Names that
//! already carry the prefix are left alone, so normalizing a canonical
//! authority yields the same authority.

use crate::auth::claims::ValidatedClaims;
use crate::config::Config;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Deduplicated set of canonical authorities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthoritySet(BTreeSet<String>);

impl AuthoritySet {
    pub fn contains(&self, authority: &str) -> bool {
        self.0.contains(authority)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for AuthoritySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Extracts and canonicalizes roles from verified claims.
#[derive(Debug, Clone)]
pub struct RoleNormalizer {
    /// Claim paths split on `.`, e.g. `[["realm_access", "roles"]]`.
    claim_paths: Vec<Vec<String>>,
    prefix: String,
}

impl RoleNormalizer {
    /// Create a normalizer.
    ///
    /// `claim_paths` are dotted paths into the token payload. Each may hold
    /// a list of strings or a single string.
    pub fn new<S: AsRef<str>>(claim_paths: &[S], prefix: &str) -> Self {
        Self {
            claim_paths: claim_paths
                .iter()
                .map(|p| p.as_ref().split('.').map(ToString::to_string).collect())
                .collect(),
            prefix: prefix.trim().to_uppercase(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.role_claim_paths, &config.authority_prefix)
    }

    /// Canonical form of a single role name, or `None` if it is blank.
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        let name = raw.trim().to_uppercase();
        if name.is_empty() {
            return None;
        }
        if name.starts_with(&self.prefix) {
            Some(name)
        } else {
            Some(format!("{}{}", self.prefix, name))
        }
    }

    /// Collect the authorities granted by a token.
    ///
    /// Missing paths and values of the wrong type contribute nothing; a token
    /// without roles yields an empty set.
    pub fn normalize(&self, claims: &ValidatedClaims) -> AuthoritySet {
        let authorities: AuthoritySet = self
            .claim_paths
            .iter()
            .filter_map(|path| claims.get_path(path))
            .flat_map(role_names)
            .filter_map(|raw| self.canonicalize(raw))
            .collect();

        tracing::debug!(
            target: "gateway.auth.roles",
            authority_count = authorities.len(),
            "Roles normalized"
        );

        authorities
    }
}

fn role_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(role) => vec![role.as_str()],
        Value::Array(roles) => roles.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
