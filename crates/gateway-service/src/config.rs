//! Gateway configuration.
//!
//! Configuration is loaded from environment variables. The rule table and the
//! role-claim mapping are parsed here so that a bad value fails startup
//! instead of surfacing on the first request.

use crate::authz::{Requirement, Rule};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default timeout for a single JWKS fetch attempt.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_MS: u64 = 5000;

/// Default leeway applied to `exp`/`nbf`. Zero means no tolerance.
pub const DEFAULT_JWT_LEEWAY_SECONDS: u64 = 0;

/// Default claim path holding the issuer's realm roles.
pub const DEFAULT_ROLE_CLAIM_PATHS: &str = "realm_access.roles";

/// Default prefix for canonical authorities.
pub const DEFAULT_AUTHORITY_PREFIX: &str = "ROLE_";

/// Default whole-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Built-in rule table, evaluated top to bottom.
pub const DEFAULT_GATEWAY_RULES: &str = "/api/public/**=public,\
/v3/api-docs/**=public,\
/swagger-ui/**=public,\
/swagger-ui.html=public,\
/health=public,\
/ready=public,\
/metrics=public,\
/api/user/**=role:USER,\
/api/admin/**=role:ADMIN";

/// Requirement applied to paths no rule matches.
pub const DEFAULT_GATEWAY_DEFAULT_REQUIREMENT: &str = "authenticated";

/// Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// URL of the issuer's JWKS endpoint.
    pub jwks_url: String,

    /// Expected `iss` claim.
    pub jwt_issuer: String,

    /// Accepted `aud` values; a token must name at least one.
    pub jwt_audiences: Vec<String>,

    /// Tolerance in seconds for `exp` and `nbf`.
    pub jwt_leeway_seconds: u64,

    /// Tolerance in seconds for `iat` values in the future.
    pub jwt_clock_skew_seconds: i64,

    /// How long fetched keys are trusted before a refresh.
    pub jwks_cache_ttl_seconds: u64,

    /// Timeout for a single JWKS fetch attempt, in milliseconds.
    pub jwks_fetch_timeout_ms: u64,

    /// Dotted claim paths the role normalizer reads roles from.
    pub role_claim_paths: Vec<String>,

    /// Prefix carried by every canonical authority.
    pub authority_prefix: String,

    /// Ordered authorization rules.
    pub rules: Vec<Rule>,

    /// Requirement for paths no rule matches.
    pub default_requirement: Requirement,

    /// Whole-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Debug output names the rule count rather than echoing the whole table.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audiences", &self.jwt_audiences)
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwks_fetch_timeout_ms", &self.jwks_fetch_timeout_ms)
            .field("role_claim_paths", &self.role_claim_paths)
            .field("authority_prefix", &self.authority_prefix)
            .field("rule_count", &self.rules.len())
            .field("default_requirement", &self.default_requirement)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidJwtLeeway(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid role mapping configuration: {0}")]
    InvalidRoleMapping(String),

    #[error("Invalid authorization rule: {0}")]
    InvalidRule(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_url = required(vars, "JWKS_URL")?;
        let jwt_issuer = required(vars, "JWT_ISSUER")?;

        let jwt_audiences = split_list(&required(vars, "JWT_AUDIENCE")?);
        if jwt_audiences.is_empty() {
            return Err(ConfigError::MissingEnvVar("JWT_AUDIENCE".to_string()));
        }

        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_JWT_LEEWAY_SECONDS
        };

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let jwks_cache_ttl_seconds = positive_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
            ConfigError::InvalidJwks,
        )?;

        let jwks_fetch_timeout_ms = positive_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_MS",
            DEFAULT_JWKS_FETCH_TIMEOUT_MS,
            ConfigError::InvalidJwks,
        )?;

        let role_claim_paths = split_list(
            vars.get("ROLE_CLAIM_PATHS")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ROLE_CLAIM_PATHS),
        );
        if role_claim_paths.is_empty() {
            return Err(ConfigError::InvalidRoleMapping(
                "ROLE_CLAIM_PATHS must name at least one claim path".to_string(),
            ));
        }
        if let Some(bad) = role_claim_paths
            .iter()
            .find(|p| p.split('.').any(str::is_empty))
        {
            return Err(ConfigError::InvalidRoleMapping(format!(
                "ROLE_CLAIM_PATHS entry '{}' has an empty segment",
                bad
            )));
        }

        let authority_prefix = vars
            .get("AUTHORITY_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTHORITY_PREFIX.to_string());
        if authority_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidRoleMapping(format!(
                "AUTHORITY_PREFIX must not contain whitespace, got '{}'",
                authority_prefix
            )));
        }

        let rules = parse_rules(
            vars.get("GATEWAY_RULES")
                .map(String::as_str)
                .unwrap_or(DEFAULT_GATEWAY_RULES),
        )?;

        let default_requirement_str = vars
            .get("GATEWAY_DEFAULT_REQUIREMENT")
            .map(String::as_str)
            .unwrap_or(DEFAULT_GATEWAY_DEFAULT_REQUIREMENT);
        let default_requirement: Requirement = default_requirement_str.parse().map_err(|e| {
            ConfigError::InvalidRule(format!("GATEWAY_DEFAULT_REQUIREMENT: {}", e))
        })?;

        let request_timeout_seconds = positive_u64(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
            ConfigError::InvalidRequestTimeout,
        )?;

        Ok(Config {
            bind_address,
            jwks_url,
            jwt_issuer,
            jwt_audiences,
            jwt_leeway_seconds,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_ms,
            role_claim_paths,
            authority_prefix: authority_prefix.to_uppercase(),
            rules,
            default_requirement,
            request_timeout_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn positive_u64(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        err(format!(
            "{} must be a valid positive integer, got '{}': {}",
            key, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(err(format!("{} must be greater than 0", key)));
    }

    Ok(value)
}

/// Parse a rule list of the form `pattern=requirement,pattern=requirement`.
fn parse_rules(value: &str) -> Result<Vec<Rule>, ConfigError> {
    split_list(value)
        .iter()
        .map(|entry| {
            let (pattern, requirement) = entry.split_once('=').ok_or_else(|| {
                ConfigError::InvalidRule(format!(
                    "'{}' must have the form pattern=requirement",
                    entry
                ))
            })?;

            let pattern = pattern
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidRule(format!("'{}': {}", entry, e)))?;
            let requirement = requirement
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidRule(format!("'{}': {}", entry, e)))?;

            Ok(Rule::new(pattern, requirement))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::authz::PathPattern;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "JWKS_URL".to_string(),
                "https://idp.example.com/realms/demo/protocol/openid-connect/certs".to_string(),
            ),
            (
                "JWT_ISSUER".to_string(),
                "https://idp.example.com/realms/demo".to_string(),
            ),
            ("JWT_AUDIENCE".to_string(), "account".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.jwt_issuer, "https://idp.example.com/realms/demo");
        assert_eq!(config.jwt_audiences, vec!["account".to_string()]);
        assert_eq!(config.jwt_leeway_seconds, 0);
        assert_eq!(
            config.jwt_clock_skew_seconds,
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        );
        assert_eq!(config.jwks_cache_ttl_seconds, DEFAULT_JWKS_CACHE_TTL_SECONDS);
        assert_eq!(config.jwks_fetch_timeout_ms, DEFAULT_JWKS_FETCH_TIMEOUT_MS);
        assert_eq!(config.role_claim_paths, vec!["realm_access.roles".to_string()]);
        assert_eq!(config.authority_prefix, "ROLE_");
        assert_eq!(config.default_requirement, Requirement::AnyAuthenticated);
        assert_eq!(config.request_timeout_seconds, 30);
    }

    #[test]
    fn test_default_rules_match_documented_table() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(config.rules.len(), 9);
        let first = config.rules.first().unwrap();
        assert_eq!(first.pattern, PathPattern::Prefix("/api/public".to_string()));
        assert_eq!(first.requirement, Requirement::Public);

        let last = config.rules.last().unwrap();
        assert_eq!(last.pattern, PathPattern::Prefix("/api/admin".to_string()));
        assert_eq!(
            last.requirement,
            Requirement::RequiresAuthority("ADMIN".to_string())
        );
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("JWT_AUDIENCE".to_string(), "account, gateway".to_string());
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "5".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "60".to_string());
        vars.insert("JWKS_FETCH_TIMEOUT_MS".to_string(), "750".to_string());
        vars.insert(
            "ROLE_CLAIM_PATHS".to_string(),
            "realm_access.roles,resource_access.gateway.roles".to_string(),
        );
        vars.insert("AUTHORITY_PREFIX".to_string(), "perm_".to_string());
        vars.insert(
            "GATEWAY_RULES".to_string(),
            "/api/admin/special=role:SUPERADMIN,/api/admin/**=role:ADMIN".to_string(),
        );
        vars.insert("GATEWAY_DEFAULT_REQUIREMENT".to_string(), "public".to_string());
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwt_audiences, vec!["account", "gateway"]);
        assert_eq!(config.jwt_leeway_seconds, 5);
        assert_eq!(config.jwt_clock_skew_seconds, 120);
        assert_eq!(config.jwks_cache_ttl_seconds, 60);
        assert_eq!(config.jwks_fetch_timeout_ms, 750);
        assert_eq!(
            config.role_claim_paths,
            vec!["realm_access.roles", "resource_access.gateway.roles"]
        );
        assert_eq!(config.authority_prefix, "PERM_");
        assert_eq!(config.rules.len(), 2);
        assert_eq!(
            config.rules.first().unwrap().pattern,
            PathPattern::Exact("/api/admin/special".to_string())
        );
        assert_eq!(config.default_requirement, Requirement::Public);
        assert_eq!(config.request_timeout_seconds, 10);
    }

    #[test]
    fn test_from_vars_missing_required_values() {
        for key in ["JWKS_URL", "JWT_ISSUER", "JWT_AUDIENCE"] {
            let mut vars = base_vars();
            vars.remove(key);

            let result = Config::from_vars(&vars);
            assert!(
                matches!(&result, Err(ConfigError::MissingEnvVar(v)) if v == key),
                "expected MissingEnvVar({}), got {:?}",
                key,
                result
            );
        }
    }

    #[test]
    fn test_blank_audience_list_is_missing() {
        let mut vars = base_vars();
        vars.insert("JWT_AUDIENCE".to_string(), " , ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWT_AUDIENCE"));
    }

    #[test]
    fn test_jwt_leeway_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtLeeway(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_jwt_leeway_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("JWT_LEEWAY_SECONDS".to_string(), "-1".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidJwtLeeway(_))));
    }

    #[test]
    fn test_jwt_clock_skew_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be positive"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_accepts_max() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.jwt_clock_skew_seconds, 600);
    }

    #[test]
    fn test_jwt_clock_skew_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "JWT_CLOCK_SKEW_SECONDS".to_string(),
            "five-minutes".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_jwks_settings_reject_zero() {
        for key in ["JWKS_CACHE_TTL_SECONDS", "JWKS_FETCH_TIMEOUT_MS"] {
            let mut vars = base_vars();
            vars.insert(key.to_string(), "0".to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(&result, Err(ConfigError::InvalidJwks(msg)) if msg.contains("must be greater than 0")),
                "{} = 0 should be rejected, got {:?}",
                key,
                result
            );
        }
    }

    #[test]
    fn test_request_timeout_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "thirty".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRequestTimeout(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_role_claim_path_rejects_empty_segment() {
        let mut vars = base_vars();
        vars.insert("ROLE_CLAIM_PATHS".to_string(), "realm_access..roles".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRoleMapping(_))));
    }

    #[test]
    fn test_authority_prefix_rejects_whitespace() {
        let mut vars = base_vars();
        vars.insert("AUTHORITY_PREFIX".to_string(), "ROLE _".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRoleMapping(_))));
    }

    #[test]
    fn test_rules_reject_missing_separator() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_RULES".to_string(), "/api/public/**".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRule(msg)) if msg.contains("pattern=requirement"))
        );
    }

    #[test]
    fn test_rules_reject_unknown_requirement() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_RULES".to_string(), "/api/**=everyone".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRule(_))));
    }

    #[test]
    fn test_rules_reject_relative_pattern() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_RULES".to_string(), "api/**=public".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRule(_))));
    }

    #[test]
    fn test_default_requirement_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_DEFAULT_REQUIREMENT".to_string(),
            "allow-everything".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidRule(msg)) if msg.contains("GATEWAY_DEFAULT_REQUIREMENT"))
        );
    }

    #[test]
    fn test_debug_summarizes_rules() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("rule_count: 9"));
        assert!(!debug_output.contains("/api/public"));
    }
}
