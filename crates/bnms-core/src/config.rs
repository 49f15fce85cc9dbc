//! Node configuration
//!
//! Configuration is layered: defaults, then a TOML file, then `BNMS_*`
//! environment variables, then validation.
//!
//! ```toml
//! [authority]
//! notifications_enabled = true
//!
//! [member]
//! authority_whitelist = ["O=BNO,L=New York,C=US"]
//! filter_out_unresolvable = true
//! cache_refresh_interval_ms = 60000
//! request_timeout_ms = 30000
//! ```
//!
//! Environment keys: `BNMS_AUTHORITY_NOTIFICATIONS_ENABLED`,
//! `BNMS_MEMBER_FILTER_OUT_UNRESOLVABLE`, `BNMS_MEMBER_AUTHORITY_WHITELIST`
//! (names separated by `;`), `BNMS_MEMBER_CACHE_REFRESH_INTERVAL_MS`,
//! `BNMS_MEMBER_REQUEST_TIMEOUT_MS`.

use crate::errors::ConfigError;
use crate::identifiers::PartyName;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "BNMS_";

/// Authority-side options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Push every committed change to active members
    pub notifications_enabled: bool,
}

/// Member-side options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberConfig {
    /// Authorities this member is willing to talk to
    pub authority_whitelist: Vec<String>,

    /// Default for `filter_out_unresolvable` on sync requests
    pub filter_out_unresolvable: bool,

    /// Cached directory is re-pulled once a full sync is this old
    pub cache_refresh_interval_ms: Option<u64>,

    /// Upper bound on one request/response exchange
    pub request_timeout_ms: u64,
}

impl Default for MemberConfig {
    fn default() -> Self {
        Self {
            authority_whitelist: Vec::new(),
            filter_out_unresolvable: true,
            cache_refresh_interval_ms: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl MemberConfig {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parsed whitelist names. Call [`NodeConfig::validate`] first; entries
    /// that fail to parse are skipped.
    pub fn whitelist_names(&self) -> Vec<PartyName> {
        self.authority_whitelist
            .iter()
            .filter_map(|name| PartyName::parse(name).ok())
            .collect()
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Authority-side options
    pub authority: AuthorityConfig,
    /// Member-side options
    pub member: MemberConfig,
}

impl NodeConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load a file (if given), apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge `BNMS_*` variables from the process environment.
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge `BNMS_*` overrides from an arbitrary source of variables.
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(config_key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match config_key {
                "AUTHORITY_NOTIFICATIONS_ENABLED" => {
                    self.authority.notifications_enabled = parse_bool(&key, &value)?;
                }
                "MEMBER_FILTER_OUT_UNRESOLVABLE" => {
                    self.member.filter_out_unresolvable = parse_bool(&key, &value)?;
                }
                "MEMBER_AUTHORITY_WHITELIST" => {
                    self.member.authority_whitelist = value
                        .split(';')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "MEMBER_CACHE_REFRESH_INTERVAL_MS" => {
                    self.member.cache_refresh_interval_ms = if value.trim().is_empty() {
                        None
                    } else {
                        Some(parse_u64(&key, &value)?)
                    };
                }
                "MEMBER_REQUEST_TIMEOUT_MS" => {
                    self.member.request_timeout_ms = parse_u64(&key, &value)?;
                }
                _ => tracing::debug!(key = %key, "ignoring unknown configuration variable"),
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.member.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "member.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.member.cache_refresh_interval_ms == Some(0) {
            return Err(ConfigError::invalid(
                "member.cache_refresh_interval_ms",
                "must be greater than zero when set",
            ));
        }
        for name in &self.member.authority_whitelist {
            PartyName::parse(name)
                .map_err(|e| ConfigError::invalid("member.authority_whitelist", e.to_string()))?;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("not a boolean: {other}"))),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("not a number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_pull_only_and_filtering() {
        let config = NodeConfig::default();
        assert!(!config.authority.notifications_enabled);
        assert!(config.member.filter_out_unresolvable);
        assert_eq!(config.member.cache_refresh_interval_ms, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            [authority]
            notifications_enabled = true
            "#,
        )
        .unwrap();
        assert!(config.authority.notifications_enabled);
        assert_eq!(config.member, MemberConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[member]\nauthority_whitelist = [\"O=BNO,L=New York,C=US\"]\nrequest_timeout_ms = 500"
        )
        .unwrap();

        let config = NodeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.member.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.member.whitelist_names().len(), 1);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config
            .merge_with_vars(vars(&[
                ("BNMS_AUTHORITY_NOTIFICATIONS_ENABLED", "yes"),
                ("BNMS_MEMBER_FILTER_OUT_UNRESOLVABLE", "false"),
                (
                    "BNMS_MEMBER_AUTHORITY_WHITELIST",
                    "O=BNO_0,L=New York,C=US; O=BNO_1,L=London,C=GB",
                ),
                ("BNMS_MEMBER_CACHE_REFRESH_INTERVAL_MS", "1000"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert!(config.authority.notifications_enabled);
        assert!(!config.member.filter_out_unresolvable);
        assert_eq!(config.member.authority_whitelist.len(), 2);
        assert_eq!(config.member.cache_refresh_interval_ms, Some(1000));
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut config = NodeConfig::default();
        let err = config
            .merge_with_vars(vars(&[("BNMS_MEMBER_REQUEST_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validation() {
        let mut config = NodeConfig::default();
        config.member.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.member.authority_whitelist = vec!["no organisation".to_string()];
        assert!(config.validate().is_err());
    }
}
