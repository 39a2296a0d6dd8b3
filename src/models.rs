//! Data models for the profile loader.
//!
//! This module contains the core data structures shared by the fetcher,
//! the aggregator and the page renderer.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Logical role of an outbound endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user's profile record.
    User,
    /// The user's generated island.
    Island,
    /// The Slack roster entry for the user.
    Roster,
    /// Third-party doubloon leaderboard.
    Leaderboard,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Island => write!(f, "island"),
            Role::Roster => write!(f, "roster"),
            Role::Leaderboard => write!(f, "leaderboard"),
        }
    }
}

impl Role {
    /// Roles whose failure aborts the aggregation.
    pub const REQUIRED: [Role; 3] = [Role::User, Role::Island, Role::Roster];

    /// Path of the role on the profile backend.
    ///
    /// The leaderboard lives on a third-party host and has no backend path.
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Role::User => Some("me"),
            Role::Island => Some("island"),
            Role::Roster => Some("slack"),
            Role::Leaderboard => None,
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "user" | "me" => Ok(Role::User),
            "island" => Ok(Role::Island),
            "roster" | "all" | "slack" => Ok(Role::Roster),
            "leaderboard" | "doubloons" => Ok(Role::Leaderboard),
            other => Err(format!("Unknown endpoint role: {}", other)),
        }
    }
}

/// Deployment environment the backend URLs are chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Public deployment.
    Production,
    /// Backend running on the developer's machine.
    #[default]
    Local,
}

impl Environment {
    /// Parse the boolean-like production flag.
    ///
    /// Integers select production when non-zero, `true` selects production,
    /// and everything else (including an unset flag) selects local.
    pub fn from_flag(flag: Option<&str>) -> Self {
        let Some(raw) = flag.map(str::trim) else {
            return Environment::Local;
        };

        if raw.eq_ignore_ascii_case("true") {
            return Environment::Production;
        }

        match leading_integer(raw) {
            Some(n) if n != 0 => Environment::Production,
            _ => Environment::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Local => write!(f, "local"),
        }
    }
}

/// Parse the leading decimal integer of a string, ignoring trailing junk.
fn leading_integer(s: &str) -> Option<i64> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Resolved endpoint URLs for one process lifetime.
///
/// Required roles are always derived from a single base URL, so they point
/// at the same environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Environment the base URL was chosen for.
    pub environment: Environment,
    /// Backend base URL shared by the required roles.
    pub base: Url,
    /// Required roles that are queried.
    pub roles: Vec<Role>,
    /// Leaderboard feed, if enrichment is enabled.
    pub leaderboard: Option<Url>,
}

impl EndpointConfig {
    /// Whether a role is configured.
    pub fn has(&self, role: Role) -> bool {
        match role {
            Role::Leaderboard => self.leaderboard.is_some(),
            _ => self.roles.contains(&role),
        }
    }

    /// URL for a role, without the identifier query.
    pub fn url_for(&self, role: Role) -> Option<Url> {
        if !self.has(role) {
            return None;
        }

        match role.path() {
            Some(path) => Some(join_path(&self.base, path)),
            None => self.leaderboard.clone(),
        }
    }
}

/// Append a single path segment to a base URL, keeping any existing prefix.
fn join_path(base: &Url, segment: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/{}", prefix, segment));
    url
}

/// Doubloon balances scraped from the leaderboard.
///
/// Whole balances serialize as JSON integers, so the sentinel reads `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Doubloons {
    /// Current balance.
    #[serde(serialize_with = "serialize_balance")]
    pub current: f64,
    /// Total ever earned.
    #[serde(serialize_with = "serialize_balance")]
    pub all_time: f64,
}

fn serialize_balance<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let whole = value.fract() == 0.0 && value.abs() < i64::MAX as f64;
    if whole {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl Doubloons {
    /// Marker for "no leaderboard entry".
    pub const SENTINEL: f64 = -1.0;

    /// Balances used when the user is not on the leaderboard.
    pub fn sentinel() -> Self {
        Self {
            current: Self::SENTINEL,
            all_time: Self::SENTINEL,
        }
    }

    /// Returns true if any balance came from a real row.
    pub fn is_known(&self) -> bool {
        self.current != Self::SENTINEL || self.all_time != Self::SENTINEL
    }
}

impl Default for Doubloons {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Everything the profile page needs, merged from every configured endpoint.
///
/// Bodies are kept exactly as the endpoints returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Body of the user endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    /// Body of the island endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub island: Option<Value>,
    /// Body of the Slack roster endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Value>,
    /// Leaderboard balances; absent when no leaderboard is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doubloons: Option<Doubloons>,
}

impl AggregateResult {
    /// Store a required role's body under its field.
    pub fn set(&mut self, role: Role, body: Value) {
        match role {
            Role::User => self.user = Some(body),
            Role::Island => self.island = Some(body),
            Role::Roster => self.all = Some(body),
            Role::Leaderboard => {}
        }
    }

    /// Body stored for a role, if any.
    pub fn get(&self, role: Role) -> Option<&Value> {
        match role {
            Role::User => self.user.as_ref(),
            Role::Island => self.island.as_ref(),
            Role::Roster => self.all.as_ref(),
            Role::Leaderboard => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoints(base: &str) -> EndpointConfig {
        EndpointConfig {
            environment: Environment::Local,
            base: Url::parse(base).unwrap(),
            roles: Role::REQUIRED.to_vec(),
            leaderboard: None,
        }
    }

    #[test]
    fn test_environment_from_flag() {
        assert_eq!(Environment::from_flag(Some("1")), Environment::Production);
        assert_eq!(Environment::from_flag(Some("42")), Environment::Production);
        assert_eq!(Environment::from_flag(Some("1abc")), Environment::Production);
        assert_eq!(Environment::from_flag(Some("TRUE")), Environment::Production);
        assert_eq!(Environment::from_flag(Some("0")), Environment::Local);
        assert_eq!(Environment::from_flag(Some("false")), Environment::Local);
        assert_eq!(Environment::from_flag(Some("")), Environment::Local);
        assert_eq!(Environment::from_flag(None), Environment::Local);
    }

    #[test]
    fn test_role_paths_and_fields() {
        assert_eq!(Role::User.path(), Some("me"));
        assert_eq!(Role::Roster.path(), Some("slack"));
        assert_eq!(Role::Leaderboard.path(), None);
        assert_eq!(Role::try_from("ALL"), Ok(Role::Roster));
        assert!(Role::try_from("weather").is_err());
    }

    #[test]
    fn test_url_for_keeps_base_prefix() {
        let config = endpoints("http://localhost:8000/api/");
        assert_eq!(
            config.url_for(Role::Island).unwrap().as_str(),
            "http://localhost:8000/api/island"
        );

        let config = endpoints("http://localhost:8000");
        assert_eq!(
            config.url_for(Role::User).unwrap().as_str(),
            "http://localhost:8000/me"
        );
        assert!(config.url_for(Role::Leaderboard).is_none());
    }

    #[test]
    fn test_unconfigured_role_has_no_url() {
        let mut config = endpoints("http://localhost:8000");
        config.roles = vec![Role::User];
        assert!(config.url_for(Role::Island).is_none());
        assert!(config.has(Role::User));
    }

    #[test]
    fn test_doubloons_sentinel() {
        let d = Doubloons::sentinel();
        assert_eq!(d.current, -1.0);
        assert_eq!(d.all_time, -1.0);
        assert!(!d.is_known());
        assert!(Doubloons { current: 0.0, all_time: 12.0 }.is_known());
    }

    #[test]
    fn test_doubloons_serialize_whole_balances_as_integers() {
        let sentinel = serde_json::to_string(&Doubloons::sentinel()).unwrap();
        assert_eq!(sentinel, r#"{"current":-1,"all_time":-1}"#);

        let matched = serde_json::to_string(&Doubloons { current: 1520.0, all_time: 88.5 }).unwrap();
        assert_eq!(matched, r#"{"current":1520,"all_time":88.5}"#);

        let parsed: Doubloons = serde_json::from_str(&sentinel).unwrap();
        assert_eq!(parsed, Doubloons::sentinel());
    }

    #[test]
    fn test_aggregate_result_serialization_omits_missing() {
        let mut result = AggregateResult::default();
        result.set(Role::Roster, json!({"real_name": "Orpheus"}));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"all": {"real_name": "Orpheus"}}));
        assert_eq!(result.get(Role::Roster), Some(&json!({"real_name": "Orpheus"})));
    }
}
