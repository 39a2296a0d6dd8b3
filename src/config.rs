//! Configuration file handling.
//!
//! This module handles loading `.archipelago.toml`, merging it with CLI
//! arguments, and resolving the endpoint URLs for the process.

use crate::cli::OutputFormat;
use crate::fetch::RequestHeaders;
use crate::models::{EndpointConfig, Environment, Role};
use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".archipelago.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Backend endpoint settings.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Leaderboard settings.
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Production flag. A non-zero integer or "true" selects production.
    #[serde(default = "default_prod")]
    pub prod: String,

    /// Backend base URL in production.
    #[serde(default = "default_production_base")]
    pub production_base: String,

    /// Backend base URL when running locally.
    #[serde(default = "default_local_base")]
    pub local_base: String,

    /// Backend roles to query.
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            prod: default_prod(),
            production_base: default_production_base(),
            local_base: default_local_base(),
            roles: default_roles(),
        }
    }
}

fn default_prod() -> String {
    "0".to_string()
}

fn default_production_base() -> String {
    "https://archipelago-api.tathya.hackclub.app".to_string()
}

fn default_local_base() -> String {
    "http://localhost:8000".to_string()
}

fn default_roles() -> Vec<String> {
    vec!["user", "island", "roster"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent for backend requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("archipelago-profile/{}", env!("CARGO_PKG_VERSION"))
}

/// Leaderboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Look up doubloons when a URL is configured.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Shared page export URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Table holding the leaderboard rows.
    #[serde(default = "default_table_id")]
    pub table_id: String,

    /// Column holding the Slack id.
    #[serde(default = "default_slack_column")]
    pub slack_column: String,

    /// Column holding the current balance.
    #[serde(default = "default_current_column")]
    pub current_column: String,

    /// Column holding the all-time balance.
    #[serde(default = "default_all_time_column")]
    pub all_time_column: String,

    /// Application id header expected by the shared page.
    #[serde(default = "default_application_id", skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    /// Browser-like user agent; the shared page rejects bare clients.
    #[serde(default = "default_browser_user_agent")]
    pub user_agent: String,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            table_id: default_table_id(),
            slack_column: default_slack_column(),
            current_column: default_current_column(),
            all_time_column: default_all_time_column(),
            application_id: default_application_id(),
            user_agent: default_browser_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_table_id() -> String {
    "tblfTzYVqvDJlIYUB".to_string()
}

fn default_slack_column() -> String {
    "fldDyEwLCk2QQnMAn".to_string()
}

fn default_current_column() -> String {
    "fld4Qofv5LMGtlFlp".to_string()
}

fn default_all_time_column() -> String {
    "fld8Qfj9OUvo4LeG2".to_string()
}

fn default_application_id() -> Option<String> {
    Some("appTeNFYcUiYfGcR6".to_string())
}

fn default_browser_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0".to_string()
}

impl LeaderboardConfig {
    /// Headers sent with every leaderboard request.
    pub fn headers(&self) -> RequestHeaders {
        let mut headers = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            (
                "Accept".to_string(),
                "application/json, text/javascript, */*; q=0.01".to_string(),
            ),
            ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
            ("x-time-zone".to_string(), "UTC".to_string()),
            ("x-user-locale".to_string(), "en".to_string()),
        ];
        if let Some(ref app) = self.application_id {
            headers.push(("x-airtable-application-id".to_string(), app.clone()));
        }
        headers
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location in `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Load the config file in `dir`, or the defaults when there is none.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::load_default(dir)? {
            Some(config) => {
                debug!("Loaded {} from {}", CONFIG_FILE, dir.display());
                Ok(config)
            }
            None => {
                debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
                Ok(Self::default())
            }
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref prod) = args.prod {
            self.endpoints.prod = prod.clone();
        }
        if let Some(ref roles) = args.roles {
            self.endpoints.roles = roles.clone();
        }

        if let Some(timeout) = args.timeout {
            self.http.timeout_seconds = timeout;
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if let Some(ref url) = args.leaderboard_url {
            self.leaderboard.url = Some(url.clone());
            self.leaderboard.enabled = true;
        }
        if args.no_leaderboard {
            self.leaderboard.enabled = false;
        }
    }

    /// The environment selected by the production flag.
    pub fn environment(&self) -> Environment {
        Environment::from_flag(Some(&self.endpoints.prod))
    }

    /// Resolve the endpoint URLs once for this process.
    ///
    /// Every backend role is derived from the one base URL the environment
    /// selects.
    pub fn endpoint_config(&self) -> Result<EndpointConfig> {
        let environment = self.environment();
        let raw_base = match environment {
            Environment::Production => &self.endpoints.production_base,
            Environment::Local => &self.endpoints.local_base,
        };
        let base = Url::parse(raw_base)
            .with_context(|| format!("Invalid {} base URL: {}", environment, raw_base))?;

        let mut roles = Vec::new();
        for raw in &self.endpoints.roles {
            let role = Role::try_from(raw.as_str()).map_err(anyhow::Error::msg)?;
            if role == Role::Leaderboard {
                bail!("The leaderboard is configured in [leaderboard], not in endpoints.roles");
            }
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        let leaderboard = match (self.leaderboard.enabled, &self.leaderboard.url) {
            (true, Some(url)) => Some(
                Url::parse(url).with_context(|| format!("Invalid leaderboard URL: {}", url))?,
            ),
            _ => None,
        };

        debug!(
            "Resolved {} endpoints at {} (roles: {:?}, leaderboard: {})",
            environment,
            base,
            roles,
            leaderboard.is_some()
        );

        Ok(EndpointConfig {
            environment,
            base,
            roles,
            leaderboard,
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
