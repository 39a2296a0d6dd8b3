//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Role;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// archipelago-profile - load an Archipelago profile page
///
/// Fetches a user's profile, island and Slack roster entry from the
/// Archipelago backend, looks up their doubloons on the leaderboard, and
/// renders the result as JSON or a Markdown page.
///
/// Examples:
///   archipelago-profile U07ABCDEF12
///   archipelago-profile U07ABCDEF12 --prod 1 --format markdown -o page.md
///   archipelago-profile U07ABCDEF12 --roles user,island --no-leaderboard
///   archipelago-profile --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Slack user ID to load the profile for
    #[arg(value_name = "USER_ID", required_unless_present = "init_config")]
    pub user_id: Option<String>,

    /// Production flag: a non-zero integer or "true" selects the production backend
    ///
    /// Every backend endpoint follows this flag, so they are never mixed.
    #[arg(long, value_name = "FLAG", env = "ARCHIPELAGO_PROD")]
    pub prod: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .archipelago.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the rendered page to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Leaderboard feed URL (enables doubloon lookup)
    #[arg(long, value_name = "URL", conflicts_with = "no_leaderboard")]
    pub leaderboard_url: Option<String>,

    /// Skip the leaderboard lookup entirely
    #[arg(long)]
    pub no_leaderboard: bool,

    /// Backend endpoints to query (comma-separated: user,island,roster)
    #[arg(long, value_name = "ROLES", value_delimiter = ',')]
    pub roles: Option<Vec<String>>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no spinner)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .archipelago.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the rendered page.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw `{ user, island, all, doubloons }` JSON (default)
    #[default]
    Json,
    /// Markdown profile page
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested user ID (empty if not given; validated first).
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref url) = self.leaderboard_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Leaderboard URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref roles) = self.roles {
            for raw in roles {
                if Role::try_from(raw.as_str())? == Role::Leaderboard {
                    return Err(
                        "The leaderboard is not a backend role; use --leaderboard-url or --no-leaderboard"
                            .to_string(),
                    );
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            user_id: Some("U07ABCDEF12".to_string()),
            prod: None,
            config: None,
            format: None,
            output: None,
            timeout: None,
            leaderboard_url: None,
            no_leaderboard: false,
            roles: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_positional_and_flags() {
        let args = Args::try_parse_from([
            "archipelago-profile",
            "U123",
            "--format",
            "markdown",
            "--roles",
            "user,island",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(args.user_id(), "U123");
        assert_eq!(args.format, Some(OutputFormat::Markdown));
        assert_eq!(
            args.roles,
            Some(vec!["user".to_string(), "island".to_string()])
        );
        assert_eq!(args.timeout, Some(3));
    }

    #[test]
    fn test_user_id_required_unless_init_config() {
        assert!(Args::try_parse_from(["archipelago-profile"]).is_err());
        assert!(Args::try_parse_from(["archipelago-profile", "--init-config"]).is_ok());
    }

    #[test]
    fn test_leaderboard_flags_conflict() {
        let parsed = Args::try_parse_from([
            "archipelago-profile",
            "U1",
            "--no-leaderboard",
            "--leaderboard-url",
            "https://example.com",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_roles() {
        let mut args = make_args();
        args.roles = Some(vec!["user".to_string(), "all".to_string()]);
        assert!(args.validate().is_ok());

        args.roles = Some(vec!["weather".to_string()]);
        assert!(args.validate().is_err());

        args.roles = Some(vec!["leaderboard".to_string()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_leaderboard_url() {
        let mut args = make_args();
        args.leaderboard_url = Some("ftp://example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
