//! Profile aggregation.
//!
//! Queries every configured endpoint for one user and merges the bodies
//! into a single [`AggregateResult`]. Required roles fail the whole
//! aggregation; the leaderboard degrades to the sentinel.

use crate::aggregate::leaderboard::{fetch_doubloons, LeaderboardLayout};
use crate::fetch::{build_role_url, FetchError, JsonFetcher, RequestHeaders};
use crate::models::{AggregateResult, Doubloons, EndpointConfig, Role};
use futures::future::try_join_all;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure of a required endpoint.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{role} endpoint failed: {source}")]
    Endpoint {
        role: Role,
        #[source]
        source: FetchError,
    },
}

impl AggregateError {
    /// Role whose endpoint failed.
    pub fn role(&self) -> Role {
        match self {
            AggregateError::Endpoint { role, .. } => *role,
        }
    }
}

/// Builds profile pages' data from the configured endpoints.
pub struct ProfileAggregator {
    fetcher: Box<dyn JsonFetcher>,
    layout: LeaderboardLayout,
    leaderboard_headers: RequestHeaders,
}

impl ProfileAggregator {
    /// Create an aggregator using the default leaderboard layout and no
    /// extra leaderboard headers.
    pub fn new(fetcher: Box<dyn JsonFetcher>) -> Self {
        Self {
            fetcher,
            layout: LeaderboardLayout::default(),
            leaderboard_headers: Vec::new(),
        }
    }

    /// Use a different leaderboard layout.
    pub fn with_layout(mut self, layout: LeaderboardLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Headers sent with every leaderboard request.
    pub fn with_leaderboard_headers(mut self, headers: RequestHeaders) -> Self {
        self.leaderboard_headers = headers;
        self
    }

    /// Aggregate everything known about `identifier`.
    ///
    /// Required endpoints are queried concurrently; the first failure is
    /// returned. The leaderboard, when configured, always yields balances.
    pub async fn aggregate(
        &self,
        identifier: &str,
        config: &EndpointConfig,
    ) -> Result<AggregateResult, AggregateError> {
        info!(
            "Aggregating profile for {} ({} endpoints)",
            identifier, config.environment
        );

        let targets: Vec<(Role, Url)> = Role::REQUIRED
            .into_iter()
            .filter_map(|role| build_role_url(config, role, identifier).map(|url| (role, url)))
            .collect();

        let required = try_join_all(
            targets
                .iter()
                .map(|(role, url)| self.fetch_required(*role, url)),
        );
        let leaderboard = self.fetch_leaderboard(config, identifier);

        let (bodies, doubloons) = futures::join!(required, leaderboard);
        let bodies = bodies?;

        let mut result = AggregateResult::default();
        for (role, body) in bodies {
            result.set(role, body);
        }
        result.doubloons = doubloons;

        info!(
            "Aggregated {} endpoint(s) for {}{}",
            targets.len(),
            identifier,
            match result.doubloons {
                Some(d) if d.is_known() => " (on leaderboard)",
                Some(_) => " (not on leaderboard)",
                None => "",
            }
        );

        Ok(result)
    }

    async fn fetch_required(&self, role: Role, url: &Url) -> Result<(Role, Value), AggregateError> {
        debug!("Fetching {} from {}", role, url);
        self.fetcher
            .get_json(url, &Vec::new())
            .await
            .map(|body| (role, body))
            .map_err(|source| AggregateError::Endpoint { role, source })
    }

    async fn fetch_leaderboard(&self, config: &EndpointConfig, identifier: &str) -> Option<Doubloons> {
        let url = config.leaderboard.as_ref()?;
        debug!("Fetching leaderboard from {}", url.host_str().unwrap_or("<no host>"));

        match fetch_doubloons(
            self.fetcher.as_ref(),
            url,
            &self.leaderboard_headers,
            &self.layout,
            identifier,
        )
        .await
        {
            Ok(doubloons) => Some(doubloons),
            Err(e) => {
                warn!("Leaderboard unavailable, using sentinel: {}", e);
                Some(Doubloons::sentinel())
            }
        }
    }
}
