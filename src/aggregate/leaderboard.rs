//! Doubloon leaderboard lookup.
//!
//! The leaderboard is a shared spreadsheet page exported as JSON. Rows are
//! keyed by row id and hold their cells by column id; the user is found by
//! a suffix match on the Slack id column.

use crate::fetch::{FetchError, JsonFetcher, RequestHeaders};
use crate::models::Doubloons;
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Why the leaderboard could not be consulted.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("leaderboard payload has no rows for table {table_id}")]
    MissingRows { table_id: String },
}

/// Where the interesting cells live in the exported page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardLayout {
    pub table_id: String,
    pub slack_column: String,
    pub current_column: String,
    pub all_time_column: String,
}

impl Default for LeaderboardLayout {
    fn default() -> Self {
        Self {
            table_id: "tblfTzYVqvDJlIYUB".to_string(),
            slack_column: "fldDyEwLCk2QQnMAn".to_string(),
            current_column: "fld4Qofv5LMGtlFlp".to_string(),
            all_time_column: "fld8Qfj9OUvo4LeG2".to_string(),
        }
    }
}

impl From<&crate::config::LeaderboardConfig> for LeaderboardLayout {
    fn from(config: &crate::config::LeaderboardConfig) -> Self {
        Self {
            table_id: config.table_id.clone(),
            slack_column: config.slack_column.clone(),
            current_column: config.current_column.clone(),
            all_time_column: config.all_time_column.clone(),
        }
    }
}

/// Fetch the leaderboard and look up `identifier`.
pub async fn fetch_doubloons(
    fetcher: &dyn JsonFetcher,
    url: &Url,
    headers: &RequestHeaders,
    layout: &LeaderboardLayout,
    identifier: &str,
) -> Result<Doubloons, LeaderboardError> {
    let payload = fetcher.get_json(url, headers).await?;
    find_doubloons(&payload, layout, identifier)
}

/// Scan the rows in document order for the first Slack id ending with
/// `identifier`.
///
/// Returns the sentinel when no row matches. An empty identifier never
/// matches.
pub fn find_doubloons(
    payload: &Value,
    layout: &LeaderboardLayout,
    identifier: &str,
) -> Result<Doubloons, LeaderboardError> {
    let rows = rows(payload, &layout.table_id).ok_or_else(|| LeaderboardError::MissingRows {
        table_id: layout.table_id.clone(),
    })?;

    if identifier.is_empty() {
        return Ok(Doubloons::sentinel());
    }

    for (row_id, row) in rows {
        let Some(cells) = row.get("cellValuesByColumnId").and_then(Value::as_object) else {
            continue;
        };
        let Some(slack) = cells.get(&layout.slack_column).and_then(Value::as_str) else {
            continue;
        };

        if slack.ends_with(identifier) {
            debug!("Leaderboard row {} matches {}", row_id, identifier);
            return Ok(Doubloons {
                current: score(cells, &layout.current_column),
                all_time: score(cells, &layout.all_time_column),
            });
        }
    }

    debug!("{} is not on the leaderboard ({} rows)", identifier, rows.len());
    Ok(Doubloons::sentinel())
}

fn rows<'a>(payload: &'a Value, table_id: &str) -> Option<&'a Map<String, Value>> {
    payload
        .get("data")?
        .get("preloadPageQueryResults")?
        .get("tableDataById")?
        .get(table_id)?
        .get("partialRowById")?
        .as_object()
}

fn score(cells: &Map<String, Value>, column: &str) -> f64 {
    cells
        .get(column)
        .and_then(Value::as_f64)
        .unwrap_or(Doubloons::SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIXTURE: &str = include_str!("../../fixtures/leaderboard.json");

    fn payload() -> Value {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_match_extracts_both_scores() {
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "U07ABCDEF12").unwrap();
        assert_eq!(d.current, 1520.0);
        assert_eq!(d.all_time, 4031.0);
    }

    #[test]
    fn test_no_match_yields_sentinel() {
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "U00NOBODY").unwrap();
        assert_eq!(d, Doubloons::sentinel());
    }

    #[test]
    fn test_suffix_match_takes_first_row_in_document_order() {
        // Both "U07ZZZ99" and "XU07ZZZ99" end with "ZZZ99"; the earlier row wins.
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "ZZZ99").unwrap();
        assert_eq!(d.current, 88.5);
        assert_eq!(d.all_time, 120.0);
    }

    #[test]
    fn test_suffix_of_stored_value_matches() {
        // The stored value is a full profile URL, the identifier only its tail.
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "DEF12").unwrap();
        assert_eq!(d.current, 1520.0);
    }

    #[test]
    fn test_rows_without_slack_id_are_skipped() {
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "999").unwrap();
        assert_eq!(d, Doubloons::sentinel());
    }

    #[test]
    fn test_non_numeric_score_falls_back_per_field() {
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "U08NOSCORE").unwrap();
        assert_eq!(d.current, -1.0);
        assert_eq!(d.all_time, -1.0);
    }

    #[test]
    fn test_empty_identifier_never_matches() {
        let d = find_doubloons(&payload(), &LeaderboardLayout::default(), "").unwrap();
        assert_eq!(d, Doubloons::sentinel());
    }

    #[test]
    fn test_missing_rows_is_an_error() {
        let err = find_doubloons(&json!({"data": {}}), &LeaderboardLayout::default(), "U1")
            .unwrap_err();
        assert!(matches!(err, LeaderboardError::MissingRows { .. }));
    }

    #[test]
    fn test_custom_layout() {
        let layout = LeaderboardLayout {
            table_id: "tblOther".to_string(),
            slack_column: "slack".to_string(),
            current_column: "now".to_string(),
            all_time_column: "ever".to_string(),
        };
        let payload = json!({
            "data": {"preloadPageQueryResults": {"tableDataById": {"tblOther": {"partialRowById": {
                "r1": {"cellValuesByColumnId": {"slack": "U42", "now": 3, "ever": 9}}
            }}}}}
        });

        let d = find_doubloons(&payload, &layout, "U42").unwrap();
        assert_eq!(d, Doubloons { current: 3.0, all_time: 9.0 });
    }
}
