//! Profile page generation.
//!
//! Renders an [`AggregateResult`] either as the raw JSON document the page
//! template consumes or as a Markdown profile page. The Markdown renderer
//! reads the user body opportunistically: missing or unexpected fields are
//! skipped.

use crate::models::{AggregateResult, Doubloons, Environment, Role};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Context shown alongside the rendered page.
#[derive(Debug, Clone)]
pub struct PageMetadata {
    /// Identifier the page was requested for.
    pub user_id: String,
    /// Environment the data came from.
    pub environment: Environment,
    /// When the page was rendered.
    pub generated_at: DateTime<Utc>,
}

impl PageMetadata {
    pub fn new(user_id: &str, environment: Environment) -> Self {
        Self {
            user_id: user_id.to_string(),
            environment,
            generated_at: Utc::now(),
        }
    }
}

/// Render the `{ user, island, all, doubloons }` document.
pub fn render_json(result: &AggregateResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

/// Render a complete Markdown profile page.
pub fn render_markdown(result: &AggregateResult, metadata: &PageMetadata) -> String {
    let mut output = String::new();

    let name = result
        .user
        .as_ref()
        .and_then(|u| u.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(metadata.user_id.as_str());
    output.push_str(&format!("# {}'s Island\n\n", name));

    output.push_str(&generate_profile_section(result, metadata));
    output.push_str(&generate_ships_section(result.user.as_ref()));
    output.push_str(&generate_json_section("Island", result.get(Role::Island)));
    output.push_str(&generate_json_section("Slack", result.get(Role::Roster)));
    output.push_str(&generate_footer(metadata));

    output
}

fn generate_profile_section(result: &AggregateResult, metadata: &PageMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Profile\n\n");
    section.push_str(&format!("- **Slack ID:** `{}`\n", metadata.user_id));

    let ships = ships(result.user.as_ref());
    if !ships.is_empty() {
        section.push_str(&format!("- **Ships:** {}\n", ships.len()));
        let hours: f64 = ships.iter().map(total_hours).sum();
        section.push_str(&format!("- **Hours Logged:** {}\n", hours));
    }

    if let Some(doubloons) = result.doubloons {
        section.push_str(&format!("- **Doubloons:** {}\n", format_doubloons(&doubloons)));
    }

    section.push('\n');
    section
}

fn generate_ships_section(user: Option<&Value>) -> String {
    let ships = ships(user);
    if ships.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Ships\n\n");

    for ship in ships {
        section.push_str(&generate_ship_block(ship));
    }

    section
}

fn generate_ship_block(ship: &Value) -> String {
    let mut block = String::new();

    let name = text(ship, "name").unwrap_or("Untitled ship");
    block.push_str(&format!("### {}\n\n", name));

    let base_hours = number(ship, "hours").unwrap_or(0.0);
    let update_hours = total_hours(ship) - base_hours;
    if update_hours > 0.0 {
        block.push_str(&format!(
            "**Hours:** {} (+{} in updates)\n\n",
            base_hours, update_hours
        ));
    } else {
        block.push_str(&format!("**Hours:** {}\n\n", base_hours));
    }

    let links: Vec<String> = [("Repo", "repo"), ("Demo", "demo")]
        .into_iter()
        .filter_map(|(label, key)| text(ship, key).map(|url| format!("[{}]({})", label, url)))
        .collect();
    if !links.is_empty() {
        block.push_str(&links.join(" | "));
        block.push_str("\n\n");
    }

    if let Some(preview) = text(ship, "preview") {
        block.push_str(&format!("![{}]({})\n\n", name, preview));
    }

    let updates = array(ship, "updates");
    if !updates.is_empty() {
        block.push_str("**Updates:**\n\n");
        for (i, update) in updates.iter().enumerate() {
            let description = text(update, "description").unwrap_or("(no description)");
            match number(update, "hours") {
                Some(hours) => block.push_str(&format!("{}. {} ({}h)\n", i + 1, description, hours)),
                None => block.push_str(&format!("{}. {}\n", i + 1, description)),
            }
        }
        block.push('\n');
    }

    block
}

fn generate_json_section(title: &str, body: Option<&Value>) -> String {
    let Some(body) = body else {
        return String::new();
    };

    let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    format!("## {}\n\n```json\n{}\n```\n\n", title, pretty)
}

fn generate_footer(metadata: &PageMetadata) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by archipelago-profile from the {} backend on {}*\n",
        metadata.environment,
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    footer
}

fn format_doubloons(doubloons: &Doubloons) -> String {
    if !doubloons.is_known() {
        return "not on the leaderboard".to_string();
    }
    format!("{} ({} all time)", doubloons.current, doubloons.all_time)
}

fn ships(user: Option<&Value>) -> &[Value] {
    user.map(|u| array(u, "ships")).unwrap_or(&[])
}

/// Ship hours plus the hours of all its updates.
fn total_hours(ship: &Value) -> f64 {
    let updates: f64 = array(ship, "updates")
        .iter()
        .filter_map(|u| number(u, "hours"))
        .sum();
    number(ship, "hours").unwrap_or(0.0) + updates
}

fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USER: &str = include_str!("../../fixtures/user.json");

    fn create_test_result() -> AggregateResult {
        AggregateResult {
            user: Some(serde_json::from_str(USER).unwrap()),
            island: Some(json!({"image": "data:image/png;base64,AAAA"})),
            all: Some(json!({"ok": true})),
            doubloons: Some(Doubloons {
                current: 1520.0,
                all_time: 4031.0,
            }),
        }
    }

    fn metadata() -> PageMetadata {
        PageMetadata::new("U07ABCDEF12", Environment::Production)
    }

    #[test]
    fn test_render_json_shape() {
        let json = render_json(&create_test_result()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["user"]["name"], "Orpheus");
        assert_eq!(value["all"], json!({"ok": true}));
        assert_eq!(value["doubloons"], json!({"current": 1520, "all_time": 4031}));
        assert!(json.contains("\"current\": 1520,"));
    }

    #[test]
    fn test_render_json_sentinel_is_integer() {
        let mut result = create_test_result();
        result.doubloons = Some(Doubloons::sentinel());

        let json = render_json(&result).unwrap();
        assert!(json.contains("\"current\": -1,"));
        assert!(json.contains("\"all_time\": -1\n"));
    }

    #[test]
    fn test_render_markdown_page() {
        let page = render_markdown(&create_test_result(), &metadata());

        assert!(page.starts_with("# Orpheus's Island\n"));
        assert!(page.contains("- **Ships:** 2"));
        assert!(page.contains("- **Hours Logged:** 22"));
        assert!(page.contains("- **Doubloons:** 1520 (4031 all time)"));
        assert!(page.contains("### Dino Dash"));
        assert!(page.contains("**Hours:** 12 (+5 in updates)"));
        assert!(page.contains("[Repo](https://github.com/orpheus/dino-dash) | [Demo](https://dino-dash.example)"));
        assert!(page.contains("1. Added a leaderboard (3h)"));
        assert!(page.contains("## Island"));
        assert!(page.contains("## Slack"));
        assert!(page.contains("from the production backend"));
    }

    #[test]
    fn test_render_markdown_skips_empty_links() {
        let page = render_markdown(&create_test_result(), &metadata());
        let tide = page.split("### Tide Tracker").nth(1).unwrap();
        assert!(!tide.contains("[Demo]"));
        assert!(tide.contains("[Repo]"));
        assert!(!tide.contains("**Updates:**"));
    }

    #[test]
    fn test_render_markdown_sentinel_doubloons() {
        let mut result = create_test_result();
        result.doubloons = Some(Doubloons::sentinel());

        let page = render_markdown(&result, &metadata());
        assert!(page.contains("- **Doubloons:** not on the leaderboard"));
    }

    #[test]
    fn test_render_markdown_minimal_result() {
        let result = AggregateResult {
            user: Some(json!({"unexpected": [1, 2, 3]})),
            ..Default::default()
        };

        let page = render_markdown(&result, &metadata());
        assert!(page.starts_with("# U07ABCDEF12's Island\n"));
        assert!(!page.contains("## Ships"));
        assert!(!page.contains("## Island"));
        assert!(!page.contains("Doubloons"));
    }
}
