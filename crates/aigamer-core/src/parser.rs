//! Extract a single action token from a model reply.

use aigamer_providers::ERROR_SENTINEL;
use tracing::{debug, warn};

const ACTION_MARKER: &str = "ACTION:";

/// Lines at least this long are treated as prose, not an action.
const MAX_ACTION_LEN: usize = 20;

/// Reduce a raw reply to one action token, or `"ERROR"`.
///
/// An explicit `ACTION:` marker wins. Otherwise the first short line that
/// doesn't read like a sentence is used, and failing that the first line
/// cut to twenty characters.
pub fn parse_action(reply: &str) -> String {
    if reply.trim().is_empty() {
        warn!("AI returned an empty response");
        return ERROR_SENTINEL.to_string();
    }

    // ASCII upper-casing keeps byte offsets aligned with `reply`.
    if let Some(index) = reply.to_ascii_uppercase().find(ACTION_MARKER) {
        let action = reply[index + ACTION_MARKER.len()..]
            .trim()
            .trim_matches(|c| matches!(c, '"' | '\'' | '`' | ' ' | '\n' | '\r'));
        let action = action.split('\n').next().unwrap_or_default().trim();

        if action.is_empty() {
            warn!("AI response has an empty ACTION: marker");
            return ERROR_SENTINEL.to_string();
        }
        debug!("Parsed marked action '{}'", action);
        return action.to_string();
    }

    let lines: Vec<&str> = reply
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if let Some(line) = lines
        .iter()
        .find(|line| line.chars().count() < MAX_ACTION_LEN && !line.ends_with('.'))
    {
        debug!("Parsed bare action '{}'", line);
        return line.to_string();
    }

    match lines.first() {
        Some(line) => line.chars().take(MAX_ACTION_LEN).collect(),
        None => ERROR_SENTINEL.to_string(),
    }
}
