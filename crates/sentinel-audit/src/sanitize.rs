//! Context sanitizing applied before an event is signed.
//!
//! Bearer-like identifiers are reduced to their last six characters so the
//! log can correlate events without replaying them.

use serde_json::Value;

use sentinel_contracts::event::EventContext;

/// Context keys whose string values are masked.
pub const MASKED_KEYS: &[&str] = &["session_id", "token"];

/// Mask `value` as `***` plus its last six characters.
///
/// Values shorter than six characters are returned unchanged.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 6 {
        return value.to_string();
    }
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("***{}", tail)
}

pub fn sanitize_context(mut context: EventContext) -> EventContext {
    for key in MASKED_KEYS {
        if let Some(Value::String(s)) = context.get_mut(*key) {
            *s = mask(s);
        }
    }
    context
}
