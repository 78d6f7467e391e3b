use crate::session::Action;
use serde_json::Value;

pub const DEFAULT_ACTIVITY_EVENT: &str = "job-activity";

/// Reads a job-activity payload.
///
/// Accepted shapes: a bool, an active-job count, a `"true"`/`"false"` or
/// numeric string, or an object with `downloading` (bool) or `active` /
/// `pending` (count). Anything else yields `None`.
pub fn parse_activity(payload: &Value) -> Option<bool> {
    match payload {
        Value::Bool(flag) => Some(*flag),
        Value::Number(count) => count.as_f64().map(|count| count > 0.0),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            other => other.parse::<f64>().ok().map(|count| count > 0.0),
        },
        Value::Object(map) => {
            if let Some(Value::Bool(flag)) = map.get("downloading") {
                return Some(*flag);
            }
            ["active", "pending"]
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(|value| match value {
                    Value::Number(_) | Value::String(_) => parse_activity(value),
                    _ => None,
                })
        }
        _ => None,
    }
}

/// Turns a stream of activity announcements into one action per transition.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    last: Option<bool>,
}

impl ActivityTracker {
    pub fn new(current: bool) -> Self {
        Self {
            last: Some(current),
        }
    }

    pub fn observe(&mut self, payload: &Value) -> Option<Action> {
        let downloading = parse_activity(payload)?;
        if self.last == Some(downloading) {
            return None;
        }
        self.last = Some(downloading);
        Some(Action::SetDownloading(downloading))
    }

    /// Forgets the last announcement, e.g. after switching endpoints.
    pub fn reset(&mut self, current: bool) {
        self.last = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_supported_payload_shapes() {
        assert_eq!(parse_activity(&json!(true)), Some(true));
        assert_eq!(parse_activity(&json!(0)), Some(false));
        assert_eq!(parse_activity(&json!(3)), Some(true));
        assert_eq!(parse_activity(&json!("false")), Some(false));
        assert_eq!(parse_activity(&json!(" 2 ")), Some(true));
        assert_eq!(parse_activity(&json!({"downloading": true})), Some(true));
        assert_eq!(parse_activity(&json!({"active": 0})), Some(false));
        assert_eq!(parse_activity(&json!({"pending": "1"})), Some(true));
    }

    #[test]
    fn ignores_unknown_shapes() {
        assert_eq!(parse_activity(&Value::Null), None);
        assert_eq!(parse_activity(&json!("busy")), None);
        assert_eq!(parse_activity(&json!([1, 2])), None);
        assert_eq!(parse_activity(&json!({"active": {"n": 1}})), None);
        assert_eq!(parse_activity(&json!({"downloading": "yes"})), None);
    }

    #[test]
    fn one_action_per_transition() {
        let mut tracker = ActivityTracker::new(false);
        let actions: Vec<Action> = [json!(1), json!(2), json!(true), json!(0), json!(0), json!("x")]
            .iter()
            .filter_map(|payload| tracker.observe(payload))
            .collect();
        assert_eq!(
            actions,
            vec![Action::SetDownloading(true), Action::SetDownloading(false)]
        );
    }

    #[test]
    fn reset_realigns_with_store() {
        let mut tracker = ActivityTracker::new(true);
        tracker.reset(false);
        assert_eq!(tracker.observe(&json!(false)), None);
        assert_eq!(
            tracker.observe(&json!(true)),
            Some(Action::SetDownloading(true))
        );
    }
}
