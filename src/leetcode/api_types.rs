//! Upstream response shapes and the validation gate applied before caching.
//!
//! Payloads stay opaque `serde_json::Value`s; only the envelope fields the
//! gate needs are looked at.

use serde_json::{json, Map, Value};

use crate::cache::Kind;

const PROFILE_REJECTED: &str = "Empty or invalid response from LeetCode API";
const ANALYSIS_REJECTED: &str = "Invalid analysis response";
const ANALYSIS_MESSAGE: &str = "Profile analysis fetched from API";

/// Check a raw upstream response and extract the payload worth caching.
///
/// - Profile: `data` must be truthy; the inner `data` is kept.
/// - Analysis: `success` (or its alias `status`) and `data` must both be
///   truthy; the whole envelope is kept.
///
/// On rejection the upstream's own error text is returned when it has one.
pub fn validate(kind: Kind, raw: &Value) -> Result<Value, String> {
  match kind {
    Kind::Profile => match raw.get("data") {
      Some(data) if is_truthy(data) => Ok(data.clone()),
      _ => Err(rejection_reason(raw, PROFILE_REJECTED)),
    },
    Kind::Analysis => {
      let success = raw
        .get("success")
        .or_else(|| raw.get("status"))
        .is_some_and(is_truthy);
      match raw.get("data") {
        Some(data) if success && is_truthy(data) => Ok(analysis_envelope(data.clone())),
        _ => Err(rejection_reason(raw, ANALYSIS_REJECTED)),
      }
    }
  }
}

fn analysis_envelope(data: Value) -> Value {
  json!({
    "success": true,
    "message": ANALYSIS_MESSAGE,
    "data": data,
  })
}

/// Pull a human-readable error out of a rejected envelope.
fn rejection_reason(raw: &Value, default: &str) -> String {
  error_text(raw).unwrap_or(default).to_string()
}

/// First non-empty `error`, `message` or `detail` string in an envelope.
pub fn error_text(raw: &Value) -> Option<&str> {
  ["error", "message", "detail"]
    .iter()
    .filter_map(|field| raw.get(*field))
    .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
}

/// JavaScript truthiness, which is what the upstream envelopes are built around.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

/// Envelope the HTTP layer wraps successful payloads in.
pub fn success_body(message: &str, data: Value) -> Value {
  let mut body = Map::new();
  body.insert("success".into(), Value::Bool(true));
  body.insert("message".into(), Value::String(message.to_string()));
  body.insert("data".into(), data);
  Value::Object(body)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_profile_keeps_inner_data() {
    let raw = json!({"success": true, "data": {"username": "alice", "rank": "1,234"}});
    assert_eq!(
      validate(Kind::Profile, &raw),
      Ok(json!({"username": "alice", "rank": "1,234"}))
    );
  }

  #[test]
  fn test_profile_rejects_missing_or_null_data() {
    assert_eq!(
      validate(Kind::Profile, &json!({"success": false})),
      Err(PROFILE_REJECTED.to_string())
    );
    assert_eq!(
      validate(Kind::Profile, &json!({"data": null, "error": "User not found"})),
      Err("User not found".to_string())
    );
    assert!(validate(Kind::Profile, &Value::Null).is_err());
  }

  #[test]
  fn test_analysis_keeps_envelope() {
    let raw = json!({"success": true, "data": {"weak_areas": ["graphs"]}});
    let cached = validate(Kind::Analysis, &raw).unwrap();
    assert_eq!(cached["success"], json!(true));
    assert_eq!(cached["message"], json!(ANALYSIS_MESSAGE));
    assert_eq!(cached["data"], json!({"weak_areas": ["graphs"]}));
  }

  #[test]
  fn test_analysis_accepts_status_alias() {
    let raw = json!({"status": true, "data": {"performance_score": 71.5}});
    assert!(validate(Kind::Analysis, &raw).is_ok());
  }

  #[test]
  fn test_analysis_requires_both_flag_and_data() {
    assert_eq!(
      validate(Kind::Analysis, &json!({"success": false, "data": {}})),
      Err(ANALYSIS_REJECTED.to_string())
    );
    assert_eq!(
      validate(Kind::Analysis, &json!({"success": true})),
      Err(ANALYSIS_REJECTED.to_string())
    );
    assert_eq!(
      validate(Kind::Analysis, &json!({"detail": "User data not found"})),
      Err("User data not found".to_string())
    );
  }

  #[test]
  fn test_truthiness() {
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(false)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&json!("")));
    assert!(is_truthy(&json!({})));
    assert!(is_truthy(&json!([])));
    assert!(is_truthy(&json!("x")));
    assert!(is_truthy(&json!(-1)));
  }
}
