use serde_json::{Map, Value};
use wyckoff_models::{AgentRecord, Consensus, Role, Signal};

use crate::error::AgentError;

/// Extract the first JSON object from a reply that may carry surrounding
/// prose or a markdown fence. The engine is asked for JSON-only output but
/// does not always comply.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "no valid JSON object in reply (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                return Some(text[json_start..json_start + end].trim().to_string());
            }
        }
    }

    None
}

/// First balanced { ... } in the text, string-aware.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

fn as_object(raw: &str) -> Result<Map<String, Value>, AgentError> {
    let json_str = extract_json(raw)?;
    let value: Value = serde_json::from_str(&json_str)?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AgentError::Parse(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> Result<String, AgentError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AgentError::Parse(format!("missing or non-string field \"{key}\"")))
}

fn required_confidence(map: &Map<String, Value>) -> Result<u8, AgentError> {
    let value = map
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| AgentError::Parse("missing or non-numeric field \"confidence\"".into()))?;
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

fn optional_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Validate a role reply into a record. The reply must carry at least a
/// signal label and a confidence number; every other object key becomes a
/// role-specific detail field.
pub fn parse_agent_record(role: Role, raw: &str) -> Result<AgentRecord, AgentError> {
    let mut map = as_object(raw)?;

    let signal = Signal::from_label(&required_str(&map, "signal")?);
    let confidence = required_confidence(&map)?;
    let reason = optional_str(&map, "reason").unwrap_or_default();

    for key in ["signal", "confidence", "reason", "role", "debug_trace"] {
        map.remove(key);
    }

    Ok(AgentRecord {
        role,
        signal,
        confidence,
        details: Value::Object(map),
        reason,
        debug_trace: Vec::new(),
    })
}

/// Validate the aggregator reply into a consensus.
pub fn parse_consensus(raw: &str) -> Result<Consensus, AgentError> {
    let map = as_object(raw)?;

    Ok(Consensus {
        signal: Signal::from_label(&required_str(&map, "signal")?),
        strength: optional_str(&map, "strength").unwrap_or_else(|| "unknown".to_string()),
        stop_loss: optional_str(&map, "stop_loss"),
        target_price: optional_str(&map, "target_price"),
        position: optional_str(&map, "position"),
        confidence: required_confidence(&map)?,
        reason: optional_str(&map, "reason").unwrap_or_default(),
    })
}
