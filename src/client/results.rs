//! Reader for Splunk's JSON search output.
//!
//! A search reply is a sequence of JSON objects: a single object for a
//! one-shot search, one per line for exports. Each object may carry
//! `messages` (warnings and errors raised by the search) followed by a
//! single `result` or a `results` array.

use crate::types::{SearchRecord, SplunkResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A message as reported by Splunk
#[derive(Debug, Clone, Deserialize)]
pub struct SplunkMessage {
    /// Severity, e.g. "INFO", "WARN", "ERROR", "FATAL"
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Message text
    #[serde(default)]
    pub text: String,
}

/// Flatten a search reply into records, preserving stream order
///
/// Messages become diagnostic records; result objects pass through as data
/// records. Non-object results are skipped. An empty body yields no records.
pub fn read_results(body: &str) -> SplunkResult<Vec<SearchRecord>> {
    let mut records = Vec::new();

    for chunk in serde_json::Deserializer::from_str(body).into_iter::<Value>() {
        collect_chunk(chunk?, &mut records);
    }

    Ok(records)
}

fn collect_chunk(chunk: Value, records: &mut Vec<SearchRecord>) {
    let Value::Object(mut chunk) = chunk else {
        debug!("Skipping non-object chunk in search output");
        return;
    };

    if let Some(messages) = chunk.remove("messages") {
        for message in parse_messages(messages) {
            log_message(&message);
            records.push(SearchRecord::diagnostic(message.text));
        }
    }

    if let Some(result) = chunk.remove("result") {
        push_result(result, records);
    }

    if let Some(Value::Array(results)) = chunk.remove("results") {
        for result in results {
            push_result(result, records);
        }
    }
}

fn push_result(result: Value, records: &mut Vec<SearchRecord>) {
    match result {
        Value::Object(fields) => records.push(SearchRecord::Data(fields)),
        other => debug!(value = %other, "Skipping non-object search result"),
    }
}

/// Parse a `messages` array, ignoring entries that are not messages
pub fn parse_messages(messages: Value) -> Vec<SplunkMessage> {
    match messages {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn log_message(message: &SplunkMessage) {
    match message.kind.to_uppercase().as_str() {
        "WARN" | "ERROR" | "FATAL" => {
            warn!(kind = %message.kind, text = %message.text, "Search reported a message")
        },
        _ => debug!(kind = %message.kind, text = %message.text, "Search reported a message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body() {
        assert!(read_results("").unwrap().is_empty());
        assert!(read_results("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_oneshot_reply() {
        let body = json!({
            "preview": false,
            "init_offset": 0,
            "messages": [{"type": "INFO", "text": "Your timerange was substituted"}],
            "fields": [{"name": "host"}, {"name": "count"}],
            "results": [
                {"host": "web-01", "count": "12"},
                {"host": "web-02", "count": "3"}
            ]
        })
        .to_string();

        let records = read_results(&body).unwrap();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([
                {"message": "Your timerange was substituted"},
                {"host": "web-01", "count": "12"},
                {"host": "web-02", "count": "3"}
            ])
        );
    }

    #[test]
    fn test_line_stream_keeps_order() {
        let body = concat!(
            r#"{"preview":false,"offset":0,"result":{"host":"a"}}"#,
            "\n",
            r#"{"preview":false,"messages":[{"type":"WARN","text":"field conflict"}]}"#,
            "\n"
        );

        let records = read_results(body).unwrap();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([{"host": "a"}, {"message": "field conflict"}])
        );
    }

    #[test]
    fn test_result_and_results_in_one_chunk() {
        let body = json!({
            "result": {"host": "a"},
            "results": [{"host": "b"}, {"host": "c"}]
        })
        .to_string();

        let records = read_results(&body).unwrap();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([{"host": "a"}, {"host": "b"}, {"host": "c"}])
        );
    }

    #[test]
    fn test_non_object_results_are_skipped() {
        let body = json!({"results": [{"host": "a"}, "stray", 42]}).to_string();
        let records = read_results(&body).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(read_results("{\"results\": [").is_err());
    }

    #[test]
    fn test_parse_messages() {
        let messages = parse_messages(json!([
            {"type": "FATAL", "text": "Unknown search command 'foo'."},
            "not a message"
        ]));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, "FATAL");
        assert!(parse_messages(json!(null)).is_empty());
    }
}
