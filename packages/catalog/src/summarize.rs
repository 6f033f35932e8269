use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::json::{json, Value};

const MAX_SUMMARY_LEN: usize = 200;

/// Placeholder summarization: truncate to `max_len` chars with an ellipsis.
fn summarize_placeholder(text: &str, max_len: usize) -> String {
    let s = text.trim();
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        return s.to_string();
    }
    let head: String = chars[..max_len - 3].iter().collect();
    format!("{}...", head.trim_end())
}

/// Map-style summarization handler (placeholder truncation).
///
/// Accepts either `{"items": [{id, text|document|body}, ...]}` or a single
/// `{"text": "..."}` convenience payload.
#[crate::register_op]
#[derive(Default)]
pub struct SummarizeOp {}

#[async_trait]
impl OpLogic for SummarizeOp {
    fn get_op(&self) -> Op {
        Op::new(
            "map_summarize",
            "Summarizes text items (placeholder truncation).",
            "Text",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        // Convenience: single text payload
        if payload.get("items").is_none() {
            if let Some(text) = payload.get("text").filter(|v| !v.is_null()) {
                let text = match text.as_str() {
                    Some(s) if !s.trim().is_empty() => s,
                    _ => {
                        return Ok(json!({
                            "ok": false,
                            "error": "map_summarize: payload.text must be a non-empty string",
                        }))
                    }
                };
                return Ok(json!({
                    "ok": true,
                    "items": [{
                        "id": payload.get("id").cloned().unwrap_or(Value::Null),
                        "summary": summarize_placeholder(text, MAX_SUMMARY_LEN),
                    }],
                }));
            }
        }

        let items: &[Value] = match payload.get("items") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Ok(json!({"ok": false, "error": "map_summarize: payload.items must be a list"}))
            }
        };

        let mut results: Vec<Value> = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let (item_id, text) = match item {
                Value::Object(obj) => {
                    let id = obj.get("id").cloned().unwrap_or(Value::Null);
                    let text = obj
                        .get("text")
                        .or_else(|| obj.get("document"))
                        .or_else(|| obj.get("body"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    (id, text)
                }
                Value::String(s) => (Value::Null, Some(s.clone())),
                other => (Value::Null, Some(other.to_string())),
            };

            let text = match text {
                Some(t) if !t.trim().is_empty() => t,
                _ => {
                    return Ok(json!({
                        "ok": false,
                        "error": format!(
                            "map_summarize: item[{idx}] missing non-empty text in text/document/body"
                        ),
                    }))
                }
            };

            results.push(json!({
                "id": item_id,
                "summary": summarize_placeholder(&text, MAX_SUMMARY_LEN),
            }));
        }

        Ok(json!({"ok": true, "items": results}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn summarizes_single_text() {
        let out = SummarizeOp::default()
            .run(&json!({"text": "  short text  ", "id": "a"}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["items"][0]["id"], json!("a"));
        assert_eq!(out["items"][0]["summary"], json!("short text"));
    }

    #[tokio::test]
    async fn truncates_long_text() {
        let long = "x".repeat(500);
        let out = SummarizeOp::default()
            .run(&json!({"items": [{"id": 1, "text": long}]}))
            .await
            .unwrap();
        let summary = out["items"][0]["summary"].as_str().unwrap();
        assert_eq!(summary.chars().count(), MAX_SUMMARY_LEN);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn falls_back_to_document_and_body_fields() {
        let out = SummarizeOp::default()
            .run(&json!({"items": [{"document": "doc"}, {"body": "body"}]}))
            .await
            .unwrap();
        assert_eq!(out["items"][0]["summary"], json!("doc"));
        assert_eq!(out["items"][1]["summary"], json!("body"));
    }

    #[tokio::test]
    async fn reports_index_of_bad_item() {
        let out = SummarizeOp::default()
            .run(&json!({"items": [{"text": "fine"}, {"text": "   "}]}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(false));
        assert!(out["error"].as_str().unwrap().contains("item[1]"));
    }
}
