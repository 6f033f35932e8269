use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::json::{json, Value};

fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.chars()
        .collect::<Vec<char>>()
        .chunks(chunk_size)
        .map(|c| c.iter().collect())
        .collect()
}

/// Slices text into fixed-size chunks (default 1024 chars).
///
/// Accepts either `{"text": "..."}` / `{"data": "..."}` or
/// `{"items": ["...", ...], "chunk_size": 1024}`.
#[crate::register_op]
#[derive(Default)]
pub struct TokenizeOp {}

#[async_trait]
impl OpLogic for TokenizeOp {
    fn get_op(&self) -> Op {
        Op::new(
            "map_tokenize",
            "Slices text into fixed-size chunks.",
            "Text",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let chunk_size = match payload.get("chunk_size") {
            None | Some(Value::Null) => 1024,
            Some(v) => match v.as_i64() {
                Some(n) if n > 0 => n as usize,
                _ => {
                    return Ok(
                        json!({"ok": false, "error": "payload.chunk_size must be a positive integer"}),
                    )
                }
            },
        };

        if let Some(items) = payload.get("items").filter(|v| !v.is_null()) {
            let items = match items.as_array() {
                Some(items) => items,
                None => {
                    return Ok(
                        json!({"ok": false, "error": "payload.items must be a list of strings"}),
                    )
                }
            };

            let mut all_chunks: Vec<String> = Vec::new();
            let mut total_chars = 0usize;

            for item in items {
                let s = match item {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                total_chars += s.chars().count();
                all_chunks.extend(chunk_text(&s, chunk_size));
            }

            return Ok(json!({
                "ok": true,
                "tokens": all_chunks,
                "count": all_chunks.len(),
                "total_chars": total_chars,
                "items_count": items.len(),
            }));
        }

        let text = payload
            .get("text")
            .or_else(|| payload.get("data"))
            .unwrap_or(&Value::Null);
        let text = match text {
            Value::Null => "",
            Value::String(s) => s.as_str(),
            _ => return Ok(json!({"ok": false, "error": "payload.text must be a string"})),
        };

        let chunks = chunk_text(text, chunk_size);
        Ok(json!({
            "ok": true,
            "tokens": chunks,
            "count": chunks.len(),
            "total_chars": text.chars().count(),
        }))
    }
}
