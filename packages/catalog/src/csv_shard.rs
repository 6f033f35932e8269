use std::path::Path;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::json::{json, Map, Value};
use opswarm_types::tokio;

fn read_csv_shard(
    source_uri: &str,
    start_row: usize,
    shard_size: usize,
) -> Result<Vec<Value>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(source_uri)?;
    let headers = reader.headers()?.clone();

    let stop_row = start_row + shard_size;
    let mut rows: Vec<Value> = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        if idx < start_row {
            continue;
        }
        if idx >= stop_row {
            break;
        }
        let record = record?;
        let mut row = Map::new();
        // Short rows pad missing columns with null rather than dropping them.
        for (i, header) in headers.iter().enumerate() {
            let field = record
                .get(i)
                .map(|f| Value::String(f.to_string()))
                .unwrap_or(Value::Null);
            row.insert(header.to_string(), field);
        }
        rows.push(Value::Object(row));
    }

    Ok(rows)
}

/// Generic CSV shard op: reads a slice of rows after the header.
///
/// `start_row = 0` means the first data row. `mode` is `rows` (default) or
/// `count`; `count` returns only the window size.
#[crate::register_op]
#[derive(Default)]
pub struct CsvShardOp {}

#[async_trait]
impl OpLogic for CsvShardOp {
    fn get_op(&self) -> Op {
        Op::new(
            "read_csv_shard",
            "Reads a row window out of a CSV file.",
            "Data",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        if payload.is_null() {
            return Ok(json!({"ok": false, "error": "read_csv_shard: missing payload"}));
        }
        if !payload.is_object() {
            return Ok(json!({"ok": false, "error": "read_csv_shard: payload must be an object"}));
        }

        let dataset_id = payload
            .get("dataset_id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_dataset")
            .to_string();

        let source_uri = match payload.get("source_uri").and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                return Ok(json!({
                    "ok": false,
                    "error": "read_csv_shard: payload.source_uri (string) is required",
                }))
            }
        };

        let start_row = match payload.get("start_row") {
            None | Some(Value::Null) => 0i64,
            Some(v) => match v.as_i64() {
                Some(n) => n,
                None => {
                    return Ok(json!({
                        "ok": false,
                        "error": "read_csv_shard: start_row and shard_size must be integers",
                    }))
                }
            },
        };
        let shard_size = match payload.get("shard_size") {
            None | Some(Value::Null) => 100i64,
            Some(v) => match v.as_i64() {
                Some(n) => n,
                None => {
                    return Ok(json!({
                        "ok": false,
                        "error": "read_csv_shard: start_row and shard_size must be integers",
                    }))
                }
            },
        };

        if start_row < 0 {
            return Ok(json!({"ok": false, "error": "read_csv_shard: start_row must be >= 0"}));
        }
        if shard_size <= 0 {
            return Ok(json!({"ok": false, "error": "read_csv_shard: shard_size must be > 0"}));
        }

        let mode = payload
            .get("mode")
            .and_then(|v| v.as_str())
            .unwrap_or("rows")
            .to_string();
        if mode != "rows" && mode != "count" {
            return Ok(json!({"ok": false, "error": "read_csv_shard: mode must be 'rows' or 'count'"}));
        }

        if !Path::new(&source_uri).exists() {
            return Ok(json!({
                "ok": false,
                "error": format!("read_csv_shard: file not found: {source_uri}"),
            }));
        }

        let (start, size) = (start_row as usize, shard_size as usize);
        let uri = source_uri.clone();
        let rows = tokio::task::spawn_blocking(move || read_csv_shard(&uri, start, size))
            .await
            .map_err(|e| OpError::Internal(format!("read_csv_shard: join error: {e}")))?;

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                return Ok(json!({
                    "ok": false,
                    "error": format!("read_csv_shard: failed reading csv: {e}"),
                }))
            }
        };

        let end_row = start + rows.len();

        if mode == "count" {
            return Ok(json!({
                "ok": true,
                "dataset_id": dataset_id,
                "mode": "count",
                "start_row": start,
                "end_row": end_row,
                "row_count": rows.len(),
            }));
        }

        Ok(json!({
            "ok": true,
            "dataset_id": dataset_id,
            "mode": "rows",
            "start_row": start,
            "end_row": end_row,
            "row_count": rows.len(),
            "rows": rows,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const CSV: &str = "name,age\nalice,30\nbob,31\ncarol,32\n";

    #[tokio::test]
    async fn reads_window_after_header() {
        let file = fixture(CSV);
        let out = CsvShardOp::default()
            .run(&json!({
                "source_uri": file.path().to_str().unwrap(),
                "start_row": 1,
                "shard_size": 1,
            }))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["row_count"], json!(1));
        assert_eq!(out["start_row"], json!(1));
        assert_eq!(out["end_row"], json!(2));
        assert_eq!(out["rows"][0]["name"], json!("bob"));
    }

    #[tokio::test]
    async fn count_mode_omits_rows() {
        let file = fixture(CSV);
        let out = CsvShardOp::default()
            .run(&json!({"source_uri": file.path().to_str().unwrap(), "mode": "count"}))
            .await
            .unwrap();
        assert_eq!(out["row_count"], json!(3));
        assert!(out.get("rows").is_none());
    }

    #[tokio::test]
    async fn window_past_end_is_empty() {
        let file = fixture(CSV);
        let out = CsvShardOp::default()
            .run(&json!({"source_uri": file.path().to_str().unwrap(), "start_row": 10}))
            .await
            .unwrap();
        assert_eq!(out["row_count"], json!(0));
        assert_eq!(out["end_row"], json!(10));
    }

    #[tokio::test]
    async fn short_rows_pad_missing_fields_with_null() {
        let file = fixture("name,age\nalice\nbob,31\n");
        let out = CsvShardOp::default()
            .run(&json!({"source_uri": file.path().to_str().unwrap()}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["rows"][0]["name"], json!("alice"));
        assert_eq!(out["rows"][0]["age"], Value::Null);
        assert_eq!(out["rows"][1]["age"], json!("31"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let out = CsvShardOp::default()
            .run(&json!({"source_uri": "/does/not/exist.csv"}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(false));
        assert!(out["error"].as_str().unwrap().contains("file not found"));
    }

    #[tokio::test]
    async fn rejects_bad_parameters() {
        let file = fixture(CSV);
        let path = file.path().to_str().unwrap();

        let out = CsvShardOp::default()
            .run(&json!({"source_uri": path, "start_row": -1}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(false));

        let out = CsvShardOp::default()
            .run(&json!({"source_uri": path, "shard_size": 0}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(false));

        let out = CsvShardOp::default()
            .run(&json!({"source_uri": path, "mode": "stream"}))
            .await
            .unwrap();
        assert_eq!(out["ok"], json!(false));
    }
}
