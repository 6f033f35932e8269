use std::time::Instant;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::elapsed_ms;
use opswarm_types::json::{json, Value};

fn to_float(v: &Value) -> Result<f64, OpError> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| OpError::invalid("value must be numeric")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| OpError::invalid("value must be numeric")),
        _ => Err(OpError::invalid("value must be numeric")),
    }
}

/// Accumulates risk metrics over a list of values.
///
/// Accepts `{"values": [...]}` with numeric entries, or
/// `{"items": [{"risk": ...}, ...], "field": "risk"}` where items missing
/// the field are skipped.
#[crate::register_op]
#[derive(Default)]
pub struct RiskAccumulateOp {}

#[async_trait]
impl OpLogic for RiskAccumulateOp {
    fn get_op(&self) -> Op {
        Op::new(
            "risk_accumulate",
            "Aggregates count/sum/mean/min/max over numeric values.",
            "Data",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let start = Instant::now();

        let mut values: Vec<f64> = Vec::new();

        if let Some(raw) = payload.get("values") {
            let raw = raw
                .as_array()
                .ok_or_else(|| OpError::invalid("payload.values must be a list"))?;
            for v in raw {
                values.push(to_float(v)?);
            }
        } else if let Some(items) = payload.get("items") {
            let items = items
                .as_array()
                .ok_or_else(|| OpError::invalid("payload.items must be a list"))?;
            let field = payload
                .get("field")
                .and_then(|v| v.as_str())
                .unwrap_or("risk");
            for it in items {
                let obj = it
                    .as_object()
                    .ok_or_else(|| OpError::invalid("payload.items must contain objects"))?;
                if let Some(v) = obj.get(field) {
                    values.push(to_float(v)?);
                }
            }
        } else {
            return Err(OpError::invalid(
                "payload must include either 'values' or 'items'",
            ));
        }

        if values.is_empty() {
            return Ok(json!({
                "count": 0,
                "sum": 0.0,
                "mean": 0.0,
                "min": Value::Null,
                "max": Value::Null,
                "compute_time_ms": elapsed_ms(start),
            }));
        }

        let total: f64 = values.iter().sum();
        let mn = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let mx = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = total / values.len() as f64;

        Ok(json!({
            "count": values.len(),
            "sum": total,
            "mean": mean,
            "min": mn,
            "max": mx,
            "compute_time_ms": elapsed_ms(start),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aggregates_values() {
        let out = RiskAccumulateOp::default()
            .run(&json!({"values": [1.0, "2.5", 3]}))
            .await
            .unwrap();
        assert_eq!(out["count"], json!(3));
        assert_eq!(out["sum"], json!(6.5));
        assert_eq!(out["min"], json!(1.0));
        assert_eq!(out["max"], json!(3.0));
    }

    #[tokio::test]
    async fn extracts_field_from_items() {
        let out = RiskAccumulateOp::default()
            .run(&json!({"items": [{"risk": 2}, {"other": 9}, {"risk": 4}]}))
            .await
            .unwrap();
        assert_eq!(out["count"], json!(2));
        assert_eq!(out["mean"], json!(3.0));
    }

    #[tokio::test]
    async fn empty_input_yields_null_extremes() {
        let out = RiskAccumulateOp::default()
            .run(&json!({"values": []}))
            .await
            .unwrap();
        assert_eq!(out["count"], json!(0));
        assert_eq!(out["min"], Value::Null);
        assert_eq!(out["max"], Value::Null);
    }

    #[tokio::test]
    async fn rejects_non_numeric_values() {
        assert!(RiskAccumulateOp::default()
            .run(&json!({"values": [true]}))
            .await
            .is_err());
        assert!(RiskAccumulateOp::default()
            .run(&json!({"other": 1}))
            .await
            .is_err());
    }
}
