use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::json::{json, Value};

/// Evaluate one literal under an assignment bit string.
///
/// Variables the assignment does not cover evaluate to false.
fn lit_value(lit: i64, bits: &str) -> bool {
    let v = lit.unsigned_abs() as usize;
    if v == 0 || v > bits.len() {
        return false;
    }
    let var_true = bits.as_bytes()[v - 1] == b'1';
    if lit > 0 {
        var_true
    } else {
        !var_true
    }
}

/// Verifies CNF satisfaction for a proposed assignment.
///
/// Payload: `cnf` as a list of clauses (`[[int]]`) and `assignment_bits`
/// as a '0'/'1' string, one bit per variable.
#[crate::register_op]
#[derive(Default)]
pub struct SatVerifyOp {}

#[async_trait]
impl OpLogic for SatVerifyOp {
    fn get_op(&self) -> Op {
        Op::new(
            "sat_verify",
            "Checks a CNF formula against an assignment.",
            "Compute",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let bits = payload
            .get("assignment_bits")
            .and_then(|v| v.as_str())
            .filter(|s| s.bytes().all(|c| c == b'0' || c == b'1'))
            .ok_or_else(|| OpError::invalid("assignment_bits must be a string of 0/1"))?;

        let clauses = payload
            .get("cnf")
            .and_then(|v| v.as_array())
            .ok_or_else(|| OpError::invalid("cnf must be a list of clauses (list[list[int]])"))?;

        let mut cnf: Vec<Vec<i64>> = Vec::with_capacity(clauses.len());
        let mut max_var = 0u64;
        for clause in clauses {
            let clause = clause
                .as_array()
                .ok_or_else(|| OpError::invalid("cnf must be a list of clauses (list[list[int]])"))?;
            let mut lits = Vec::with_capacity(clause.len());
            for lit in clause {
                let lit = lit
                    .as_i64()
                    .ok_or_else(|| OpError::invalid("cnf literals must be ints"))?;
                max_var = max_var.max(lit.unsigned_abs());
                lits.push(lit);
            }
            cnf.push(lits);
        }

        for (idx, clause) in cnf.iter().enumerate() {
            let clause_sat = clause.iter().any(|&lit| lit_value(lit, bits));
            if !clause_sat {
                return Ok(json!({
                    "sat": false,
                    "unsat_clause": idx,
                    "nvars": max_var,
                    "nclauses": cnf.len(),
                }));
            }
        }

        Ok(json!({
            "sat": true,
            "unsat_clause": Value::Null,
            "nvars": max_var,
            "nclauses": cnf.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_satisfying_assignment() {
        // (x1 v x2) ^ (!x1 v x3) under x = 101
        let out = SatVerifyOp::default()
            .run(&json!({"cnf": [[1, 2], [-1, 3]], "assignment_bits": "101"}))
            .await
            .unwrap();
        assert_eq!(out["sat"], json!(true));
        assert_eq!(out["unsat_clause"], Value::Null);
        assert_eq!(out["nvars"], json!(3));
        assert_eq!(out["nclauses"], json!(2));
    }

    #[tokio::test]
    async fn reports_first_unsatisfied_clause() {
        let out = SatVerifyOp::default()
            .run(&json!({"cnf": [[1], [-1]], "assignment_bits": "1"}))
            .await
            .unwrap();
        assert_eq!(out["sat"], json!(false));
        assert_eq!(out["unsat_clause"], json!(1));
    }

    #[tokio::test]
    async fn uncovered_variables_are_false() {
        let out = SatVerifyOp::default()
            .run(&json!({"cnf": [[5]], "assignment_bits": "1"}))
            .await
            .unwrap();
        assert_eq!(out["sat"], json!(false));
    }

    #[tokio::test]
    async fn extreme_negative_literal_does_not_overflow() {
        let out = SatVerifyOp::default()
            .run(&json!({"cnf": [[i64::MIN]], "assignment_bits": "1"}))
            .await
            .unwrap();
        assert_eq!(out["sat"], json!(false));
        assert_eq!(out["nvars"], json!(i64::MIN.unsigned_abs()));
    }

    #[tokio::test]
    async fn rejects_malformed_input() {
        assert!(SatVerifyOp::default()
            .run(&json!({"cnf": [[1]], "assignment_bits": "102"}))
            .await
            .is_err());
        assert!(SatVerifyOp::default()
            .run(&json!({"cnf": "not-a-list", "assignment_bits": "1"}))
            .await
            .is_err());
        assert!(SatVerifyOp::default()
            .run(&json!({"cnf": [["a"]], "assignment_bits": "1"}))
            .await
            .is_err());
    }
}
