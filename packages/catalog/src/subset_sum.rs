use std::time::Instant;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::elapsed_ms;
use opswarm_types::json::{json, Value};

/// DP is O(n * target); these guards keep a single task bounded.
const MAX_TARGET: i64 = 200_000;
const MAX_NUMS: usize = 20_000;

struct SubsetSolution {
    solvable: bool,
    witness: Vec<u64>,
}

/// Pseudo-polynomial DP subset sum solver.
///
/// Returns whether the target is reachable and one witness subset.
fn subset_sum_dp(nums: &[u64], target: usize) -> SubsetSolution {
    // dp[t] = index of the number used to reach sum t; parent[t] = the sum
    // before that number was added. Backwards iteration avoids reuse.
    let mut dp: Vec<Option<usize>> = vec![None; target + 1];
    let mut parent: Vec<usize> = vec![0; target + 1];
    let mut reachable = vec![false; target + 1];
    reachable[0] = true;

    for (i, &x) in nums.iter().enumerate() {
        let x = x as usize;
        if x > target {
            continue;
        }
        for t in (x..=target).rev() {
            if !reachable[t] && reachable[t - x] {
                reachable[t] = true;
                dp[t] = Some(i);
                parent[t] = t - x;
            }
        }
    }

    let solvable = reachable[target];
    let mut witness = Vec::new();
    if solvable {
        let mut t = target;
        while t != 0 {
            match dp[t] {
                Some(idx) => {
                    witness.push(nums[idx]);
                    t = parent[t];
                }
                None => break,
            }
        }
        witness.reverse();
    }

    SubsetSolution { solvable, witness }
}

fn coerce_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(_) => v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Subset sum: find one subset of `nums` summing to `target`.
#[crate::register_op]
#[derive(Default)]
pub struct SubsetSumOp {}

#[async_trait]
impl OpLogic for SubsetSumOp {
    fn get_op(&self) -> Op {
        Op::new(
            "subset_sum",
            "Finds a subset of nums summing to target.",
            "Compute",
        )
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let nums = payload
            .get("nums")
            .and_then(|v| v.as_array())
            .ok_or_else(|| OpError::invalid("payload.nums must be a list of numbers"))?;

        let target = coerce_int(
            payload
                .get("target")
                .filter(|v| !v.is_null())
                .ok_or_else(|| OpError::invalid("payload.target is required"))?,
        )
        .ok_or_else(|| OpError::invalid("payload.target must be an int"))?;

        let mut nums_i: Vec<i64> = Vec::with_capacity(nums.len());
        for x in nums {
            nums_i.push(coerce_int(x).ok_or_else(|| {
                OpError::invalid("payload.nums must contain only int-coercible values")
            })?);
        }

        if target < 0 {
            return Err(OpError::invalid("payload.target must be >= 0"));
        }
        if nums_i.iter().any(|&x| x < 0) {
            return Err(OpError::invalid(
                "payload.nums must be non-negative for this DP implementation",
            ));
        }
        if target > MAX_TARGET {
            return Err(OpError::invalid(format!(
                "payload.target too large (max {MAX_TARGET})"
            )));
        }
        if nums_i.len() > MAX_NUMS {
            return Err(OpError::invalid(format!(
                "payload.nums too long (max {MAX_NUMS} items)"
            )));
        }

        let nums_u: Vec<u64> = nums_i.iter().map(|&x| x as u64).collect();
        let start = Instant::now();
        let solution = subset_sum_dp(&nums_u, target as usize);

        Ok(json!({
            "solvable": solution.solvable,
            "witness": solution.witness,
            "target": target,
            "n": nums_u.len(),
            "compute_time_ms": elapsed_ms(start),
        }))
    }
}
