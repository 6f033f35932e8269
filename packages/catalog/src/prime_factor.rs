use std::time::Instant;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::elapsed_ms;
use opswarm_types::json::{json, Value};

/// Factoring bound: trial division past this takes too long on one worker.
const MAX_N: i64 = 100_000_000_000_000;

fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    if n <= 1 {
        return factors;
    }

    while n % 2 == 0 {
        factors.push(2);
        n /= 2;
    }

    let mut f = 3u64;
    while f * f <= n && n > 1 {
        while n % f == 0 {
            factors.push(f);
            n /= f;
        }
        f += 2;
    }

    if n > 1 {
        factors.push(n);
    }

    factors
}

/// Returns the prime factorization of integer `n` as an ascending list.
#[crate::register_op]
#[derive(Default)]
pub struct PrimeFactorOp {}

#[async_trait]
impl OpLogic for PrimeFactorOp {
    fn get_op(&self) -> Op {
        Op::new("prime_factor", "Prime factorization of n.", "Compute")
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let n = payload
            .get("n")
            .filter(|v| !v.is_null())
            .ok_or_else(|| OpError::invalid("payload.n is required"))?
            .as_i64()
            .ok_or_else(|| OpError::invalid("payload.n must be an int"))?;

        if n < 0 {
            return Err(OpError::invalid("payload.n must be >= 0"));
        }
        if n > MAX_N {
            return Err(OpError::invalid("payload.n too large (max 1e14)"));
        }

        let start = Instant::now();
        let factors = prime_factors(n as u64);

        Ok(json!({
            "n": n,
            "factors": factors,
            "compute_time_ms": elapsed_ms(start),
        }))
    }
}
