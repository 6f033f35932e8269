use std::time::Instant;

use opswarm::{Op, OpError, OpLogic};
use opswarm_types::async_trait;
use opswarm_types::elapsed_ms;
use opswarm_types::json::{json, Value};

/// Largest n for which the iterative u128 computation cannot overflow.
const MAX_N: i64 = 180;

fn fib_iter(n: u32) -> u128 {
    if n <= 1 {
        return n as u128;
    }
    let (mut a, mut b) = (0u128, 1u128);
    for _ in 2..=n {
        let next = a + b;
        a = b;
        b = next;
    }
    b
}

/// Calculates the Fibonacci number at position `n` (default 30).
///
/// The result is returned as a decimal string; fib(180) does not fit a
/// JSON number.
#[crate::register_op]
#[derive(Default)]
pub struct FibonacciOp {}

#[async_trait]
impl OpLogic for FibonacciOp {
    fn get_op(&self) -> Op {
        Op::new("fibonacci", "Fibonacci number at position n.", "Compute")
    }

    async fn run(&self, payload: &Value) -> Result<Value, OpError> {
        let n = match payload.get("n") {
            None | Some(Value::Null) => 30,
            Some(v) => v
                .as_i64()
                .ok_or_else(|| OpError::invalid("payload.n must be an int"))?,
        };

        if n < 0 {
            return Err(OpError::invalid("payload.n must be >= 0"));
        }
        if n > MAX_N {
            return Err(OpError::invalid(format!("payload.n too large (max {MAX_N})")));
        }

        let start = Instant::now();
        let result = fib_iter(n as u32);

        Ok(json!({
            "n": n,
            "result": result.to_string(),
            "compute_time_ms": elapsed_ms(start),
        }))
    }
}
