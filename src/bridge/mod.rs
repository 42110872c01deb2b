//! Operations exposed to the host
//!
//! Safe Rust versions of the entry points in [`crate::ffi`]. Integer
//! arithmetic wraps instead of checking for overflow.

use tracing::trace;

use crate::hardening::HardeningError;
use crate::runtime::scheduler::TaskGroup;

/// Text placed before the name by [`greeting`].
pub const GREETING_PREFIX: &str = "Hello, ";
/// Text placed after the name by [`greeting`].
pub const GREETING_SUFFIX: &str = " from Go!";

/// Sum of two integers.
#[inline]
pub fn add(
    a: i32,
    b: i32,
) -> i32 {
    a.wrapping_add(b)
}

/// Greeting for `name`.
pub fn greeting(name: &str) -> String {
    let mut out = String::with_capacity(GREETING_PREFIX.len() + name.len() + GREETING_SUFFIX.len());
    out.push_str(GREETING_PREFIX);
    out.push_str(name);
    out.push_str(GREETING_SUFFIX);
    out
}

/// `1·2·…·n`, or 1 for any `n <= 0`.
pub fn factorial(n: i64) -> i64 {
    // 66! holds 64 factors of two, so every wrapped product from there on is 0
    if n >= 66 {
        return 0;
    }
    (1..=n.max(1)).fold(1i64, |acc, k| acc.wrapping_mul(k))
}

/// Partial sum computed by fan-out task `id`: `Σ_{j=0..workload-1} j·id`.
pub fn partial_sum(
    id: i64,
    workload: i64,
) -> i64 {
    let mut sum = 0i64;
    for j in 0..workload {
        sum = sum.wrapping_add(j.wrapping_mul(id));
    }
    sum
}

/// Spawn `count` tasks on the worker pool, task `id` in `1..=count`
/// computing [`partial_sum`], and add up their results.
///
/// Non-positive `count` spawns nothing; non-positive `workload` makes every
/// partial sum 0.
pub fn fan_out_sum(
    count: i64,
    workload: i64,
) -> Result<i64, HardeningError> {
    let count = usize::try_from(count).unwrap_or(0);
    if count == 0 {
        return Ok(0);
    }
    let group = TaskGroup::on_global()?;
    let total = group
        .run(count, |id| partial_sum(id as i64, workload))
        .into_iter()
        .fold(0i64, i64::wrapping_add);
    trace!("fan-out of {} tasks summed to {}", count, total);
    Ok(total)
}

#[cfg(test)]
mod tests;
