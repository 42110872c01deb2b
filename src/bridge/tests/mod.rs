//! Bridge 单元测试

use crate::bridge::{add, factorial, fan_out_sum, greeting, partial_sum};
use proptest::prelude::*;

/// Σ_{id=1..c} Σ_{j=0..w-1} j·id
fn closed_form(
    count: i64,
    workload: i64,
) -> i64 {
    if count <= 0 || workload <= 0 {
        return 0;
    }
    (count * (count + 1) / 2) * (workload * (workload - 1) / 2)
}

#[cfg(test)]
mod example_tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(add(2, 3), 5);
        assert_eq!(add(-7, 7), 0);
        assert_eq!(add(i32::MAX, 1), i32::MIN);
    }

    #[test]
    fn test_greeting() {
        assert_eq!(greeting("World"), "Hello, World from Go!");
        assert_eq!(greeting(""), "Hello,  from Go!");
    }

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(1), 1);
        assert_eq!(factorial(5), 120);
        assert_eq!(factorial(20), 2_432_902_008_176_640_000);
    }

    #[test]
    fn test_factorial_wraps_without_checking() {
        let wrapped = (1..=65i64).fold(1i64, |acc, k| acc.wrapping_mul(k));
        assert_eq!(factorial(65), wrapped);
        assert_eq!(factorial(66), 0);
        assert_eq!(factorial(i64::MAX), 0);
    }

    #[test]
    fn test_factorial_clamps_non_positive() {
        assert_eq!(factorial(-1), 1);
        assert_eq!(factorial(i64::MIN), 1);
    }

    #[test]
    fn test_partial_sum() {
        assert_eq!(partial_sum(1, 10), 45);
        assert_eq!(partial_sum(3, 10), 135);
        assert_eq!(partial_sum(5, 0), 0);
        assert_eq!(partial_sum(5, -4), 0);
    }

    #[test]
    fn test_fan_out_sum() {
        assert_eq!(fan_out_sum(3, 10).unwrap(), 270);
        assert_eq!(fan_out_sum(0, 10).unwrap(), 0);
        assert_eq!(fan_out_sum(-2, 10).unwrap(), 0);
        assert_eq!(fan_out_sum(4, 0).unwrap(), 0);
    }
}

proptest! {
    #[test]
    fn prop_add_is_exact(a in any::<i32>(), b in any::<i32>()) {
        prop_assert_eq!(add(a, b) as i64, (a as i64 + b as i64) as i32 as i64);
    }

    #[test]
    fn prop_factorial_non_positive_is_one(n in i64::MIN..=0) {
        prop_assert_eq!(factorial(n), 1);
    }

    #[test]
    fn prop_factorial_recurrence(n in 1i64..=20) {
        prop_assert_eq!(factorial(n), n * factorial(n - 1));
    }

    #[test]
    fn prop_greeting_wraps_name(name in ".*") {
        let out = greeting(&name);
        prop_assert!(out.starts_with("Hello, "));
        prop_assert!(out.ends_with(" from Go!"));
        prop_assert_eq!(&out["Hello, ".len()..out.len() - " from Go!".len()], name.as_str());
    }

    #[test]
    fn prop_fan_out_matches_closed_form(count in 0i64..24, workload in 0i64..200) {
        prop_assert_eq!(fan_out_sum(count, workload).unwrap(), closed_form(count, workload));
    }
}
