//! Integration test: PID output bounds and anti-windup behaviour.

use followme_tracker::control::pid::{Pid, PidGains};
use proptest::prelude::*;

const DT: f64 = 0.1;

/// Ticks after an error sign reversal during which the output still pushes
/// in the old direction.
fn wrong_way_ticks(integral_limit: f64) -> usize {
    let mut pid = Pid::new(PidGains::new(0.2, 0.04, 0.0), integral_limit, -100.0, 100.0).unwrap();
    for _ in 0..200 {
        pid.update(100.0, DT);
    }
    (0..1_000)
        .take_while(|_| pid.update(-100.0, DT) > 0.0)
        .count()
}

#[test]
fn integral_clamp_limits_overshoot_after_reversal() {
    let clamped = wrong_way_ticks(50.0);
    let unclamped = wrong_way_ticks(f64::MAX);
    assert_eq!(clamped, 0);
    // Without the clamp the integral of 2000 takes 150 ticks to unwind.
    assert!(unclamped > 100, "unclamped overshoot {unclamped}");
    assert!(clamped < unclamped);
}

#[test]
fn saturated_integral_releases_immediately() {
    let mut pid = Pid::new(PidGains::new(0.0, 1.0, 0.0), 10.0, -100.0, 100.0).unwrap();
    for _ in 0..1_000 {
        pid.update(1_000.0, DT);
    }
    assert_eq!(pid.integral(), 10.0);
    pid.update(-1_000.0, DT);
    assert_eq!(pid.integral(), -10.0);
}

proptest! {
    #[test]
    fn output_always_within_limits(
        errors in prop::collection::vec(-1e6f64..1e6, 1..200),
        dts in prop::collection::vec(0.0f64..1.0, 200),
        kp in 0.0f64..10.0,
        ki in 0.0f64..10.0,
        kd in 0.0f64..10.0,
        low in -200.0f64..0.0,
        span in 0.0f64..400.0,
    ) {
        let high = low + span;
        let mut pid = Pid::new(PidGains::new(kp, ki, kd), 500.0, low, high).unwrap();
        for (error, dt) in errors.iter().zip(dts.iter()) {
            let out = pid.update(*error, *dt);
            prop_assert!(out >= low && out <= high, "{out} outside [{low}, {high}]");
            prop_assert!(pid.integral().abs() <= 500.0);
        }
    }

    #[test]
    fn integral_never_exceeds_limit(
        errors in prop::collection::vec(-1e4f64..1e4, 1..300),
        limit in 0.0f64..1_000.0,
    ) {
        let mut pid = Pid::new(PidGains::new(0.2, 0.04, 0.005), limit, -100.0, 100.0).unwrap();
        for error in errors {
            pid.update(error, DT);
            prop_assert!(pid.integral().abs() <= limit);
        }
    }
}
