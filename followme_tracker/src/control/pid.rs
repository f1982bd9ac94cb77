//! Clamped PID controller with integral anti-windup.
//!
//! Each call to [`Pid::update`] computes
//! `kp·e + ki·∫e·dt + kd·Δe/dt`, where the integral accumulator is clamped to
//! `±integral_limit` before it contributes and the sum is clamped to
//! `[output_min, output_max]`. The derivative term is skipped on the first
//! sample after construction or [`Pid::reset`].

use followme_common::config::PidConfig;
use followme_common::consts::PID_DT_EPSILON;
use std::time::Instant;
use thiserror::Error;

/// Rejected controller parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PidError {
    #[error("output range is empty: min {min} > max {max}")]
    InvalidOutputRange { min: f64, max: f64 },

    #[error("gains must be finite (kp={kp}, ki={ki}, kd={kd})")]
    NonFiniteGain { kp: f64, ki: f64, kd: f64 },

    #[error("integral limit must be finite and >= 0, got {0}")]
    InvalidIntegralLimit(f64),
}

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

impl From<&PidConfig> for PidGains {
    fn from(config: &PidConfig) -> Self {
        Self::new(config.kp, config.ki, config.kd)
    }
}

/// Single-axis PID controller.
#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral_limit: f64,
    output_min: f64,
    output_max: f64,
    integral: f64,
    prev_error: Option<f64>,
    prev_time: Option<Instant>,
}

impl Pid {
    /// Create a controller.
    ///
    /// # Errors
    /// Fails when `output_min > output_max`, a gain is not finite, or the
    /// integral limit is negative or not finite.
    pub fn new(
        gains: PidGains,
        integral_limit: f64,
        output_min: f64,
        output_max: f64,
    ) -> Result<Self, PidError> {
        if !(gains.kp.is_finite() && gains.ki.is_finite() && gains.kd.is_finite()) {
            return Err(PidError::NonFiniteGain {
                kp: gains.kp,
                ki: gains.ki,
                kd: gains.kd,
            });
        }
        if !(integral_limit.is_finite() && integral_limit >= 0.0) {
            return Err(PidError::InvalidIntegralLimit(integral_limit));
        }
        if output_min.is_nan() || output_max.is_nan() || output_min > output_max {
            return Err(PidError::InvalidOutputRange {
                min: output_min,
                max: output_max,
            });
        }

        Ok(Self {
            gains,
            integral_limit,
            output_min,
            output_max,
            integral: 0.0,
            prev_error: None,
            prev_time: None,
        })
    }

    /// Controller with symmetric output limits `±output_limit`.
    pub fn from_config(config: &PidConfig, output_limit: f64) -> Result<Self, PidError> {
        Self::new(
            PidGains::from(config),
            config.integral_limit,
            -output_limit,
            output_limit,
        )
    }

    /// Advance the controller by `dt` seconds and return the clamped output.
    ///
    /// A non-finite `error` is treated as zero error. Negative or non-finite
    /// `dt` contributes nothing to the integral.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let error = if error.is_finite() { error } else { 0.0 };
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let p_term = self.gains.kp * error;

        self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        let i_term = self.gains.ki * self.integral;

        let d_term = match self.prev_error {
            Some(prev) => self.gains.kd * (error - prev) / dt.max(PID_DT_EPSILON),
            None => 0.0,
        };
        self.prev_error = Some(error);

        let output = p_term + i_term + d_term;
        if output.is_nan() {
            return 0.0_f64.clamp(self.output_min, self.output_max);
        }
        output.clamp(self.output_min, self.output_max)
    }

    /// Like [`Pid::update`], deriving `dt` from the previous sample's timestamp.
    ///
    /// The first sample after construction or reset uses `dt = 0`.
    pub fn update_at(&mut self, error: f64, now: Instant) -> f64 {
        let dt = self
            .prev_time
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.prev_time = Some(now);
        self.update(error, dt)
    }

    /// Clear the integral, previous error and timestamp.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.prev_time = None;
    }

    #[inline]
    pub const fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub const fn gains(&self) -> PidGains {
        self.gains
    }

    #[inline]
    pub const fn output_limits(&self) -> (f64, f64) {
        (self.output_min, self.output_max)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
