//! PID controllers for joint angle following.
//!
//! Each joint degree of freedom owns one controller. During angle-driven
//! phases the skeleton computes the wrapped angle error for the DOF and runs
//! it through the controller; the output becomes the target angular velocity
//! on the corresponding joint motor.
//!
//! Controller state (integral and derivative memory) persists across motor
//! enable/disable toggles within a control pass and is reset at pass
//! boundaries, so no error accumulated during one pass (settling, kinematic
//! tracking, dynamic replay) leaks into the next.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Proportional, integral, and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self::proportional(1.0)
    }
}

impl PidGains {
    /// Create gains with all three terms.
    #[must_use]
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// Create purely proportional gains.
    #[must_use]
    pub const fn proportional(kp: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// A PID controller with accumulated state.
///
/// # Example
///
/// ```
/// use marq_types::{PidController, PidGains};
///
/// let mut pid = PidController::new(PidGains::proportional(2.0));
/// let output = pid.update(0.5, 1.0 / 60.0);
/// assert!((output - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidController {
    gains: PidGains,
    integral: f64,
    previous_error: Option<f64>,
}

impl PidController {
    /// Create a controller with the given gains and zero accumulated state.
    #[must_use]
    pub const fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: None,
        }
    }

    /// The controller's gains.
    #[must_use]
    pub const fn gains(&self) -> PidGains {
        self.gains
    }

    /// Feed one error sample and produce the control output.
    ///
    /// The derivative term is zero on the first sample after a reset since
    /// there is no previous error to difference against.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        self.integral += error * dt;
        let derivative = self
            .previous_error
            .map_or(0.0, |previous| (error - previous) / dt);
        self.previous_error = Some(error);

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    /// Clear integral and derivative memory.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(PidGains::proportional(3.0));
        assert_relative_eq!(pid.update(0.5, DT), 1.5, epsilon = 1e-12);
        // Output tracks the error, no memory
        assert_relative_eq!(pid.update(0.1, DT), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_accumulates() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0));
        let first = pid.update(1.0, DT);
        let second = pid.update(1.0, DT);
        assert_relative_eq!(first, DT, epsilon = 1e-12);
        assert_relative_eq!(second, 2.0 * DT, epsilon = 1e-12);
    }

    #[test]
    fn test_derivative_zero_on_first_sample() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 1.0));
        assert_relative_eq!(pid.update(1.0, DT), 0.0, epsilon = 1e-12);
        // Error held constant: derivative stays zero
        assert_relative_eq!(pid.update(1.0, DT), 0.0, epsilon = 1e-12);
        // Error dropped by 0.5 over one step
        assert_relative_eq!(pid.update(0.5, DT), -0.5 / DT, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        pid.update(1.0, DT);
        pid.update(2.0, DT);
        pid.reset();

        let mut fresh = PidController::new(PidGains::new(1.0, 1.0, 1.0));
        assert_relative_eq!(pid.update(0.7, DT), fresh.update(0.7, DT), epsilon = 1e-12);
    }
}
