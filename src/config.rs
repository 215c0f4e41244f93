//! Vehicle configuration.
//!
//! Compile-time defaults live in the constants below; [`FlightConfig`] is the
//! runtime bundle handed to the flight controller and checked once at
//! construction.

use crate::drivers::pid::{PidForm, PidGains};
use crate::drivers::vsense::VoltageSense;
use crate::error::ConfigError;

// ── Loop timing ───────────────────────────────────────────────────────────────

/// Control loop period.
pub const LOOP_PERIOD_MS: u32 = 10;
/// A telemetry line goes out every this many ticks.
pub const TELEMETRY_DIVIDER: u32 = 10;
/// Remote silence tolerated in `Fly` before aborting.
pub const RX_TIMEOUT_S: f32 = 2.0;

// ── Flight envelope ───────────────────────────────────────────────────────────

/// Maximum pitch and roll angle [deg]; also the full-scale stick setpoint.
pub const MAX_ANGLE: f32 = 20.0;
/// Maximum yaw rate setpoint [deg/s].
pub const MAX_RATE: f32 = 180.0;
/// Motor speed ceiling; the actuator range is `[0, MAX_SPEED]`.
pub const MAX_SPEED: f32 = 1.0;

// ── Attitude control ──────────────────────────────────────────────────────────

pub const PITCH_GAINS: PidGains = PidGains { kp: 6.0, ki: 0.0, kd: 0.0 };
pub const ROLL_GAINS: PidGains = PidGains { kp: 6.0, ki: 0.0, kd: 0.0 };
/// PID output units per unit of motor speed.
pub const PID_SCALE: f32 = 55.0;
/// Integrator clamp for the explicit-timestep PID.
pub const INTEGRAL_SATURATION: f32 = 5.0;
/// Errors inside `±ERROR_DEADBAND` degrees are treated as zero.
pub const ERROR_DEADBAND: f32 = 1.0;

// ── Estimation ────────────────────────────────────────────────────────────────

/// Crossover constant of the attitude complementary filters.
pub const COMPLEMENTARY_TAU: f32 = 0.8;
/// Time constant of the complementary low-pass used as an alternative
/// sensor pre-filter.
pub const PREFILTER_TAU: f32 = 150.0;
/// Stationary gyro samples averaged at start-up.
pub const CALIBRATION_SAMPLES: u32 = 128;
/// Spacing between calibration samples.
pub const CALIBRATION_INTERVAL_MS: u32 = 20;

// ── Demo mode ─────────────────────────────────────────────────────────────────

pub const DEMO_MAX_SPEED: f32 = 0.5;
pub const DEMO_LEFT_GAIN: f32 = 1.0;

// ── Bus voltage sense ─────────────────────────────────────────────────────────

pub const ADC_REFERENCE_V: f32 = 3.0;
pub const ADC_FULL_SCALE: f32 = 4096.0;
/// Resistor divider ratio in front of the sense pin.
pub const VSENSE_DIVIDER: f32 = 63.69e-3;

/// Bench demo mixing, see [`crate::flight::demo_mix`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemoConfig {
    pub max_speed: f32,
    pub left_gain: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { max_speed: DEMO_MAX_SPEED, left_gain: DEMO_LEFT_GAIN }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightConfig {
    pub loop_period_ms: u32,
    pub telemetry_divider: u32,
    /// `None` disables the remote silence failsafe.
    pub rx_timeout_s: Option<f32>,
    pub max_angle: f32,
    pub max_rate: f32,
    pub max_speed: f32,
    pub pitch_gains: PidGains,
    pub roll_gains: PidGains,
    pub pid_form: PidForm,
    pub pid_scale: f32,
    pub integral_saturation: f32,
    pub error_deadband: f32,
    pub demo: DemoConfig,
    pub vsense: VoltageSense,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            loop_period_ms: LOOP_PERIOD_MS,
            telemetry_divider: TELEMETRY_DIVIDER,
            rx_timeout_s: Some(RX_TIMEOUT_S),
            max_angle: MAX_ANGLE,
            max_rate: MAX_RATE,
            max_speed: MAX_SPEED,
            pitch_gains: PITCH_GAINS,
            roll_gains: ROLL_GAINS,
            pid_form: PidForm::Timestep,
            pid_scale: PID_SCALE,
            integral_saturation: INTEGRAL_SATURATION,
            error_deadband: ERROR_DEADBAND,
            demo: DemoConfig::default(),
            vsense: VoltageSense::default(),
        }
    }
}

pub(crate) fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl FlightConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_period_ms == 0 {
            return Err(ConfigError::LoopPeriod);
        }
        if self.telemetry_divider == 0 {
            return Err(ConfigError::TelemetryDivider);
        }
        if !positive(self.max_angle) || !positive(self.max_rate) {
            return Err(ConfigError::MaxAngle);
        }
        if !positive(self.max_speed) || !positive(self.demo.max_speed) {
            return Err(ConfigError::MaxSpeed);
        }
        if !positive(self.pid_scale) {
            return Err(ConfigError::PidScale);
        }
        if let Some(t) = self.rx_timeout_s {
            // Shorter than one tick would truncate to a zero-tick budget.
            if !positive(t) || t * 1000.0 < self.loop_period_ms as f32 {
                return Err(ConfigError::RxTimeout);
            }
        }
        Ok(())
    }

    /// Loop period in seconds.
    pub fn loop_dt(&self) -> f32 {
        self.loop_period_ms as f32 / 1000.0
    }

    /// Remote silence budget in ticks, if the failsafe is enabled.
    pub fn rx_timeout_ticks(&self) -> Option<u32> {
        self.rx_timeout_s
            .map(|t| (t * 1000.0 / self.loop_period_ms as f32) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(FlightConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rx_timeout_is_two_seconds_of_ticks() {
        let cfg = FlightConfig::default();
        assert_eq!(cfg.rx_timeout_ticks(), Some(200));

        let cfg = FlightConfig { rx_timeout_s: None, ..FlightConfig::default() };
        assert_eq!(cfg.rx_timeout_ticks(), None);
    }

    #[test]
    fn test_rejects_degenerate_limits() {
        let cfg = FlightConfig { max_angle: 0.0, ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::MaxAngle));

        let cfg = FlightConfig { pid_scale: f32::NAN, ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::PidScale));

        let cfg = FlightConfig { telemetry_divider: 0, ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::TelemetryDivider));

        let cfg = FlightConfig { loop_period_ms: 0, ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::LoopPeriod));
    }

    #[test]
    fn test_rx_timeout_must_cover_one_tick() {
        let cfg = FlightConfig { rx_timeout_s: Some(0.005), ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::RxTimeout));

        let cfg = FlightConfig { rx_timeout_s: Some(-1.0), ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::RxTimeout));

        // Exactly one period is the shortest budget accepted.
        let cfg = FlightConfig { rx_timeout_s: Some(0.01), ..FlightConfig::default() };
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.rx_timeout_ticks(), Some(1));
    }
}
