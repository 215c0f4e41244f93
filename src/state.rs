//! Plain data exchanged between the estimator, the flight controller and
//! the firmware tasks.
//!
//! All types are `Copy` so they can sit in double buffers and channels.
use crate::error::BusError;

// ── Sensor data ───────────────────────────────────────────────────────────────

/// Six bytes read from a sensor's X_L..Z_H output registers.
pub type RegisterBlock = [u8; 6];

/// What a sensor-side completion publishes: the latest block or the bus
/// failure that prevented it.
pub type SensorSample = Result<RegisterBlock, BusError>;

/// Initial contents of a sensor double buffer, before the first transfer.
pub const EMPTY_SAMPLE: SensorSample = Ok([0; 6]);

// ── Estimation ────────────────────────────────────────────────────────────────

/// Roll and pitch in degrees, yaw rate in deg/s.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeEstimate {
    pub roll: f32,
    pub pitch: f32,
    pub yaw_rate: f32,
}

// ── Control ───────────────────────────────────────────────────────────────────

/// Setpoints decoded from a remote frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlCommand {
    /// `[0, MAX_SPEED]`
    pub throttle: f32,
    /// Degrees, `±MAX_ANGLE`.
    pub pitch: f32,
    /// Degrees, `±MAX_ANGLE`.
    pub roll: f32,
    /// Deg/s, `±MAX_RATE`. Decoded but not acted on.
    pub yaw_rate: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motor {
    Front,
    Rear,
    Left,
    Right,
}

impl Motor {
    pub const ALL: [Motor; 4] = [Motor::Front, Motor::Rear, Motor::Left, Motor::Right];
}

/// One speed command per motor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorOutputs {
    pub front: f32,
    pub rear: f32,
    pub right: f32,
    pub left: f32,
}

impl MotorOutputs {
    pub const ZERO: MotorOutputs = MotorOutputs { front: 0.0, rear: 0.0, right: 0.0, left: 0.0 };

    pub fn get(&self, motor: Motor) -> f32 {
        match motor {
            Motor::Front => self.front,
            Motor::Rear => self.rear,
            Motor::Left => self.left,
            Motor::Right => self.right,
        }
    }

    /// Limits every output to `[0, max_speed]`.
    pub fn clamped(self, max_speed: f32) -> Self {
        Self {
            front: self.front.clamp(0.0, max_speed),
            rear: self.rear.clamp(0.0, max_speed),
            right: self.right.clamp(0.0, max_speed),
            left: self.left.clamp(0.0, max_speed),
        }
    }
}

// ── Flight mode ───────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightMode {
    #[default]
    Idle,
    Demo,
    Fly,
    Abort,
}

/// Values reported on each telemetry line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TelemetrySample {
    pub pitch: f32,
    pub roll: f32,
    pub height_in: f32,
    pub voltage: f32,
}
