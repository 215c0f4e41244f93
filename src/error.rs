//! Fault taxonomy.
//!
//! Nothing here is recoverable: every variant ends up in
//! [`FatalError`] and is routed through the single abort path in
//! [`crate::flight`].

use thiserror::Error;

/// Opaque failure reported by a bus or peripheral driver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    #[error("no acknowledge")]
    Nack,

    #[error("arbitration lost")]
    Arbitration,

    #[error("bus error")]
    Bus,

    #[error("overrun")]
    Overrun,

    #[error("transfer timed out")]
    Timeout,

    #[error("framing or parity error")]
    Framing,

    #[error("peripheral fault")]
    Other,
}

/// Start-up failures; raised before the control loop ever runs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    #[error("sensor bus init failed")]
    Bus,

    #[error("gyro init failed: {0}")]
    Gyro(BusError),

    #[error("accel init failed: {0}")]
    Accel(BusError),

    #[error("rangefinder init failed: {0}")]
    Rangefinder(BusError),

    #[error("telemetry UART init failed")]
    Telemetry,

    #[error("ADC init failed")]
    Adc,

    #[error("PWM init failed")]
    Pwm,

    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

/// Steady-state I/O failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    #[error("gyro read failed: {0}")]
    Gyro(BusError),

    #[error("accel read failed: {0}")]
    Accel(BusError),

    #[error("rangefinder read failed: {0}")]
    Rangefinder(BusError),

    #[error("remote UART receive failed: {0}")]
    Remote(BusError),

    #[error("telemetry UART transmit failed: {0}")]
    Telemetry(BusError),

    #[error("ADC read failed")]
    Adc,
}

/// Remote link framing violations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    #[error("malformed remote frame (start {start}, stop {stop})")]
    MalformedFrame { start: u8, stop: u8 },
}

/// Flight envelope violations.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnvelopeError {
    #[error("attitude limit exceeded (roll {roll}, pitch {pitch})")]
    AttitudeLimit { roll: f32, pitch: f32 },

    #[error("remote link silent for {silent_ticks} ticks")]
    RemoteTimeout { silent_ticks: u32 },
}

/// A configuration value outside its admissible range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("loop period must be positive")]
    LoopPeriod,

    #[error("max angle must be positive and finite")]
    MaxAngle,

    #[error("max speed must be positive and finite")]
    MaxSpeed,

    #[error("PID scale must be positive and finite")]
    PidScale,

    #[error("filter time constant must be positive and finite")]
    TimeConstant,

    #[error("gyro high-pass cut-off code {0} is reserved")]
    HighPassCutoff(u8),

    #[error("remote timeout must span at least one loop period")]
    RxTimeout,

    #[error("telemetry divider must be non-zero")]
    TelemetryDivider,
}

/// Every fault the abort path can be asked to handle.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalError {
    #[error("init: {0}")]
    Init(#[from] InitError),

    #[error("io: {0}")]
    Io(#[from] IoError),

    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

impl FatalError {
    /// Whether the telemetry link can still carry a message about this fault.
    pub fn telemetry_usable(&self) -> bool {
        !matches!(
            self,
            FatalError::Io(IoError::Telemetry(_)) | FatalError::Init(InitError::Telemetry)
        )
    }
}

pub type FlightResult<T> = Result<T, FatalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_fault_suppresses_message() {
        let err: FatalError = IoError::Telemetry(BusError::Overrun).into();
        assert!(!err.telemetry_usable());

        let err: FatalError = InitError::Telemetry.into();
        assert!(!err.telemetry_usable());
    }

    #[test]
    fn test_other_faults_keep_telemetry() {
        let err: FatalError = ProtocolError::MalformedFrame { start: 0, stop: 254 }.into();
        assert!(err.telemetry_usable());

        let err: FatalError = IoError::Gyro(BusError::Nack).into();
        assert!(err.telemetry_usable());
    }

    #[test]
    fn test_fatal_message_names_the_cause() {
        let err: FatalError = EnvelopeError::RemoteTimeout { silent_ticks: 200 }.into();
        let msg = format!("{err}");
        assert_eq!(msg, "envelope: remote link silent for 200 ticks");
    }
}
