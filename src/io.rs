//! Seams between the flight core and the hardware.
//!
//! The firmware binary implements these over embassy peripherals; the unit
//! tests implement them over scripted data.

use crate::drivers::double_buffer::Reader;
use crate::drivers::remote::Frame;
use crate::error::{BusError, IoError};
use crate::state::{AttitudeEstimate, Motor, RegisterBlock, SensorSample};

/// Register-addressed bus (I2C) used by the sensor drivers.
#[allow(async_fn_in_trait)]
pub trait RegisterBus {
    async fn write_register(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError>;

    async fn read_registers(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError>;
}

/// Everything the flight controller drives or polls besides attitude.
pub trait FlightIo {
    /// `speed` is already clamped to `[0, MAX_SPEED]`.
    fn set_motor_speed(&mut self, motor: Motor, speed: f32);

    /// Newest complete remote frame since the previous call, if any.
    fn try_read_frame(&mut self) -> Result<Option<Frame>, IoError>;

    fn read_voltage_raw(&mut self) -> Result<u32, IoError>;

    fn distance_inches(&mut self) -> Result<f32, IoError>;

    fn send_telemetry(&mut self, line: &str) -> Result<(), IoError>;

    fn set_fault_indicator(&mut self);

    fn toggle_heartbeat(&mut self);
}

/// Produces one attitude estimate per control tick.
pub trait AttitudeSource {
    fn update(&mut self) -> Result<AttitudeEstimate, IoError>;
}

/// Raw output register blocks of the two inertial sensors.
pub trait ImuSource {
    fn gyro_block(&mut self) -> Result<RegisterBlock, IoError>;

    fn accel_block(&mut self) -> Result<RegisterBlock, IoError>;
}

/// [`ImuSource`] backed by the double buffers the sensor task publishes to.
///
/// Always returns the newest published block; before the first transfer
/// completes that is the buffer's initial all-zero block.
pub struct BufferedImu<'a> {
    gyro: Reader<'a, SensorSample>,
    accel: Reader<'a, SensorSample>,
}

impl<'a> BufferedImu<'a> {
    pub fn new(gyro: Reader<'a, SensorSample>, accel: Reader<'a, SensorSample>) -> Self {
        Self { gyro, accel }
    }
}

impl ImuSource for BufferedImu<'_> {
    fn gyro_block(&mut self) -> Result<RegisterBlock, IoError> {
        self.gyro.latest().map_err(IoError::Gyro)
    }

    fn accel_block(&mut self) -> Result<RegisterBlock, IoError> {
        self.accel.latest().map_err(IoError::Accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::double_buffer::DoubleBuffer;
    use crate::state::EMPTY_SAMPLE;

    #[test]
    fn test_buffered_imu_reads_latest_blocks() {
        let mut gyro = DoubleBuffer::new(EMPTY_SAMPLE);
        let mut accel = DoubleBuffer::new(EMPTY_SAMPLE);
        let (mut gyro_tx, gyro_rx) = gyro.split();
        let (mut accel_tx, accel_rx) = accel.split();
        let mut imu = BufferedImu::new(gyro_rx, accel_rx);

        assert_eq!(imu.gyro_block(), Ok([0; 6]));

        gyro_tx.write_done(Ok([1, 2, 3, 4, 5, 6]));
        accel_tx.write_done(Ok([9; 6]));
        assert_eq!(imu.gyro_block(), Ok([1, 2, 3, 4, 5, 6]));
        assert_eq!(imu.accel_block(), Ok([9; 6]));
        // Still there on the next tick.
        assert_eq!(imu.gyro_block(), Ok([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_buffered_imu_surfaces_bus_errors() {
        let mut gyro = DoubleBuffer::new(EMPTY_SAMPLE);
        let mut accel = DoubleBuffer::new(EMPTY_SAMPLE);
        let (_gyro_tx, gyro_rx) = gyro.split();
        let (mut accel_tx, accel_rx) = accel.split();
        let mut imu = BufferedImu::new(gyro_rx, accel_rx);

        accel_tx.write_done(Err(BusError::Nack));
        assert_eq!(imu.accel_block(), Err(IoError::Accel(BusError::Nack)));
    }
}
