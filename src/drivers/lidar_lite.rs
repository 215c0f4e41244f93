//! Garmin LIDAR-Lite rangefinder in I2C mode.

use crate::error::BusError;
use crate::io::RegisterBus;

pub const ADDR: u8 = 0x62;

const REG_ACQ_COMMAND: u8 = 0x00;
/// Acquire with receiver bias correction.
const ACQ_MEASURE: u8 = 0x04;
/// `FULL_DELAY_HIGH`, with the auto-increment bit so both bytes come back.
const REG_DISTANCE_HILO: u8 = 0x8F;

/// A conversion takes up to this long after [`start_measurement`].
pub const MEASUREMENT_TIME_MS: u64 = 20;

const CM_PER_INCH: f32 = 2.54;

/// Distance in centimetres or the bus failure that prevented the read.
pub type RangeSample = Result<u16, BusError>;

pub async fn start_measurement<B: RegisterBus>(bus: &mut B) -> Result<(), BusError> {
    bus.write_register(ADDR, REG_ACQ_COMMAND, ACQ_MEASURE).await
}

pub async fn read_distance_cm<B: RegisterBus>(bus: &mut B) -> Result<u16, BusError> {
    let mut buf = [0u8; 2];
    bus.read_registers(ADDR, REG_DISTANCE_HILO, &mut buf).await?;
    Ok(u16::from_be_bytes(buf))
}

pub fn cm_to_inches(cm: u16) -> f32 {
    cm as f32 / CM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{value_close, MockBus};
    use embassy_futures::block_on;

    #[test]
    fn test_measurement_cycle() {
        let mut bus = MockBus::with_block(&[0x01, 0x2C]);
        block_on(start_measurement(&mut bus)).unwrap();
        assert_eq!(bus.writes, [(ADDR, 0x00, 0x04)]);

        assert_eq!(block_on(read_distance_cm(&mut bus)), Ok(300));
        assert_eq!(bus.reads, [(ADDR, 0x8F, 2)]);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut bus = MockBus { fail: Some(BusError::Timeout), ..MockBus::default() };
        assert_eq!(block_on(read_distance_cm(&mut bus)), Err(BusError::Timeout));
    }

    #[test]
    fn test_inches() {
        assert!(value_close(100.0, cm_to_inches(254)));
        assert_eq!(cm_to_inches(0), 0.0);
    }
}
