//! Six-byte X/Y/Z output block shared by the ST inertial sensors.
//!
//! Both parts lay their outputs out as little-endian `X_L X_H Y_L Y_H Z_L Z_H`
//! and are mounted on the airframe with X and Y inverted.

use crate::drivers::double_buffer::{SlotId, Writer};
use crate::error::BusError;
use crate::io::RegisterBus;
use crate::state::{RegisterBlock, SensorSample};

/// Sub-address MSB: auto-increment across the output registers.
pub const AUTO_INCREMENT: u8 = 0x80;

/// Reads the block starting at `reg` on `addr` and publishes the result,
/// error included, into `writer`.
pub async fn read_block_into<B: RegisterBus>(
    bus: &mut B,
    addr: u8,
    reg: u8,
    writer: &mut Writer<'_, SensorSample>,
) -> Result<SlotId, BusError> {
    let mut block: RegisterBlock = [0; 6];
    let result = bus.read_registers(addr, reg | AUTO_INCREMENT, &mut block).await;
    let slot = writer.write_done(result.map(|_| block));
    result.map(|_| slot)
}

/// Raw counts in the airframe's axes.
pub fn decode_airframe(block: &RegisterBlock) -> [i16; 3] {
    let x = i16::from_le_bytes([block[0], block[1]]);
    let y = i16::from_le_bytes([block[2], block[3]]);
    let z = i16::from_le_bytes([block[4], block[5]]);
    // i16::MIN has no positive counterpart.
    [x.wrapping_neg(), y.wrapping_neg(), z]
}
