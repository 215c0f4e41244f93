//! ST LSM303D accelerometer/magnetometer on I2C. Only the accelerometer
//! output is consumed; the magnetometer is configured but not read.

use crate::drivers::double_buffer::{SlotId, Writer};
use crate::drivers::sensor_block;
use crate::error::BusError;
use crate::io::RegisterBus;
use crate::state::{RegisterBlock, SensorSample};

pub const ADDR: u8 = 0x1D;

const REG_CTRL1: u8 = 0x20;
const REG_CTRL2: u8 = 0x21;
const REG_CTRL5: u8 = 0x24;
const REG_CTRL6: u8 = 0x25;
const REG_CTRL7: u8 = 0x26;
const REG_OUT_X_L_A: u8 = 0x28;

const CTRL1_BDU: u8 = 0x08;
const CTRL1_XYZ_EN: u8 = 0x07;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccelRate {
    PowerDown = 0b0000,
    Hz3_125 = 0b0001,
    Hz6_25 = 0b0010,
    Hz12_5 = 0b0011,
    Hz25 = 0b0100,
    Hz50 = 0b0101,
    Hz100 = 0b0110,
    Hz200 = 0b0111,
    Hz400 = 0b1000,
    Hz800 = 0b1001,
    Hz1600 = 0b1010,
}

/// Anti-alias filter bandwidth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AntiAlias {
    Hz773 = 0b00,
    Hz194 = 0b01,
    Hz362 = 0b10,
    Hz50 = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccelScale {
    G2 = 0b000,
    G4 = 0b001,
    G6 = 0b010,
    G8 = 0b011,
    G16 = 0b100,
}

impl AccelScale {
    /// [g per LSB]
    pub fn resolution(self) -> f32 {
        match self {
            AccelScale::G2 => 0.061e-3,
            AccelScale::G4 => 0.122e-3,
            AccelScale::G6 => 0.183e-3,
            AccelScale::G8 => 0.244e-3,
            AccelScale::G16 => 0.732e-3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MagRate {
    Hz3_125 = 0b000,
    Hz6_25 = 0b001,
    Hz12_5 = 0b010,
    Hz25 = 0b011,
    Hz50 = 0b100,
    Hz100 = 0b101,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MagResolution {
    Low = 0b00,
    High = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MagScale {
    Gauss2 = 0b00,
    Gauss4 = 0b01,
    Gauss8 = 0b10,
    Gauss12 = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MagMode {
    Continuous = 0b00,
    Single = 0b01,
    Off = 0b10,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccelConfig {
    pub rate: AccelRate,
    pub anti_alias: AntiAlias,
    pub scale: AccelScale,
    pub mag_rate: MagRate,
    pub mag_resolution: MagResolution,
    pub mag_scale: MagScale,
    pub mag_mode: MagMode,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            rate: AccelRate::Hz100,
            anti_alias: AntiAlias::Hz50,
            scale: AccelScale::G4,
            mag_rate: MagRate::Hz100,
            mag_resolution: MagResolution::High,
            mag_scale: MagScale::Gauss4,
            mag_mode: MagMode::Continuous,
        }
    }
}

impl AccelConfig {
    pub fn register_writes(&self) -> [(u8, u8); 5] {
        [
            (REG_CTRL1, ((self.rate as u8) << 4) | CTRL1_BDU | CTRL1_XYZ_EN),
            (REG_CTRL2, ((self.anti_alias as u8) << 6) | ((self.scale as u8) << 3)),
            (REG_CTRL5, ((self.mag_resolution as u8) << 5) | ((self.mag_rate as u8) << 2)),
            (REG_CTRL6, (self.mag_scale as u8) << 5),
            (REG_CTRL7, self.mag_mode as u8),
        ]
    }
}

pub async fn configure<B: RegisterBus>(bus: &mut B, config: &AccelConfig) -> Result<(), BusError> {
    for (reg, value) in config.register_writes() {
        bus.write_register(ADDR, reg, value).await?;
    }
    Ok(())
}

/// Reads `OUT_X_L..OUT_Z_H` and publishes the result, error included, to
/// the accel double buffer.
pub async fn read_into<B: RegisterBus>(
    bus: &mut B,
    writer: &mut Writer<'_, SensorSample>,
) -> Result<SlotId, BusError> {
    sensor_block::read_block_into(bus, ADDR, REG_OUT_X_L_A, writer).await
}

/// Raw acceleration in the airframe's axes.
pub fn decode(block: &RegisterBlock) -> [i16; 3] {
    sensor_block::decode_airframe(block)
}
