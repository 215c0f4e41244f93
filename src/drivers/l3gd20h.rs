//! ST L3GD20H three-axis gyroscope on I2C.

use crate::drivers::double_buffer::{SlotId, Writer};
use crate::drivers::sensor_block;
use crate::error::{BusError, ConfigError};
use crate::io::RegisterBus;
use crate::state::{RegisterBlock, SensorSample};

pub const ADDR: u8 = 0x6B;

const REG_CTRL1: u8 = 0x20;
const REG_CTRL2: u8 = 0x21;
const REG_CTRL4: u8 = 0x23;
const REG_CTRL5: u8 = 0x24;
const REG_OUT_X_L: u8 = 0x28;
const REG_LOW_ODR: u8 = 0x39;

const CTRL1_POWER_ON: u8 = 0x08;
const CTRL1_XYZ_EN: u8 = 0x07;
const CTRL4_BDU: u8 = 0x80;
const CTRL5_HP_EN: u8 = 0x10;

/// Output data rate and bandwidth, `ODR_BW`.
///
/// Encoded as `LOW_ODR:DR[1:0]:BW[1:0]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GyroRate {
    Hz12_5 = 0b10000,
    Hz25 = 0b10100,
    Hz50 = 0b11000,
    Hz100Bw12_5 = 0b00000,
    Hz100Bw25 = 0b00001,
    Hz200Bw12_5 = 0b00100,
    Hz200Bw70 = 0b00111,
    Hz400Bw20 = 0b01000,
    Hz400Bw25 = 0b01001,
    Hz400Bw50 = 0b01010,
    Hz400Bw110 = 0b01011,
    Hz800Bw30 = 0b01100,
    Hz800Bw35 = 0b01101,
    Hz800Bw100 = 0b01111,
}

impl GyroRate {
    fn dr(self) -> u8 {
        (self as u8 >> 2) & 0b11
    }

    fn bw(self) -> u8 {
        self as u8 & 0b11
    }

    fn low_odr(self) -> u8 {
        (self as u8 >> 4) & 0b1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HighPassMode {
    NormalWithReset = 0b00,
    Reference = 0b01,
    Normal = 0b10,
    AutoReset = 0b11,
}

/// High-pass cut-off selector, `HPCF[3:0]`. The frequency each code picks
/// depends on the output data rate; codes above 9 are reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HighPassCutoff {
    Hpcf0 = 0,
    Hpcf1 = 1,
    Hpcf2 = 2,
    Hpcf3 = 3,
    Hpcf4 = 4,
    Hpcf5 = 5,
    Hpcf6 = 6,
    Hpcf7 = 7,
    Hpcf8 = 8,
    Hpcf9 = 9,
}

impl HighPassCutoff {
    pub const ALL: [HighPassCutoff; 10] = [
        HighPassCutoff::Hpcf0,
        HighPassCutoff::Hpcf1,
        HighPassCutoff::Hpcf2,
        HighPassCutoff::Hpcf3,
        HighPassCutoff::Hpcf4,
        HighPassCutoff::Hpcf5,
        HighPassCutoff::Hpcf6,
        HighPassCutoff::Hpcf7,
        HighPassCutoff::Hpcf8,
        HighPassCutoff::Hpcf9,
    ];
}

impl TryFrom<u8> for HighPassCutoff {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, ConfigError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ConfigError::HighPassCutoff(code))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GyroScale {
    Dps245 = 0b00,
    Dps500 = 0b01,
    Dps2000 = 0b10,
}

impl GyroScale {
    /// [deg/s per LSB]
    pub fn resolution(self) -> f32 {
        match self {
            GyroScale::Dps245 => 8.75e-3,
            GyroScale::Dps500 => 17.50e-3,
            GyroScale::Dps2000 => 70.00e-3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GyroConfig {
    pub rate: GyroRate,
    pub high_pass_mode: HighPassMode,
    pub high_pass_cutoff: HighPassCutoff,
    pub scale: GyroScale,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            rate: GyroRate::Hz200Bw12_5,
            high_pass_mode: HighPassMode::Normal,
            high_pass_cutoff: HighPassCutoff::Hpcf2,
            scale: GyroScale::Dps500,
        }
    }
}

impl GyroConfig {
    /// `(register, value)` writes that bring the device up, in order.
    pub fn register_writes(&self) -> [(u8, u8); 5] {
        let ctrl1 = (self.rate.dr() << 6) | (self.rate.bw() << 4) | CTRL1_POWER_ON | CTRL1_XYZ_EN;
        let ctrl2 = ((self.high_pass_mode as u8) << 4) | self.high_pass_cutoff as u8;
        let ctrl4 = ((self.scale as u8) << 4) | CTRL4_BDU;
        [
            (REG_CTRL1, ctrl1),
            (REG_LOW_ODR, self.rate.low_odr()),
            (REG_CTRL2, ctrl2),
            (REG_CTRL4, ctrl4),
            (REG_CTRL5, CTRL5_HP_EN),
        ]
    }
}

pub async fn configure<B: RegisterBus>(bus: &mut B, config: &GyroConfig) -> Result<(), BusError> {
    for (reg, value) in config.register_writes() {
        bus.write_register(ADDR, reg, value).await?;
    }
    Ok(())
}

/// Reads `OUT_X_L..OUT_Z_H` and publishes the result, error included, to
/// the gyro double buffer.
pub async fn read_into<B: RegisterBus>(
    bus: &mut B,
    writer: &mut Writer<'_, SensorSample>,
) -> Result<SlotId, BusError> {
    sensor_block::read_block_into(bus, ADDR, REG_OUT_X_L, writer).await
}

/// Raw rates in the airframe's axes.
pub fn decode(block: &RegisterBlock) -> [i16; 3] {
    sensor_block::decode_airframe(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::double_buffer::DoubleBuffer;
    use crate::state::EMPTY_SAMPLE;
    use crate::test_utils::MockBus;
    use embassy_futures::block_on;

    #[test]
    fn test_default_register_values() {
        let writes = GyroConfig::default().register_writes();
        assert_eq!(
            writes,
            [(0x20, 0x4F), (0x39, 0x00), (0x21, 0x22), (0x23, 0x90), (0x24, 0x10)]
        );
    }

    #[test]
    fn test_low_odr_rates_set_low_odr_bit() {
        let cfg = GyroConfig { rate: GyroRate::Hz50, ..GyroConfig::default() };
        let writes = cfg.register_writes();
        assert_eq!(writes[0], (0x20, 0x80 | 0x0F));
        assert_eq!(writes[1], (0x39, 0x01));
    }

    #[test]
    fn test_high_pass_cutoff_codes() {
        assert_eq!(HighPassCutoff::try_from(9), Ok(HighPassCutoff::Hpcf9));
        for code in 10..=15 {
            assert_eq!(HighPassCutoff::try_from(code), Err(ConfigError::HighPassCutoff(code)));
        }
        for cutoff in HighPassCutoff::ALL {
            let cfg = GyroConfig { high_pass_cutoff: cutoff, ..GyroConfig::default() };
            let (reg, value) = cfg.register_writes()[2];
            assert_eq!(reg, 0x21);
            assert_eq!(value, 0x20 | cutoff as u8);
            assert!(value & 0x0F <= 9);
        }
    }

    #[test]
    fn test_configure_writes_in_order() {
        let mut bus = MockBus::default();
        block_on(configure(&mut bus, &GyroConfig::default())).unwrap();
        let expected: std::vec::Vec<_> = GyroConfig::default()
            .register_writes()
            .iter()
            .map(|&(reg, value)| (ADDR, reg, value))
            .collect();
        assert_eq!(bus.writes, expected);
    }

    #[test]
    fn test_decode_flips_x_and_y() {
        // x = 0x0102, y = -2, z = 300
        let block = [0x02, 0x01, 0xFE, 0xFF, 0x2C, 0x01];
        assert_eq!(decode(&block), [-0x0102, 2, 300]);
        // i16::MIN has no positive counterpart; it must not panic.
        assert_eq!(decode(&[0x00, 0x80, 0, 0, 0, 0])[0], i16::MIN);
    }

    #[test]
    fn test_read_publishes_block_and_errors() {
        let mut buf = DoubleBuffer::new(EMPTY_SAMPLE);
        let (mut writer, mut reader) = buf.split();
        let mut bus = MockBus::with_block(&[1, 2, 3, 4, 5, 6]);

        let slot = block_on(read_into(&mut bus, &mut writer));
        assert_eq!(slot, Ok(SlotId::Second));
        assert_eq!(bus.reads, [(ADDR, 0xA8, 6)]);
        assert_eq!(reader.try_read(), Some(Ok([1, 2, 3, 4, 5, 6])));

        bus.fail = Some(BusError::Nack);
        assert_eq!(block_on(read_into(&mut bus, &mut writer)), Err(BusError::Nack));
        assert_eq!(reader.try_read(), Some(Err(BusError::Nack)));
    }
}
