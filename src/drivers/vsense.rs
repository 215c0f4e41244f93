use crate::config::{ADC_FULL_SCALE, ADC_REFERENCE_V, VSENSE_DIVIDER};

/// Battery bus voltage from a raw ADC conversion behind a resistor divider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoltageSense {
    pub reference_v: f32,
    pub full_scale: f32,
    /// Pin volts per bus volt.
    pub divider: f32,
}

impl Default for VoltageSense {
    fn default() -> Self {
        Self {
            reference_v: ADC_REFERENCE_V,
            full_scale: ADC_FULL_SCALE,
            divider: VSENSE_DIVIDER,
        }
    }
}

impl VoltageSense {
    pub fn volts(&self, raw: u32) -> f32 {
        raw as f32 * self.reference_v / self.full_scale / self.divider
    }
}
