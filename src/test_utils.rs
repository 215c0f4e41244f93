//! Float comparison helpers shared by the unit tests.

/// Tolerance for values produced by a short chain of float operations.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// Tolerance for values that went through a long filter recursion.
pub const SETTLE_TOLERANCE: f32 = 1e-3;

/// `true` if `value` is within [`TEST_TOLERANCE`] of `target`.
pub fn value_close(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// `true` if `value` is within `tolerance` of `target`.
pub fn value_within(target: f32, value: f32, tolerance: f32) -> bool {
    (target - value).abs() < tolerance
}

/// Register bus that records traffic and answers reads from a fixed buffer.
#[derive(Debug, Default)]
pub struct MockBus {
    /// `(device, register, value)`
    pub writes: std::vec::Vec<(u8, u8, u8)>,
    /// `(device, register, length)`
    pub reads: std::vec::Vec<(u8, u8, usize)>,
    pub response: std::vec::Vec<u8>,
    pub fail: Option<crate::error::BusError>,
}

impl MockBus {
    pub fn with_block(response: &[u8]) -> Self {
        Self { response: response.to_vec(), ..Self::default() }
    }
}

impl crate::io::RegisterBus for MockBus {
    async fn write_register(
        &mut self,
        device: u8,
        register: u8,
        value: u8,
    ) -> Result<(), crate::error::BusError> {
        if let Some(err) = self.fail {
            return Err(err);
        }
        self.writes.push((device, register, value));
        Ok(())
    }

    async fn read_registers(
        &mut self,
        device: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), crate::error::BusError> {
        if let Some(err) = self.fail {
            return Err(err);
        }
        self.reads.push((device, register, buf.len()));
        for (dst, src) in buf.iter_mut().zip(self.response.iter()) {
            *dst = *src;
        }
        Ok(())
    }
}
