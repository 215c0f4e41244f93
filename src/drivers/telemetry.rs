use core::fmt::Write;

use crate::error::FatalError;
use crate::state::TelemetrySample;

pub const LINE_CAPACITY: usize = 96;

pub type TelemetryLine = heapless::String<LINE_CAPACITY>;

/// `"<pitch> <roll> <height> <voltage>\n"`
pub fn format_line(sample: &TelemetrySample) -> TelemetryLine {
    let mut line = TelemetryLine::new();
    // Overflow truncates.
    let _ = writeln!(
        line,
        "{} {} {} {}",
        sample.pitch, sample.roll, sample.height_in, sample.voltage
    );
    line
}

/// Human-readable line sent before the vehicle halts.
pub fn fault_message(err: &FatalError) -> TelemetryLine {
    let mut line = TelemetryLine::new();
    let _ = writeln!(line, "FAULT {}", err);
    line
}
