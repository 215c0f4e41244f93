//! Remote control link: fixed six-byte frames over the radio UART.
//!
//! Control frame: `[START, throttle, pitch, roll, yaw, STOP]`.
//! Mode commands are frames with all six bytes equal to a sentinel.

use crate::error::{BusError, ProtocolError};
use crate::state::ControlCommand;

pub const FRAME_LEN: usize = 6;

pub const START: u8 = 255;
pub const STOP: u8 = 254;

pub const FLY_CMD: u8 = 1;
pub const DEMO_CMD: u8 = 2;
pub const DEMO_MOTOR_TOGGLE: u8 = 3;

/// Raw throttle byte mapped to `MAX_SPEED`.
const THROTTLE_FULL_SCALE: f32 = 253.0;
/// Stick centre for the signed channels.
const STICK_CENTER: f32 = 127.0;

/// UART line settings of the radio link.
pub const BAUDRATE: u32 = 57_600;

pub type Frame = [u8; FRAME_LEN];

/// What the receive path publishes: a complete frame or the UART failure.
pub type RemoteSample = Result<Frame, BusError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeCommand {
    Fly,
    Demo,
    DemoMotorToggle,
}

/// Recognises an all-sentinel frame.
pub fn sentinel(frame: &Frame) -> Option<ModeCommand> {
    let first = frame[0];
    if frame.iter().any(|&b| b != first) {
        return None;
    }
    match first {
        FLY_CMD => Some(ModeCommand::Fly),
        DEMO_CMD => Some(ModeCommand::Demo),
        DEMO_MOTOR_TOGGLE => Some(ModeCommand::DemoMotorToggle),
        _ => None,
    }
}

pub fn is_well_formed(frame: &Frame) -> bool {
    frame[0] == START && frame[FRAME_LEN - 1] == STOP
}

/// Decodes a control frame into setpoints.
pub fn decode(
    frame: &Frame,
    max_speed: f32,
    max_angle: f32,
    max_rate: f32,
) -> Result<ControlCommand, ProtocolError> {
    if !is_well_formed(frame) {
        return Err(ProtocolError::MalformedFrame {
            start: frame[0],
            stop: frame[FRAME_LEN - 1],
        });
    }

    let signed = |b: u8| (b as f32 - STICK_CENTER) / STICK_CENTER;
    Ok(ControlCommand {
        throttle: (frame[1] as f32 / (THROTTLE_FULL_SCALE / max_speed)).min(max_speed),
        pitch: signed(frame[2]) * max_angle,
        roll: signed(frame[3]) * max_angle,
        yaw_rate: signed(frame[4]) * max_rate,
    })
}

/// Cuts a byte stream into consecutive frames.
///
/// Alignment is by count only, so a dropped byte shows up as malformed
/// frames downstream rather than being silently resynchronised.
pub struct FrameAssembler {
    buffer: heapless::Vec<u8, FRAME_LEN>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { buffer: heapless::Vec::new() }
    }

    pub fn push_byte(&mut self, b: u8) -> Option<Frame> {
        // Cannot fail: the buffer is drained as soon as it is full.
        let _ = self.buffer.push(b);
        if self.buffer.is_full() {
            let mut frame = [0u8; FRAME_LEN];
            frame.copy_from_slice(&self.buffer);
            self.buffer.clear();
            return Some(frame);
        }
        None
    }

    /// Feeds `data` and returns one of the frames it completed: the first
    /// malformed one if any, otherwise the newest. A corrupted frame is never
    /// hidden behind a good one from the same batch.
    pub fn push_bytes(&mut self, data: &[u8]) -> Option<Frame> {
        let mut malformed = None;
        let mut last = None;
        for &b in data {
            if let Some(frame) = self.push_byte(b) {
                if malformed.is_none() && !is_well_formed(&frame) && sentinel(&frame).is_none() {
                    malformed = Some(frame);
                }
                last = Some(frame);
            }
        }
        malformed.or(last)
    }

    /// Drops a partial frame, e.g. after a receive error.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
