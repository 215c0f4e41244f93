//! ESC pulse mapping. Standard servo-style PWM at 50 Hz: 1 ms is stopped,
//! 2 ms is full throttle.

/// ESC update rate.
pub const PWM_FREQUENCY_HZ: u32 = 50;
pub const ZERO_SPEED_PULSE_MS: f32 = 1.0;
pub const FULL_SPEED_PULSE_MS: f32 = 2.0;

const PERIOD_MS: f32 = 1000.0 / PWM_FREQUENCY_HZ as f32;

/// Pulse width for `speed`, clamped to `[0, max_speed]` first.
pub fn speed_to_pulse_ms(speed: f32, max_speed: f32) -> f32 {
    let s = speed.clamp(0.0, max_speed);
    (FULL_SPEED_PULSE_MS - ZERO_SPEED_PULSE_MS) * s + ZERO_SPEED_PULSE_MS
}

/// Compare value for a timer channel whose full period is `max_duty`.
pub fn speed_to_duty(speed: f32, max_speed: f32, max_duty: u32) -> u32 {
    let fraction = speed_to_pulse_ms(speed, max_speed) / PERIOD_MS;
    (fraction * max_duty as f32) as u32
}
