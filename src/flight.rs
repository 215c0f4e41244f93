//! Flight-mode state machine.
//!
//! ```text
//! Idle ──FLY x6──▶ Fly ──┐
//!   └───DEMO x6──▶ Demo ─┴─ any fault ──▶ Abort (terminal)
//! ```
//!
//! One [`FlightController::tick`] per control period. Every fault raised
//! during a tick is funnelled through [`fail_stop`]: report on the telemetry
//! link if it still works, light the fault LED, stop all motors.

use micromath::F32Ext;

use crate::config::{DemoConfig, FlightConfig};
use crate::drivers::pid::PidController;
use crate::drivers::remote::{self, ModeCommand};
use crate::drivers::telemetry::{fault_message, format_line};
use crate::error::{ConfigError, EnvelopeError, FatalError, FlightResult, ProtocolError};
use crate::io::{AttitudeSource, FlightIo};
use crate::state::{AttitudeEstimate, ControlCommand, FlightMode, Motor, MotorOutputs, TelemetrySample};

// ── Mixing ────────────────────────────────────────────────────────────────────

/// Plus-configuration mixer. Outputs are not clamped.
pub fn mix(throttle: f32, u_pitch: f32, u_roll: f32) -> MotorOutputs {
    MotorOutputs {
        front: throttle - u_pitch,
        rear: throttle + u_pitch,
        right: throttle - u_roll,
        left: throttle + u_roll,
    }
}

/// Bench demo: roll angle drives the left/right pair in opposite directions.
pub fn demo_mix(roll: f32, demo: &DemoConfig) -> MotorOutputs {
    let speed = (roll + 90.0) / 180.0 * demo.max_speed;
    MotorOutputs {
        front: 0.0,
        rear: 0.0,
        right: demo.max_speed - speed,
        left: demo.left_gain * speed,
    }
}

// ── Fault path ────────────────────────────────────────────────────────────────

/// Reports `err` and puts the actuators in their safe state.
///
/// Usable before a [`FlightController`] exists, e.g. for start-up failures.
pub fn fail_stop<IO: FlightIo>(io: &mut IO, err: &FatalError) {
    error!("fatal: {}", err);
    if err.telemetry_usable() {
        // Nothing left to fall back on if this send fails too.
        let _ = io.send_telemetry(&fault_message(err));
    }
    io.set_fault_indicator();
    for motor in Motor::ALL {
        io.set_motor_speed(motor, 0.0);
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

pub struct FlightController<A: AttitudeSource, IO: FlightIo> {
    attitude: A,
    io: IO,
    config: FlightConfig,
    rx_timeout_ticks: Option<u32>,

    mode: FlightMode,
    fault: Option<FatalError>,

    pitch_pid: PidController,
    roll_pid: PidController,
    command: ControlCommand,
    estimate: AttitudeEstimate,
    outputs: MotorOutputs,

    /// Ticks since entering the current mode.
    ticks: u32,
    silent_ticks: u32,
    demo_motors_enabled: bool,
}

impl<A: AttitudeSource, IO: FlightIo> FlightController<A, IO> {
    pub fn new(attitude: A, io: IO, config: FlightConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pid = |gains| {
            PidController::new(
                config.pid_form,
                gains,
                config.integral_saturation,
                config.error_deadband,
            )
        };
        Ok(Self {
            attitude,
            io,
            rx_timeout_ticks: config.rx_timeout_ticks(),
            mode: FlightMode::Idle,
            fault: None,
            pitch_pid: pid(config.pitch_gains),
            roll_pid: pid(config.roll_gains),
            command: ControlCommand::default(),
            estimate: AttitudeEstimate::default(),
            outputs: MotorOutputs::ZERO,
            ticks: 0,
            silent_ticks: 0,
            demo_motors_enabled: false,
            config,
        })
    }

    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    /// The fault that caused `Abort`, if any.
    pub fn fault(&self) -> Option<FatalError> {
        self.fault
    }

    /// Motor speeds written on the last tick.
    pub fn outputs(&self) -> MotorOutputs {
        self.outputs
    }

    /// Setpoints from the newest accepted remote frame.
    pub fn command(&self) -> ControlCommand {
        self.command
    }

    pub fn estimate(&self) -> AttitudeEstimate {
        self.estimate
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    /// For start-up work on the estimator, such as calibration.
    pub fn attitude_mut(&mut self) -> &mut A {
        &mut self.attitude
    }

    /// Runs one control period and returns the mode after it.
    pub fn tick(&mut self) -> FlightMode {
        match self.step() {
            Ok(mode) => mode,
            Err(err) => {
                self.signal_fatal(err);
                FlightMode::Abort
            }
        }
    }

    /// Single entry to the fault path. The first fault is kept.
    pub fn signal_fatal(&mut self, err: FatalError) {
        fail_stop(&mut self.io, &err);
        if self.fault.is_none() {
            self.fault = Some(err);
        }
        self.outputs = MotorOutputs::ZERO;
        if self.mode != FlightMode::Abort {
            info!("mode {:?} -> {:?}", self.mode, FlightMode::Abort);
            self.mode = FlightMode::Abort;
        }
    }

    fn step(&mut self) -> FlightResult<FlightMode> {
        match self.mode {
            FlightMode::Idle => self.idle_tick()?,
            FlightMode::Fly => self.fly_tick()?,
            FlightMode::Demo => self.demo_tick()?,
            FlightMode::Abort => self.write_outputs(MotorOutputs::ZERO),
        }
        Ok(self.mode)
    }

    fn enter(&mut self, mode: FlightMode) {
        info!("mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.ticks = 0;
        self.silent_ticks = 0;
        self.demo_motors_enabled = false;
        self.command = ControlCommand::default();
        self.pitch_pid.reset();
        self.roll_pid.reset();
    }

    fn idle_tick(&mut self) -> FlightResult<()> {
        if let Some(frame) = self.io.try_read_frame()? {
            match remote::sentinel(&frame) {
                Some(ModeCommand::Fly) => self.enter(FlightMode::Fly),
                Some(ModeCommand::Demo) => self.enter(FlightMode::Demo),
                _ => debug!("idle: ignoring frame {:?}", frame),
            }
        }
        Ok(())
    }

    fn fly_tick(&mut self) -> FlightResult<()> {
        self.io.toggle_heartbeat();
        self.ticks = self.ticks.wrapping_add(1);

        match self.io.try_read_frame()? {
            Some(frame) => {
                self.command = remote::decode(
                    &frame,
                    self.config.max_speed,
                    self.config.max_angle,
                    self.config.max_rate,
                )?;
                self.silent_ticks = 0;
            }
            None => self.count_silence()?,
        }

        let att = self.read_attitude()?;
        let height_in = self.io.distance_inches()?;
        let raw_voltage = self.io.read_voltage_raw()?;

        let dt = self.config.loop_dt();
        let u_pitch = self.pitch_pid.calculate(self.command.pitch - att.pitch, dt) / self.config.pid_scale;
        let u_roll = self.roll_pid.calculate(self.command.roll - att.roll, dt) / self.config.pid_scale;

        let outputs = mix(self.command.throttle, u_pitch, u_roll).clamped(self.config.max_speed);
        self.write_outputs(outputs);

        self.report(&att, height_in, raw_voltage)
    }

    fn demo_tick(&mut self) -> FlightResult<()> {
        self.io.toggle_heartbeat();
        self.ticks = self.ticks.wrapping_add(1);

        if let Some(frame) = self.io.try_read_frame()? {
            match remote::sentinel(&frame) {
                Some(ModeCommand::DemoMotorToggle) => {
                    self.demo_motors_enabled = !self.demo_motors_enabled;
                    info!("demo motors enabled: {}", self.demo_motors_enabled);
                }
                Some(_) => {}
                None if remote::is_well_formed(&frame) => {}
                None => {
                    return Err(ProtocolError::MalformedFrame {
                        start: frame[0],
                        stop: frame[remote::FRAME_LEN - 1],
                    }
                    .into())
                }
            }
        }

        let att = self.read_attitude()?;
        let height_in = self.io.distance_inches()?;
        let raw_voltage = self.io.read_voltage_raw()?;

        let outputs = if self.demo_motors_enabled {
            demo_mix(att.roll, &self.config.demo).clamped(self.config.max_speed)
        } else {
            MotorOutputs::ZERO
        };
        self.write_outputs(outputs);

        self.report(&att, height_in, raw_voltage)
    }

    fn count_silence(&mut self) -> FlightResult<()> {
        let Some(limit) = self.rx_timeout_ticks else {
            return Ok(());
        };
        self.silent_ticks += 1;
        trace!("remote silent for {} ticks", self.silent_ticks);
        if self.silent_ticks >= limit {
            return Err(EnvelopeError::RemoteTimeout { silent_ticks: self.silent_ticks }.into());
        }
        Ok(())
    }

    /// Fetches the estimate and enforces the attitude envelope. NaN counts
    /// as out of envelope.
    fn read_attitude(&mut self) -> FlightResult<AttitudeEstimate> {
        let att = self.attitude.update()?;
        self.estimate = att;
        let max = self.config.max_angle;
        if !(att.roll.abs() < max && att.pitch.abs() < max) {
            return Err(EnvelopeError::AttitudeLimit { roll: att.roll, pitch: att.pitch }.into());
        }
        Ok(att)
    }

    fn report(&mut self, att: &AttitudeEstimate, height_in: f32, raw_voltage: u32) -> FlightResult<()> {
        if self.ticks % self.config.telemetry_divider != 0 {
            return Ok(());
        }
        let line = format_line(&TelemetrySample {
            pitch: att.pitch,
            roll: att.roll,
            height_in,
            voltage: self.config.vsense.volts(raw_voltage),
        });
        self.io.send_telemetry(&line)?;
        Ok(())
    }

    fn write_outputs(&mut self, outputs: MotorOutputs) {
        self.outputs = outputs;
        for motor in Motor::ALL {
            self.io.set_motor_speed(motor, outputs.get(motor));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SPEED;
    use crate::drivers::imu::tests::{accel_block, gyro_block, ScriptedImu};
    use crate::drivers::imu::{AttitudeEstimator, EstimatorConfig};
    use crate::drivers::remote::{Frame, DEMO_CMD, DEMO_MOTOR_TOGGLE, FLY_CMD, START, STOP};
    use crate::drivers::vsense::VoltageSense;
    use crate::error::{BusError, IoError};
    use crate::test_utils::{value_close, value_within};
    use std::collections::VecDeque;

    const CENTRE: Frame = [START, 127, 127, 127, 127, STOP];
    const VOLTAGE_RAW: u32 = 965;
    const HEIGHT_IN: f32 = 40.0;

    #[derive(Default)]
    struct MockIo {
        frames: VecDeque<Frame>,
        frame_error: Option<IoError>,
        telemetry_error: Option<IoError>,
        speeds: MotorOutputs,
        lines: Vec<String>,
        fault_led: bool,
        heartbeats: u32,
    }

    impl FlightIo for MockIo {
        fn set_motor_speed(&mut self, motor: Motor, speed: f32) {
            match motor {
                Motor::Front => self.speeds.front = speed,
                Motor::Rear => self.speeds.rear = speed,
                Motor::Left => self.speeds.left = speed,
                Motor::Right => self.speeds.right = speed,
            }
        }

        fn try_read_frame(&mut self) -> Result<Option<Frame>, IoError> {
            match self.frame_error {
                Some(err) => Err(err),
                None => Ok(self.frames.pop_front()),
            }
        }

        fn read_voltage_raw(&mut self) -> Result<u32, IoError> {
            Ok(VOLTAGE_RAW)
        }

        fn distance_inches(&mut self) -> Result<f32, IoError> {
            Ok(HEIGHT_IN)
        }

        fn send_telemetry(&mut self, line: &str) -> Result<(), IoError> {
            match self.telemetry_error {
                Some(err) => Err(err),
                None => {
                    self.lines.push(line.into());
                    Ok(())
                }
            }
        }

        fn set_fault_indicator(&mut self) {
            self.fault_led = true;
        }

        fn toggle_heartbeat(&mut self) {
            self.heartbeats += 1;
        }
    }

    /// Queued estimates, then the last one forever.
    struct ScriptedAttitude {
        queue: VecDeque<Result<AttitudeEstimate, IoError>>,
        hold: AttitudeEstimate,
    }

    impl ScriptedAttitude {
        fn steady(roll: f32, pitch: f32) -> Self {
            Self { queue: VecDeque::new(), hold: AttitudeEstimate { roll, pitch, yaw_rate: 0.0 } }
        }
    }

    impl AttitudeSource for ScriptedAttitude {
        fn update(&mut self) -> Result<AttitudeEstimate, IoError> {
            self.queue.pop_front().unwrap_or(Ok(self.hold))
        }
    }

    type TestController = FlightController<ScriptedAttitude, MockIo>;

    fn controller(attitude: ScriptedAttitude, frames: &[Frame]) -> TestController {
        let io = MockIo { frames: frames.iter().copied().collect(), ..MockIo::default() };
        FlightController::new(attitude, io, FlightConfig::default()).unwrap()
    }

    fn flying(roll: f32, pitch: f32, frames: &[Frame]) -> TestController {
        let mut fc = controller(ScriptedAttitude::steady(roll, pitch), &[[FLY_CMD; 6]]);
        assert_eq!(fc.tick(), FlightMode::Fly);
        fc.io.frames.extend(frames.iter().copied());
        fc
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = FlightConfig { max_speed: -1.0, ..FlightConfig::default() };
        let res = FlightController::new(ScriptedAttitude::steady(0.0, 0.0), MockIo::default(), cfg);
        assert!(matches!(res, Err(ConfigError::MaxSpeed)));
    }

    #[test]
    fn test_sentinels_select_mode() {
        let mut fc = controller(ScriptedAttitude::steady(0.0, 0.0), &[[FLY_CMD; 6]]);
        assert_eq!(fc.tick(), FlightMode::Fly);

        let mut fc = controller(ScriptedAttitude::steady(0.0, 0.0), &[[DEMO_CMD; 6]]);
        assert_eq!(fc.tick(), FlightMode::Demo);
    }

    #[test]
    fn test_idle_ignores_other_frames() {
        let mut fc = controller(
            ScriptedAttitude::steady(0.0, 0.0),
            &[CENTRE, [9; 6], [FLY_CMD, FLY_CMD, FLY_CMD, FLY_CMD, FLY_CMD, 0], [DEMO_MOTOR_TOGGLE; 6]],
        );
        for _ in 0..6 {
            assert_eq!(fc.tick(), FlightMode::Idle);
        }
        assert_eq!(fc.io.heartbeats, 0);
        assert!(fc.io.lines.is_empty());
    }

    #[test]
    fn test_zero_throttle_gives_zero_base() {
        let mut fc = flying(0.0, 0.0, &[[START, 0, 127, 127, 127, STOP]]);
        assert_eq!(fc.tick(), FlightMode::Fly);
        assert_eq!(fc.command().throttle, 0.0);
        assert_eq!(fc.outputs(), MotorOutputs::ZERO);
        assert_eq!(fc.io.speeds, MotorOutputs::ZERO);
    }

    #[test]
    fn test_corrupted_start_aborts() {
        let mut fc = flying(0.0, 0.0, &[[0, 100, 127, 127, 127, STOP], [FLY_CMD; 6]]);
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert_eq!(
            fc.fault(),
            Some(ProtocolError::MalformedFrame { start: 0, stop: STOP }.into())
        );
        assert!(fc.io.fault_led);
        assert_eq!(fc.io.speeds, MotorOutputs::ZERO);
        assert_eq!(
            fc.io.lines.last().map(String::as_str),
            Some("FAULT protocol: malformed remote frame (start 0, stop 254)\n")
        );

        // Terminal: nothing brings it back.
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert_eq!(fc.io.frames.len(), 1);
    }

    #[test]
    fn test_attitude_limit_aborts_within_one_tick() {
        let mut fc = flying(25.0, 0.0, &[]);
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert_eq!(
            fc.fault(),
            Some(EnvelopeError::AttitudeLimit { roll: 25.0, pitch: 0.0 }.into())
        );

        // Exactly at the limit is already outside.
        let mut fc = flying(0.0, -20.0, &[]);
        assert_eq!(fc.tick(), FlightMode::Abort);

        let mut fc = flying(f32::NAN, 0.0, &[]);
        assert_eq!(fc.tick(), FlightMode::Abort);
    }

    #[test]
    fn test_mix() {
        let out = mix(0.4, 0.1, 0.05);
        assert!(value_close(0.3, out.front));
        assert!(value_close(0.5, out.rear));
        assert!(value_close(0.35, out.right));
        assert!(value_close(0.45, out.left));
        assert_eq!(out.clamped(MAX_SPEED), out);

        let out = mix(0.9, -0.3, 0.95).clamped(MAX_SPEED);
        assert_eq!(out.front, 1.0);
        assert!(value_close(0.6, out.rear));
        assert_eq!(out.right, 0.0);
        assert_eq!(out.left, 1.0);
    }

    #[test]
    fn test_fly_applies_pitch_correction() {
        let mut fc = flying(0.0, 2.0, &[CENTRE]);
        assert_eq!(fc.tick(), FlightMode::Fly);

        // e = 0 - 2, u = kp * e / PID_SCALE
        let throttle = 127.0 / 253.0;
        let u_pitch = 6.0 * -2.0 / 55.0;
        let out = fc.outputs();
        assert!(value_close(throttle - u_pitch, out.front));
        assert!(value_close(throttle + u_pitch, out.rear));
        assert!(value_close(throttle, out.right));
        assert!(value_close(throttle, out.left));
        assert_eq!(fc.io.speeds, out);
        assert_eq!(fc.io.heartbeats, 1);
    }

    #[test]
    fn test_error_inside_deadband_is_ignored() {
        let mut fc = flying(0.5, -0.5, &[CENTRE]);
        fc.tick();
        let throttle = 127.0 / 253.0;
        for motor in Motor::ALL {
            assert!(value_close(throttle, fc.outputs().get(motor)));
        }
    }

    #[test]
    fn test_setpoints_hold_between_frames() {
        let mut fc = flying(0.0, 0.0, &[[START, 200, 127, 127, 127, STOP]]);
        fc.tick();
        fc.tick();
        assert!(value_close(200.0 / 253.0, fc.command().throttle));
        assert!(value_close(200.0 / 253.0, fc.outputs().front));
    }

    #[test]
    fn test_remote_silence_times_out() {
        let mut fc = flying(0.0, 0.0, &[]);
        for _ in 0..199 {
            assert_eq!(fc.tick(), FlightMode::Fly);
        }
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert_eq!(
            fc.fault(),
            Some(EnvelopeError::RemoteTimeout { silent_ticks: 200 }.into())
        );
    }

    #[test]
    fn test_frame_resets_silence() {
        let mut fc = flying(0.0, 0.0, &[]);
        for _ in 0..150 {
            fc.tick();
        }
        fc.io.frames.push_back(CENTRE);
        assert_eq!(fc.tick(), FlightMode::Fly);
        for _ in 0..199 {
            assert_eq!(fc.tick(), FlightMode::Fly);
        }
        assert_eq!(fc.tick(), FlightMode::Abort);
    }

    #[test]
    fn test_silence_failsafe_can_be_disabled() {
        let cfg = FlightConfig { rx_timeout_s: None, ..FlightConfig::default() };
        let io = MockIo { frames: [[FLY_CMD; 6]].into(), ..MockIo::default() };
        let mut fc = FlightController::new(ScriptedAttitude::steady(0.0, 0.0), io, cfg).unwrap();
        for _ in 0..1000 {
            assert_eq!(fc.tick(), FlightMode::Fly);
        }
    }

    #[test]
    fn test_telemetry_cadence() {
        let mut fc = flying(-2.25, 1.5, &[CENTRE]);
        for _ in 0..35 {
            fc.tick();
        }
        assert_eq!(fc.io.lines.len(), 3);

        let expected = format_line(&TelemetrySample {
            pitch: 1.5,
            roll: -2.25,
            height_in: HEIGHT_IN,
            voltage: VoltageSense::default().volts(VOLTAGE_RAW),
        });
        assert_eq!(fc.io.lines[0], expected.as_str());
    }

    #[test]
    fn test_telemetry_failure_suppresses_fault_message() {
        let mut fc = flying(0.0, 0.0, &[CENTRE]);
        fc.io.telemetry_error = Some(IoError::Telemetry(BusError::Overrun));
        for _ in 0..9 {
            assert_eq!(fc.tick(), FlightMode::Fly);
        }
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert!(fc.io.lines.is_empty());
        assert!(fc.io.fault_led);
        assert_eq!(fc.io.speeds, MotorOutputs::ZERO);
    }

    #[test]
    fn test_sensor_failure_is_fatal() {
        let mut attitude = ScriptedAttitude::steady(0.0, 0.0);
        attitude.queue.push_back(Err(IoError::Gyro(BusError::Nack)));
        let mut fc = controller(attitude, &[[FLY_CMD; 6], CENTRE]);
        fc.tick();
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert_eq!(fc.fault(), Some(IoError::Gyro(BusError::Nack).into()));
        assert_eq!(
            fc.io.lines.last().map(String::as_str),
            Some("FAULT io: gyro read failed: no acknowledge\n")
        );
    }

    #[test]
    fn test_remote_failure_in_idle_is_fatal() {
        let mut fc = controller(ScriptedAttitude::steady(0.0, 0.0), &[]);
        fc.io.frame_error = Some(IoError::Remote(BusError::Framing));
        assert_eq!(fc.tick(), FlightMode::Abort);
        assert!(fc.io.fault_led);
    }

    #[test]
    fn test_first_fault_is_kept() {
        let mut fc = flying(0.0, 0.0, &[[0; 6]]);
        fc.tick();
        fc.signal_fatal(EnvelopeError::RemoteTimeout { silent_ticks: 1 }.into());
        assert_eq!(
            fc.fault(),
            Some(ProtocolError::MalformedFrame { start: 0, stop: 0 }.into())
        );
        assert_eq!(fc.mode(), FlightMode::Abort);
    }

    #[test]
    fn test_demo_mix() {
        let demo = DemoConfig::default();
        let out = demo_mix(0.0, &demo);
        assert!(value_close(0.25, out.left));
        assert!(value_close(0.25, out.right));
        assert_eq!((out.front, out.rear), (0.0, 0.0));

        let out = demo_mix(90.0, &demo);
        assert!(value_close(0.5, out.left));
        assert!(value_close(0.0, out.right));

        let out = demo_mix(0.0, &DemoConfig { left_gain: 2.0, ..demo });
        assert!(value_close(0.5, out.left));
    }

    #[test]
    fn test_demo_toggle_gates_motors() {
        let mut fc = controller(ScriptedAttitude::steady(10.0, 0.0), &[[DEMO_CMD; 6]]);
        assert_eq!(fc.tick(), FlightMode::Demo);

        assert_eq!(fc.tick(), FlightMode::Demo);
        assert_eq!(fc.outputs(), MotorOutputs::ZERO);

        fc.io.frames.push_back([DEMO_MOTOR_TOGGLE; 6]);
        assert_eq!(fc.tick(), FlightMode::Demo);
        let speed = 100.0 / 180.0 * 0.5;
        assert!(value_close(speed, fc.io.speeds.left));
        assert!(value_close(0.5 - speed, fc.io.speeds.right));
        assert_eq!(fc.io.speeds.front, 0.0);

        // Control frames and repeated mode sentinels are ignored.
        fc.io.frames.extend([CENTRE, [DEMO_CMD; 6]]);
        fc.tick();
        fc.tick();
        assert!(value_close(speed, fc.outputs().left));

        fc.io.frames.push_back([DEMO_MOTOR_TOGGLE; 6]);
        assert_eq!(fc.tick(), FlightMode::Demo);
        assert_eq!(fc.io.speeds, MotorOutputs::ZERO);
    }

    #[test]
    fn test_demo_aborts_on_bad_frame_and_tilt() {
        let mut fc = controller(ScriptedAttitude::steady(0.0, 0.0), &[[DEMO_CMD; 6], [START, 0, 0, 0, 0, 7]]);
        fc.tick();
        assert_eq!(fc.tick(), FlightMode::Abort);

        let mut fc = controller(ScriptedAttitude::steady(0.0, 21.0), &[[DEMO_CMD; 6]]);
        fc.tick();
        assert_eq!(fc.tick(), FlightMode::Abort);
    }

    #[test]
    fn test_level_flight_with_estimator() {
        let imu = ScriptedImu::steady(gyro_block(0.0, 0.0, 0.0), accel_block(0.0, 0.0, 1.0));
        let estimator = AttitudeEstimator::new(imu, EstimatorConfig::default()).unwrap();
        let io = MockIo { frames: [[FLY_CMD; 6], CENTRE].into(), ..MockIo::default() };
        let mut fc = FlightController::new(estimator, io, FlightConfig::default()).unwrap();

        for _ in 0..100 {
            assert_eq!(fc.tick(), FlightMode::Fly);
        }
        let throttle = 127.0 / 253.0;
        for motor in Motor::ALL {
            assert!(value_within(throttle, fc.outputs().get(motor), 1e-3));
        }
        assert_eq!(fc.io.lines.len(), 10);
    }
}
