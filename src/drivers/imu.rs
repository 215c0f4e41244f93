//! Roll/pitch estimation from the gyro and accelerometer register blocks.
//!
//! Per tick: decode and scale both sensors, remove the calibration offsets,
//! run every axis through its pre-filter, derive tilt angles from the
//! gravity vector, then fuse each tilt angle with the matching gyro rate.
//! Roll pairs the Y accelerometer angle with the Y rate, pitch pairs X with
//! X. The Z rate is reported as the yaw rate.

use micromath::F32Ext;

use crate::config::{positive, CALIBRATION_SAMPLES, COMPLEMENTARY_TAU, LOOP_PERIOD_MS};
use crate::drivers::complementary::{ComplementaryFilter, FilterOrder, IntegratingFusion};
use crate::drivers::filter::{Prefilter, ACCEL_PREFILTER, GYRO_PREFILTER};
use crate::drivers::l3gd20h::{self, GyroConfig};
use crate::drivers::lsm303d::{self, AccelConfig};
use crate::error::{ConfigError, IoError};
use crate::io::{AttitudeSource, ImuSource};
use crate::state::AttitudeEstimate;

/// How the tilt angle and the rate are combined per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FusionMode {
    /// Sum of the two complementary branches.
    Complementary(FilterOrder),
    /// `angle = tau * (angle + rate * dt) + (1 - tau) * tilt`
    Integrating,
}

/// Sensor pre-filter applied to every axis before fusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrefilterKind {
    /// The fixed elliptic cascades in [`crate::drivers::filter`].
    Biquad,
    /// Second-order complementary low-pass with the given time constant,
    /// [`crate::config::PREFILTER_TAU`] on the stock airframe.
    Complementary { tau: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorConfig {
    pub gyro: GyroConfig,
    pub accel: AccelConfig,
    /// Crossover constant of the fusion stage.
    pub tau: f32,
    pub fusion: FusionMode,
    pub prefilter: PrefilterKind,
    /// Tick period [s]; only the integrating fusion uses it.
    pub dt: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            gyro: GyroConfig::default(),
            accel: AccelConfig::default(),
            tau: COMPLEMENTARY_TAU,
            fusion: FusionMode::Complementary(FilterOrder::First),
            prefilter: PrefilterKind::Biquad,
            dt: LOOP_PERIOD_MS as f32 / 1000.0,
        }
    }
}

impl EstimatorConfig {
    /// Rejects time constants the fusion and pre-filter stages cannot run
    /// with. The integrating fusion uses `tau` as a blend weight, so it
    /// must also stay below one there.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.dt) {
            return Err(ConfigError::LoopPeriod);
        }
        if !positive(self.tau) {
            return Err(ConfigError::TimeConstant);
        }
        if self.fusion == FusionMode::Integrating && self.tau >= 1.0 {
            return Err(ConfigError::TimeConstant);
        }
        if let PrefilterKind::Complementary { tau } = self.prefilter {
            if !positive(tau) {
                return Err(ConfigError::TimeConstant);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AxisPrefilter {
    Biquad(Prefilter),
    Complementary(ComplementaryFilter),
}

impl AxisPrefilter {
    fn new(kind: PrefilterKind, cascade: Prefilter) -> Self {
        match kind {
            PrefilterKind::Biquad => Self::Biquad(cascade),
            PrefilterKind::Complementary { tau } => Self::Complementary(ComplementaryFilter::accel_second_order(tau)),
        }
    }

    fn filter_sample(&mut self, x: f32) -> f32 {
        match self {
            Self::Biquad(f) => f.filter_sample(x),
            Self::Complementary(f) => f.filter_sample(x),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AxisFusion {
    Complementary {
        tilt: ComplementaryFilter,
        rate: ComplementaryFilter,
    },
    Integrating(IntegratingFusion),
}

impl AxisFusion {
    fn new(mode: FusionMode, tau: f32) -> Self {
        match mode {
            FusionMode::Complementary(FilterOrder::First) => Self::Complementary {
                tilt: ComplementaryFilter::accel(tau),
                rate: ComplementaryFilter::gyro(tau),
            },
            FusionMode::Complementary(FilterOrder::Second) => Self::Complementary {
                tilt: ComplementaryFilter::accel_second_order(tau),
                rate: ComplementaryFilter::gyro_second_order(tau),
            },
            FusionMode::Integrating => Self::Integrating(IntegratingFusion::new(tau)),
        }
    }

    fn fuse(&mut self, tilt_deg: f32, rate_dps: f32, dt: f32) -> f32 {
        match self {
            Self::Complementary { tilt, rate } => tilt.filter_sample(tilt_deg) + rate.filter_sample(rate_dps),
            Self::Integrating(f) => f.update(tilt_deg, rate_dps, dt),
        }
    }
}

/// Stationary-sample accumulator for the start-up offset calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Calibration {
    gyro_sum: [f32; 3],
    accel_sum: [f32; 3],
    count: u32,
}

impl Calibration {
    pub const SAMPLES: u32 = CALIBRATION_SAMPLES;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rates: [f32; 3], accel: [f32; 3]) {
        for i in 0..3 {
            self.gyro_sum[i] += rates[i];
            self.accel_sum[i] += accel[i];
        }
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_complete(&self) -> bool {
        self.count >= Self::SAMPLES
    }

    /// Mean rate on each axis; all zero before the first sample.
    pub fn gyro_offsets(&self) -> [f32; 3] {
        self.mean(&self.gyro_sum)
    }

    /// Mean acceleration with gravity kept on Z, so a level vehicle still
    /// reads `+1 g` there after correction.
    pub fn accel_offsets(&self) -> [f32; 3] {
        if self.count == 0 {
            return [0.0; 3];
        }
        let [x, y, z] = self.mean(&self.accel_sum);
        [x, y, z - 1.0]
    }

    fn mean(&self, sum: &[f32; 3]) -> [f32; 3] {
        if self.count == 0 {
            return [0.0; 3];
        }
        let n = self.count as f32;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }
}

fn tilt_deg(axis: f32, other_a: f32, other_b: f32) -> f32 {
    let horizontal = (other_a * other_a + other_b * other_b).sqrt();
    if axis == 0.0 && horizontal == 0.0 {
        return 0.0;
    }
    axis.atan2(horizontal).to_degrees()
}

pub struct AttitudeEstimator<S: ImuSource> {
    source: S,
    config: EstimatorConfig,
    gyro_resolution: f32,
    accel_resolution: f32,
    gyro_offsets: [f32; 3],
    accel_offsets: [f32; 3],
    gyro_prefilters: [AxisPrefilter; 3],
    accel_prefilters: [AxisPrefilter; 3],
    roll: AxisFusion,
    pitch: AxisFusion,
}

impl<S: ImuSource> AttitudeEstimator<S> {
    pub fn new(source: S, config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            gyro_resolution: config.gyro.scale.resolution(),
            accel_resolution: config.accel.scale.resolution(),
            gyro_offsets: [0.0; 3],
            accel_offsets: [0.0; 3],
            gyro_prefilters: [AxisPrefilter::new(config.prefilter, GYRO_PREFILTER); 3],
            accel_prefilters: [AxisPrefilter::new(config.prefilter, ACCEL_PREFILTER); 3],
            roll: AxisFusion::new(config.fusion, config.tau),
            pitch: AxisFusion::new(config.fusion, config.tau),
            config,
        })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Scaled, offset-corrected readings before any filtering:
    /// `(rates [deg/s], acceleration [g])`.
    pub fn read_scaled(&mut self) -> Result<([f32; 3], [f32; 3]), IoError> {
        let gyro = l3gd20h::decode(&self.source.gyro_block()?);
        let accel = lsm303d::decode(&self.source.accel_block()?);

        let mut rates = [0.0; 3];
        let mut acc = [0.0; 3];
        for i in 0..3 {
            rates[i] = gyro[i] as f32 * self.gyro_resolution - self.gyro_offsets[i];
            acc[i] = accel[i] as f32 * self.accel_resolution - self.accel_offsets[i];
        }
        Ok((rates, acc))
    }

    /// Adds one stationary reading to `cal`. Offsets must not be applied yet.
    pub fn sample_calibration(&mut self, cal: &mut Calibration) -> Result<(), IoError> {
        let (rates, acc) = self.read_scaled()?;
        cal.add(rates, acc);
        Ok(())
    }

    /// Installs the offsets from `cal` and restarts every filter.
    pub fn apply_calibration(&mut self, cal: &Calibration) {
        self.gyro_offsets = cal.gyro_offsets();
        self.accel_offsets = cal.accel_offsets();
        self.reset_filters();
        info!(
            "calibrated over {} samples, gyro offsets {:?}",
            cal.count(),
            self.gyro_offsets
        );
    }

    pub fn reset_filters(&mut self) {
        let config = self.config;
        self.gyro_prefilters = [AxisPrefilter::new(config.prefilter, GYRO_PREFILTER); 3];
        self.accel_prefilters = [AxisPrefilter::new(config.prefilter, ACCEL_PREFILTER); 3];
        self.roll = AxisFusion::new(config.fusion, config.tau);
        self.pitch = AxisFusion::new(config.fusion, config.tau);
    }

    pub fn update(&mut self) -> Result<AttitudeEstimate, IoError> {
        let (rates, acc) = self.read_scaled()?;

        let mut g = [0.0; 3];
        let mut a = [0.0; 3];
        for i in 0..3 {
            g[i] = self.gyro_prefilters[i].filter_sample(rates[i]);
            a[i] = self.accel_prefilters[i].filter_sample(acc[i]);
        }

        let pitch_tilt = tilt_deg(a[0], a[1], a[2]);
        let roll_tilt = tilt_deg(a[1], a[0], a[2]);

        let dt = self.config.dt;
        Ok(AttitudeEstimate {
            roll: self.roll.fuse(roll_tilt, g[1], dt),
            pitch: self.pitch.fuse(pitch_tilt, g[0], dt),
            yaw_rate: g[2],
        })
    }
}

impl<S: ImuSource> AttitudeSource for AttitudeEstimator<S> {
    fn update(&mut self) -> Result<AttitudeEstimate, IoError> {
        AttitudeEstimator::update(self)
    }
}
