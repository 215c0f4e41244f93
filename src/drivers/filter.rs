use micromath::F32Ext;

/// One second-order section, Direct Form 2 Transposed.
///
/// Difference equation:
/// `y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadSection {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl BiquadSection {
    pub const fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self { b0, b1, b2, a1, a2, z1: 0.0, z2: 0.0 }
    }

    /// Takes a coefficient row as exported for the CMSIS DF2T routines,
    /// whose feedback terms carry the opposite sign.
    pub const fn from_cmsis(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self::new(b0, b1, b2, -a1, -a2)
    }

    /// Butterworth-style low-pass from cutoff and sample rate.
    pub fn lowpass(cutoff_freq: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * core::f32::consts::PI * cutoff_freq / sample_rate;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * q);

        let b0 = (1.0 - cs) / 2.0;
        let b1 = 1.0 - cs;
        let b2 = (1.0 - cs) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cs;
        let a2 = 1.0 - alpha;

        Self::new(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0)
    }

    pub fn filter(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// `N` sections in series followed by an overall gain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCascadeFilter<const N: usize> {
    gain: f32,
    sections: [BiquadSection; N],
}

impl<const N: usize> BiquadCascadeFilter<N> {
    pub const fn new(gain: f32, sections: [BiquadSection; N]) -> Self {
        Self { gain, sections }
    }

    pub fn filter_sample(&mut self, input: f32) -> f32 {
        let mut y = input;
        for section in self.sections.iter_mut() {
            y = section.filter(y);
        }
        y * self.gain
    }

    pub fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.reset();
        }
    }
}

// ── Sensor pre-filters ────────────────────────────────────────────────────────

pub const PREFILTER_SECTIONS: usize = 4;

pub type Prefilter = BiquadCascadeFilter<PREFILTER_SECTIONS>;

/// Accelerometer: 8th-order elliptic, 2 Hz pass / 3 Hz stop at 100 Hz.
pub const ACCEL_PREFILTER: Prefilter = BiquadCascadeFilter::new(
    0.000106468611206,
    [
        BiquadSection::from_cmsis(1.0, -1.95953138525, 1.0, 1.95144255108, -0.964882197289),
        BiquadSection::from_cmsis(1.0, -1.92112902732, 1.0, 1.92640902728, -0.934482799651),
        BiquadSection::from_cmsis(1.0, -1.48432259432, 1.0, 1.90586457236, -0.909019680291),
        BiquadSection::from_cmsis(1.0, -1.96822547213, 1.0, 1.97290627125, -0.989358918125),
    ],
);

/// Gyro: 7th-order elliptic, 1 Hz pass / 2 Hz stop at 50 Hz. The last
/// section is first order.
pub const GYRO_PREFILTER: Prefilter = BiquadCascadeFilter::new(
    6.28832087242e-05,
    [
        BiquadSection::from_cmsis(1.0, -1.95527693158, 1.0, 1.9671534848, -0.983957988485),
        BiquadSection::from_cmsis(1.0, -1.93562845047, 1.0, 1.93697323893, -0.949448544642),
        BiquadSection::from_cmsis(1.0, -1.81557763356, 1.0, 1.90840490853, -0.914482014726),
        BiquadSection::from_cmsis(1.0, 1.0, 0.0, 0.947588073493, 0.0),
    ],
);
