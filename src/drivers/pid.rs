use micromath::F32Ext;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

/// Which discretisation a [`PidController`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PidForm {
    /// Incremental form at a fixed, unit sample interval.
    Difference,
    /// Positional form with the timestep passed on every call.
    Timestep,
}

/// `u(n) = u(n-1) + k1*e(n) + k2*e(n-1) + k3*e(n-2)`
///
/// With gains, `k1 = kp + ki + kd`, `k2 = -kp - 2*kd`, `k3 = kd`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IncrementalPid {
    k1: f32,
    k2: f32,
    k3: f32,
    u1: f32,
    e1: f32,
    e2: f32,
}

impl IncrementalPid {
    pub fn new(gains: PidGains) -> Self {
        Self::from_coefficients(
            gains.kp + gains.ki + gains.kd,
            -gains.kp - 2.0 * gains.kd,
            gains.kd,
        )
    }

    pub fn from_coefficients(k1: f32, k2: f32, k3: f32) -> Self {
        Self { k1, k2, k3, u1: 0.0, e1: 0.0, e2: 0.0 }
    }

    pub fn calculate(&mut self, e: f32) -> f32 {
        let u = self.u1 + self.k1 * e + self.k2 * self.e1 + self.k3 * self.e2;
        self.u1 = u;
        self.e2 = self.e1;
        self.e1 = e;
        u
    }

    pub fn reset(&mut self) {
        self.u1 = 0.0;
        self.e1 = 0.0;
        self.e2 = 0.0;
    }
}

/// `u = kp*e + ki*∫e dt + kd*de/dt` with a clamped integrator and an error
/// deadband.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimestepPid {
    gains: PidGains,
    integral: f32,
    integral_limit: f32,
    deadband: f32,
    e_prev: f32,
}

impl TimestepPid {
    pub fn new(gains: PidGains, integral_limit: f32, deadband: f32) -> Self {
        Self {
            gains,
            integral: 0.0,
            integral_limit: integral_limit.abs(),
            deadband: deadband.abs(),
            e_prev: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.e_prev = 0.0;
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn calculate(&mut self, e: f32, dt: f32) -> f32 {
        // Open interval: an error of exactly the deadband still counts.
        let e = if e > -self.deadband && e < self.deadband { 0.0 } else { e };

        self.integral += e * dt;
        self.integral = self.integral.clamp(-self.integral_limit, self.integral_limit);

        let derivative = if dt > 0.0 { (e - self.e_prev) / dt } else { 0.0 };
        self.e_prev = e;

        self.gains.kp * e + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}

/// One controller per axis, in either form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PidController {
    Difference(IncrementalPid),
    Timestep(TimestepPid),
}

impl PidController {
    pub fn new(form: PidForm, gains: PidGains, integral_limit: f32, deadband: f32) -> Self {
        match form {
            PidForm::Difference => Self::Difference(IncrementalPid::new(gains)),
            PidForm::Timestep => Self::Timestep(TimestepPid::new(gains, integral_limit, deadband)),
        }
    }

    /// `dt` is ignored by the incremental form.
    pub fn calculate(&mut self, e: f32, dt: f32) -> f32 {
        match self {
            Self::Difference(pid) => pid.calculate(e),
            Self::Timestep(pid) => pid.calculate(e, dt),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Difference(pid) => pid.reset(),
            Self::Timestep(pid) => pid.reset(),
        }
    }
}
