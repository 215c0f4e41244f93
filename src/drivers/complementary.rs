//! Complementary fusion of an accelerometer angle with a gyro rate.
//!
//! The accelerometer branch is a low-pass on the angle. The gyro branch is
//! a low-pass on the *rate*, which acts as a high-pass on the angle it
//! integrates to, so summing the two branch outputs gives the fused angle
//! with the crossover set by `tau`.
//!
//! Both branches are bilinear discretisations at unit sample interval and
//! are stable for any `tau > 0`.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Branch {
    /// Angle derived from the accelerometer [deg].
    Accel,
    /// Pre-filtered angular rate [deg/s].
    Gyro,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterOrder {
    First,
    Second,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComplementaryFilter {
    branch: Branch,
    order: FilterOrder,
    tau: f32,
    /// `x[n-1]`, `x[n-2]`
    x: [f32; 2],
    /// `y[n-1]`, `y[n-2]`
    y: [f32; 2],
}

impl ComplementaryFilter {
    pub const fn new(branch: Branch, order: FilterOrder, tau: f32) -> Self {
        Self { branch, order, tau, x: [0.0; 2], y: [0.0; 2] }
    }

    pub const fn accel(tau: f32) -> Self {
        Self::new(Branch::Accel, FilterOrder::First, tau)
    }

    pub const fn gyro(tau: f32) -> Self {
        Self::new(Branch::Gyro, FilterOrder::First, tau)
    }

    pub const fn accel_second_order(tau: f32) -> Self {
        Self::new(Branch::Accel, FilterOrder::Second, tau)
    }

    pub const fn gyro_second_order(tau: f32) -> Self {
        Self::new(Branch::Gyro, FilterOrder::Second, tau)
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn order(&self) -> FilterOrder {
        self.order
    }

    pub fn filter_sample(&mut self, x: f32) -> f32 {
        let t = self.tau;
        let [x1, x2] = self.x;
        let [y1, y2] = self.y;

        let y = match (self.order, self.branch) {
            (FilterOrder::First, Branch::Accel) => (x + x1 - y1 * (1.0 - t)) / (t + 1.0),
            (FilterOrder::First, Branch::Gyro) => (x * t + x1 * t - y1 * (1.0 - t)) / (t + 1.0),
            (FilterOrder::Second, branch) => {
                let t2 = t * t;
                let feed_forward = match branch {
                    Branch::Accel => (2.0 * t + 1.0) * x + 2.0 * x1 + (1.0 - 2.0 * t) * x2,
                    Branch::Gyro => t2 * x - t2 * x2,
                };
                let feedback = (2.0 - 2.0 * t2) * y1 + (t2 - 2.0 * t + 1.0) * y2;
                (feed_forward - feedback) / (t2 + 2.0 * t + 1.0)
            }
        };

        self.x = [x, x1];
        self.y = [y, y1];
        y
    }

    pub fn reset(&mut self) {
        self.x = [0.0; 2];
        self.y = [0.0; 2];
    }
}

/// Single-state alternative: integrate the rate onto the previous estimate
/// and pull it toward the accelerometer angle.
///
/// `angle = tau * (angle + rate * dt) + (1 - tau) * acc_angle`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegratingFusion {
    tau: f32,
    angle: f32,
}

impl IntegratingFusion {
    pub const fn new(tau: f32) -> Self {
        Self { tau, angle: 0.0 }
    }

    pub fn update(&mut self, acc_angle: f32, rate: f32, dt: f32) -> f32 {
        self.angle = self.tau * (self.angle + rate * dt) + (1.0 - self.tau) * acc_angle;
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }
}
