use embassy_executor::task;
use embassy_time::{Duration, Ticker};

use quadfc::config::{CALIBRATION_INTERVAL_MS, LOOP_PERIOD_MS};
use quadfc::drivers::imu::{AttitudeEstimator, Calibration};
use quadfc::flight::FlightController;
use quadfc::io::BufferedImu;
use quadfc::state::FlightMode;

use crate::board::{park, BoardIo};

pub type Controller = FlightController<AttitudeEstimator<BufferedImu<'static>>, BoardIo>;

// ── Task ─────────────────────────────────────────────────────────────────────
#[task]
pub async fn control_loop(mut fc: Controller) {
    // ── Stationary offset calibration ──
    let mut cal = Calibration::new();
    let mut ticker = Ticker::every(Duration::from_millis(CALIBRATION_INTERVAL_MS as u64));
    while !cal.is_complete() {
        ticker.next().await;
        if let Err(e) = fc.attitude_mut().sample_calibration(&mut cal) {
            fc.signal_fatal(e.into());
            park().await;
        }
    }
    fc.attitude_mut().apply_calibration(&cal);

    // ── Flight ──
    let mut ticker = Ticker::every(Duration::from_millis(LOOP_PERIOD_MS as u64));
    loop {
        ticker.next().await;
        if fc.tick() == FlightMode::Abort {
            park().await;
        }
    }
}
