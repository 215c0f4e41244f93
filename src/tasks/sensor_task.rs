use defmt::warn;
use embassy_executor::task;
use embassy_time::{Duration, Ticker};

use quadfc::config::LOOP_PERIOD_MS;
use quadfc::drivers::double_buffer::Writer;
use quadfc::drivers::lidar_lite::{self, RangeSample, MEASUREMENT_TIME_MS};
use quadfc::drivers::{l3gd20h, lsm303d};
use quadfc::state::SensorSample;

use crate::board::SensorBus;

/// Rangefinder cycle in sensor ticks; long enough for one conversion.
const RANGE_DIVIDER: u32 = 5;
const _: () = assert!((RANGE_DIVIDER * LOOP_PERIOD_MS) as u64 >= MEASUREMENT_TIME_MS);

/// Sensor task, run on the interrupt executor so it preempts the control
/// loop. Reads both inertial sensors every period and publishes the raw
/// blocks, failures included, into the double buffers.
#[task]
pub async fn sensor_task(
    mut bus: SensorBus,
    mut gyro: Writer<'static, SensorSample>,
    mut accel: Writer<'static, SensorSample>,
    mut range: Writer<'static, RangeSample>,
) {
    let mut ticker = Ticker::every(Duration::from_millis(LOOP_PERIOD_MS as u64));
    let mut tick: u32 = 0;
    let mut measuring = false;

    loop {
        ticker.next().await;
        tick = tick.wrapping_add(1);

        if let Err(e) = l3gd20h::read_into(&mut bus, &mut gyro).await {
            warn!("gyro read failed: {}", e);
        }
        if let Err(e) = lsm303d::read_into(&mut bus, &mut accel).await {
            warn!("accel read failed: {}", e);
        }

        // ── Rangefinder: collect the previous conversion, start the next ──
        if tick % RANGE_DIVIDER == 0 {
            if measuring {
                let sample = lidar_lite::read_distance_cm(&mut bus).await;
                if let Err(e) = sample {
                    warn!("rangefinder read failed: {}", e);
                }
                range.write_done(sample);
            }
            match lidar_lite::start_measurement(&mut bus).await {
                Ok(()) => measuring = true,
                Err(e) => {
                    measuring = false;
                    range.write_done(Err(e));
                }
            }
        }
    }
}
