pub mod control_loop;
pub mod remote_task;
pub mod sensor_task;
pub mod telemetry_task;
