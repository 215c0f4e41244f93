pub mod complementary;
pub mod double_buffer;
pub mod filter;
pub mod imu;
pub mod l3gd20h;
pub mod lidar_lite;
pub mod lsm303d;
pub mod motor;
pub mod pid;
pub mod remote;
pub mod sensor_block;
pub mod telemetry;
pub mod vsense;
