use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{AnyPin, Output};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals::{ADC1, DMA1_CH0, DMA1_CH7, I2C1, PA2, TIM3, TIM4};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_stm32::timer::{CaptureCompare16bitInstance, Channel};
use embassy_stm32::usart;
use embassy_stm32::Config;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use quadfc::drivers::double_buffer::Reader;
use quadfc::drivers::lidar_lite::{self, RangeSample};
use quadfc::drivers::motor;
use quadfc::drivers::remote::{Frame, RemoteSample};
use quadfc::drivers::telemetry::TelemetryLine;
use quadfc::error::{BusError, IoError};
use quadfc::io::{FlightIo, RegisterBus};
use quadfc::state::Motor;

/// Lines queued between the control loop and the UART writer.
pub const TELEMETRY_QUEUE: usize = 4;

pub type TelemetrySender = Sender<'static, CriticalSectionRawMutex, TelemetryLine, TELEMETRY_QUEUE>;
pub type TxFault = Signal<CriticalSectionRawMutex, BusError>;

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2), // 168 MHz
            divq: None,
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4; // timers at 84 MHz
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        let p = embassy_stm32::init(config);

        Self { p }
    }
}

/// Never returns; used once the vehicle has stopped for good.
pub async fn park() -> ! {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

// ── Sensor bus ────────────────────────────────────────────────────────────────

pub fn i2c_error(e: i2c::Error) -> BusError {
    match e {
        i2c::Error::Nack => BusError::Nack,
        i2c::Error::Arbitration => BusError::Arbitration,
        i2c::Error::Bus => BusError::Bus,
        i2c::Error::Overrun => BusError::Overrun,
        i2c::Error::Timeout => BusError::Timeout,
        _ => BusError::Other,
    }
}

pub fn uart_error(e: usart::Error) -> BusError {
    match e {
        usart::Error::Framing | usart::Error::Parity | usart::Error::Noise => BusError::Framing,
        usart::Error::Overrun => BusError::Overrun,
        _ => BusError::Other,
    }
}

/// I2C1 shared by the gyro, the accelerometer and the rangefinder.
pub struct SensorBus {
    i2c: I2c<'static, I2C1, DMA1_CH7, DMA1_CH0>,
}

impl SensorBus {
    pub fn new(i2c: I2c<'static, I2C1, DMA1_CH7, DMA1_CH0>) -> Self {
        Self { i2c }
    }
}

impl RegisterBus for SensorBus {
    async fn write_register(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c.write(device, &[register, value]).await.map_err(i2c_error)
    }

    async fn read_registers(&mut self, device: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c.write_read(device, &[register], buf).await.map_err(i2c_error)
    }
}

// ── Motors ────────────────────────────────────────────────────────────────────
//  FRONT PD14 TIM4_CH3 · REAR PD12 TIM4_CH1 · LEFT PC8 TIM3_CH3 · RIGHT PC6 TIM3_CH1

pub struct Motors {
    tim3: SimplePwm<'static, TIM3>,
    tim4: SimplePwm<'static, TIM4>,
    max_speed: f32,
}

fn set_pulse<T: CaptureCompare16bitInstance>(pwm: &mut SimplePwm<'_, T>, ch: Channel, speed: f32, max_speed: f32) {
    let duty = motor::speed_to_duty(speed, max_speed, pwm.get_max_duty() as u32);
    pwm.set_duty(ch, duty as u16);
}

impl Motors {
    /// Starts all four outputs at the zero-speed pulse.
    pub fn new(mut tim3: SimplePwm<'static, TIM3>, mut tim4: SimplePwm<'static, TIM4>, max_speed: f32) -> Self {
        for ch in [Channel::Ch1, Channel::Ch3] {
            set_pulse(&mut tim3, ch, 0.0, max_speed);
            set_pulse(&mut tim4, ch, 0.0, max_speed);
            tim3.enable(ch);
            tim4.enable(ch);
        }
        Self { tim3, tim4, max_speed }
    }

    pub fn set_speed(&mut self, motor: Motor, speed: f32) {
        let max = self.max_speed;
        match motor {
            Motor::Front => set_pulse(&mut self.tim4, Channel::Ch3, speed, max),
            Motor::Rear => set_pulse(&mut self.tim4, Channel::Ch1, speed, max),
            Motor::Left => set_pulse(&mut self.tim3, Channel::Ch3, speed, max),
            Motor::Right => set_pulse(&mut self.tim3, Channel::Ch1, speed, max),
        }
    }
}

// ── Flight I/O ────────────────────────────────────────────────────────────────

/// Everything the control loop touches besides the IMU.
pub struct BoardIo {
    pub motors: Motors,
    pub adc: Adc<'static, ADC1>,
    pub vsense_pin: PA2,
    pub heartbeat: Output<'static, AnyPin>,
    pub fault_led: Output<'static, AnyPin>,
    pub remote: Reader<'static, RemoteSample>,
    pub range: Reader<'static, RangeSample>,
    pub telemetry: TelemetrySender,
    pub tx_fault: &'static TxFault,
}

impl FlightIo for BoardIo {
    fn set_motor_speed(&mut self, motor: Motor, speed: f32) {
        self.motors.set_speed(motor, speed);
    }

    fn try_read_frame(&mut self) -> Result<Option<Frame>, IoError> {
        self.remote.try_read().transpose().map_err(IoError::Remote)
    }

    fn read_voltage_raw(&mut self) -> Result<u32, IoError> {
        Ok(self.adc.read(&mut self.vsense_pin) as u32)
    }

    fn distance_inches(&mut self) -> Result<f32, IoError> {
        self.range
            .latest()
            .map(lidar_lite::cm_to_inches)
            .map_err(IoError::Rangefinder)
    }

    fn send_telemetry(&mut self, line: &str) -> Result<(), IoError> {
        if let Some(e) = self.tx_fault.try_take() {
            return Err(IoError::Telemetry(e));
        }
        let mut owned = TelemetryLine::new();
        owned.push_str(line).map_err(|_| IoError::Telemetry(BusError::Overrun))?;
        self.telemetry
            .try_send(owned)
            .map_err(|_| IoError::Telemetry(BusError::Overrun))
    }

    fn set_fault_indicator(&mut self) {
        self.fault_led.set_high();
    }

    fn toggle_heartbeat(&mut self) {
        self.heartbeat.toggle();
    }
}
