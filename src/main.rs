#![no_std]
#![no_main]

mod board;
mod tasks;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Level, Output, OutputType, Pin, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::CountingMode;
use embassy_stm32::usart::{Config as UsartConfig, DataBits, Parity, StopBits, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use quadfc::config::FlightConfig;
use quadfc::drivers::double_buffer::DoubleBuffer;
use quadfc::drivers::imu::{AttitudeEstimator, EstimatorConfig};
use quadfc::drivers::lidar_lite::RangeSample;
use quadfc::drivers::motor::PWM_FREQUENCY_HZ;
use quadfc::drivers::remote::{self, RemoteSample};
use quadfc::drivers::telemetry::TelemetryLine;
use quadfc::drivers::{l3gd20h, lsm303d};
use quadfc::error::{FatalError, InitError};
use quadfc::flight::{fail_stop, FlightController};
use quadfc::io::{BufferedImu, FlightIo};
use quadfc::state::{SensorSample, EMPTY_SAMPLE};

use crate::board::{park, Board, BoardIo, Motors, SensorBus, TxFault, TELEMETRY_QUEUE};
use crate::tasks::control_loop::control_loop;
use crate::tasks::remote_task::remote_task;
use crate::tasks::sensor_task::sensor_task;
use crate::tasks::telemetry_task::telemetry_task;

// ── Shared buffers ────────────────────────────────────────────────────────────
//  Single writer (interrupt executor) / single reader (control loop) each.
static GYRO_BUF:   StaticCell<DoubleBuffer<SensorSample>> = StaticCell::new();
static ACCEL_BUF:  StaticCell<DoubleBuffer<SensorSample>> = StaticCell::new();
static RANGE_BUF:  StaticCell<DoubleBuffer<RangeSample>>  = StaticCell::new();
static REMOTE_BUF: StaticCell<DoubleBuffer<RemoteSample>> = StaticCell::new();
static REMOTE_DMA: StaticCell<[u8; 64]> = StaticCell::new();

// ── Telemetry ─────────────────────────────────────────────────────────────────
static TELEMETRY_CHAN: Channel<CriticalSectionRawMutex, TelemetryLine, TELEMETRY_QUEUE> = Channel::new();
static TX_FAULT: TxFault = Signal::new();

// ── Interrupt bindings ────────────────────────────────────────────────────────
bind_interrupts!(struct Irqs {
    I2C1_EV  => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER  => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
    USART3   => embassy_stm32::usart::InterruptHandler<peripherals::USART3>;
});

/// Starts an executor on a spare interrupt vector; tasks spawned on it
/// preempt the thread-mode executor.
macro_rules! interrupt_executor {
    ($interrupt:ident, $prio:ident) => {{
        use embassy_executor::InterruptExecutor;
        use embassy_stm32::interrupt;
        use embassy_stm32::interrupt::{InterruptExt, Priority};

        interrupt::$interrupt.set_priority(Priority::$prio);
        static EXECUTOR: InterruptExecutor = InterruptExecutor::new();
        let spawner = EXECUTOR.start(interrupt::$interrupt);

        #[interrupt]
        #[allow(non_snake_case)]
        unsafe fn $interrupt() {
            EXECUTOR.on_interrupt()
        }

        spawner
    }};
}

async fn halt(io: &mut BoardIo, err: InitError) -> ! {
    fail_stop(io, &FatalError::from(err));
    park().await
}

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;
    let config = FlightConfig::default();
    let estimator_config = EstimatorConfig::default();

    // 2. ESC outputs @ 50 Hz, held at the zero-speed pulse from here on
    let tim3 = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new_ch1(p.PC6, OutputType::PushPull)),
        None,
        Some(PwmPin::new_ch3(p.PC8, OutputType::PushPull)),
        None,
        TimeHertz(PWM_FREQUENCY_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let tim4 = SimplePwm::new(
        p.TIM4,
        Some(PwmPin::new_ch1(p.PD12, OutputType::PushPull)),
        None,
        Some(PwmPin::new_ch3(p.PD14, OutputType::PushPull)),
        None,
        TimeHertz(PWM_FREQUENCY_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let motors = Motors::new(tim3, tim4, config.max_speed);

    // 3. Double buffers
    let (gyro_tx, gyro_rx) = GYRO_BUF.init(DoubleBuffer::new(EMPTY_SAMPLE)).split();
    let (accel_tx, accel_rx) = ACCEL_BUF.init(DoubleBuffer::new(EMPTY_SAMPLE)).split();
    let (range_tx, range_rx) = RANGE_BUF.init(DoubleBuffer::new(Ok(0))).split();
    let (remote_tx, remote_rx) = REMOTE_BUF.init(DoubleBuffer::new(Ok([0; remote::FRAME_LEN]))).split();

    // 4. Board I/O: LEDs (PD13 running light, PD15 fault), VSENSE on PA2
    let mut io = BoardIo {
        motors,
        adc: Adc::new(p.ADC1, &mut Delay),
        vsense_pin: p.PA2,
        heartbeat: Output::new(p.PD13.degrade(), Level::Low, Speed::Low),
        fault_led: Output::new(p.PD15.degrade(), Level::Low, Speed::Low),
        remote: remote_rx,
        range: range_rx,
        telemetry: TELEMETRY_CHAN.sender(),
        tx_fault: &TX_FAULT,
    };

    if let Err(e) = config.validate().and_then(|_| estimator_config.validate()) {
        halt(&mut io, e.into()).await;
    }

    // 5. Radio USART3 @ 57600 8E1 (TX=PB10, RX=PB11)
    let mut uart_config = UsartConfig::default();
    uart_config.baudrate = remote::BAUDRATE;
    uart_config.data_bits = DataBits::DataBits9;
    uart_config.parity = Parity::ParityEven;
    uart_config.stop_bits = StopBits::STOP1;
    let uart = match Uart::new(
        p.USART3, p.PB11, p.PB10,
        Irqs,
        p.DMA1_CH3, p.DMA1_CH1,
        uart_config,
    ) {
        Ok(uart) => uart,
        Err(_) => halt(&mut io, InitError::Telemetry).await,
    };
    let (uart_tx, uart_rx) = uart.split();
    let uart_rx = uart_rx.into_ring_buffered(REMOTE_DMA.init([0; 64]));
    spawner.spawn(telemetry_task(uart_tx, TELEMETRY_CHAN.receiver(), &TX_FAULT)).unwrap();
    let _ = io.send_telemetry("quadfc ready\n");

    // 6. I2C1 @ 400 kHz: gyro, accelerometer, rangefinder (SCL=PB8, SDA=PB9)
    let i2c = I2c::new(
        p.I2C1,
        p.PB8, p.PB9,
        Irqs,
        p.DMA1_CH7,
        p.DMA1_CH0,
        TimeHertz(400_000),
        Default::default(),
    );
    let mut bus = SensorBus::new(i2c);
    if let Err(e) = l3gd20h::configure(&mut bus, &estimator_config.gyro).await {
        halt(&mut io, InitError::Gyro(e)).await;
    }
    if let Err(e) = lsm303d::configure(&mut bus, &estimator_config.accel).await {
        halt(&mut io, InitError::Accel(e)).await;
    }
    info!("sensors configured");

    // 7. Completion side: sensor and radio tasks preempt the control loop
    let high = interrupt_executor!(UART4, P6);
    high.spawn(sensor_task(bus, gyro_tx, accel_tx, range_tx)).unwrap();
    high.spawn(remote_task(uart_rx, remote_tx)).unwrap();

    // 8. Control loop
    let fc = match AttitudeEstimator::new(BufferedImu::new(gyro_rx, accel_rx), estimator_config)
        .and_then(|estimator| FlightController::new(estimator, io, config))
    {
        Ok(fc) => fc,
        Err(e) => {
            error!("configuration rejected: {}", e);
            park().await
        }
    };
    spawner.spawn(control_loop(fc)).unwrap();
}
