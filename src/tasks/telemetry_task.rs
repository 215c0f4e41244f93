use embassy_executor::task;
use embassy_stm32::peripherals::{DMA1_CH3, USART3};
use embassy_stm32::usart::UartTx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;

use quadfc::drivers::telemetry::TelemetryLine;

use crate::board::{uart_error, TxFault, TELEMETRY_QUEUE};

/// Telemetry task: drains queued lines onto USART3 TX. A failed write is
/// reported back through `fault`; the control loop treats it as fatal on
/// its next send.
#[task]
pub async fn telemetry_task(
    mut tx: UartTx<'static, USART3, DMA1_CH3>,
    lines: Receiver<'static, CriticalSectionRawMutex, TelemetryLine, TELEMETRY_QUEUE>,
    fault: &'static TxFault,
) {
    loop {
        let line = lines.receive().await;
        if let Err(e) = tx.write(line.as_bytes()).await {
            fault.signal(uart_error(e));
        }
    }
}
