use embassy_executor::task;
use embassy_stm32::peripherals::{DMA1_CH1, USART3};
use embassy_stm32::usart::RingBufferedUartRx;

use quadfc::drivers::double_buffer::Writer;
use quadfc::drivers::remote::{FrameAssembler, RemoteSample};

use crate::board::uart_error;

/// Remote receive task. USART3 RX runs continuously into a DMA ring; every
/// completed six-byte frame is published for the control loop.
#[task]
pub async fn remote_task(
    mut rx: RingBufferedUartRx<'static, USART3, DMA1_CH1>,
    mut frames: Writer<'static, RemoteSample>,
) {
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; 32];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                if let Some(frame) = assembler.push_bytes(&buf[..n]) {
                    frames.write_done(Ok(frame));
                }
            }
            Err(e) => {
                assembler.reset();
                frames.write_done(Err(uart_error(e)));
            }
        }
    }
}
