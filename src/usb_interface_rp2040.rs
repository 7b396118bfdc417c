use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::rom_data::reset_to_usb_boot;

use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_usb_logger::ReceiverHandler;

use core::str;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::watch::Watch;

use crate::resources::UsbResources;
use crate::status::{to_json, FryerStatus};
use crate::STATUS_RECEIVERS;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

struct Handler;

impl ReceiverHandler for Handler {
    async fn handle_data(&self, data: &[u8]) {
        if let Ok(data) = str::from_utf8(data) {
            let data = data.trim();

            // elf2uf2-term sends this when the serial monitor closes
            if data == "q" || data == "elf2uf2-term" {
                reset_to_usb_boot(0, 0);
            } else {
                defmt::warn!("Unknown command: {}", data);
            }
        }
    }

    fn new() -> Self {
        Self
    }
}

#[embassy_executor::task]
async fn logger_task(driver: Driver<'static, USB>) {
    embassy_usb_logger::run!(1024, log::LevelFilter::Info, driver, Handler);
}

/// Starts the USB serial logger and mirrors every status change onto it
/// as one JSON line.
#[embassy_executor::task]
pub async fn usb_task(
    spawner: Spawner,
    r: UsbResources,
    status: &'static Watch<NoopRawMutex, FryerStatus, STATUS_RECEIVERS>,
) {
    let driver = Driver::new(r.usb, Irqs);
    spawner.spawn(defmt::unwrap!(logger_task(driver)));

    let Some(mut receiver) = status.receiver() else {
        defmt::error!("No status receiver left");
        return;
    };

    loop {
        let status = receiver.changed().await;
        match to_json(&status) {
            Ok(json) => log::info!("{}", json),
            Err(_) => defmt::warn!("Status does not fit the JSON buffer"),
        }
    }
}
