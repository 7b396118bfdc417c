use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::watch::Watch;

use crate::log::*;
use crate::status::{to_json, FryerStatus};
use crate::STATUS_RECEIVERS;

/// Stands in for the USB serial link: every status change is logged as
/// one JSON line.
#[embassy_executor::task]
pub async fn usb_task(status: &'static Watch<NoopRawMutex, FryerStatus, STATUS_RECEIVERS>) {
    info!("Starting usb task");
    let Some(mut receiver) = status.receiver() else {
        error!("No status receiver left");
        return;
    };
    loop {
        let status = receiver.changed().await;
        match to_json(&status) {
            Ok(json) => info!("{}", json),
            Err(e) => warn!("Status not serialised: {:?}", e),
        }
    }
}
