#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use fryer_controller::config::FryerConfig;
use fryer_controller::fryer::{build_display, power_task, BoardShared};
use fryer_controller::inputs_rp2040::{button_task, encoder_task};
use fryer_controller::knob::Knob;
use fryer_controller::resources::*;
use fryer_controller::usb_interface::usb_task;
use fryer_controller::{split_resources, FryerShared, VERSION};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

static CONFIG: FryerConfig = FryerConfig::DEFAULT;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources!(p);
    info!("Fryer controller {}", VERSION);

    // Start at the bottom of the range.
    let knob = Knob::new(CONFIG.knob_min, CONFIG.knob_min, CONFIG.knob_max, CONFIG.knob_mode);
    static SHARED: StaticCell<BoardShared> = StaticCell::new();
    let shared: &'static BoardShared = SHARED.init(FryerShared::new(
        build_display(r.display),
        knob,
        CONFIG.setpoint_step,
    ));

    spawner.spawn(unwrap!(usb_task(spawner, r.usb, &shared.status)));
    spawner.spawn(unwrap!(button_task(r.button, &shared.buttons)));
    spawner.spawn(unwrap!(encoder_task(r.encoder, &shared.knob)));
    spawner.spawn(unwrap!(power_task(&CONFIG, shared, r.outputs, r.probe)));
}
