use std::path::PathBuf;
use std::process;

use clap::Parser;
use embassy_executor::Spawner;
use fryer_controller::config::FryerConfig;
use fryer_controller::fryer::{build_display, power_task, SimShared};
use fryer_controller::inputs_std::{operator_task, OperatorScript};
use fryer_controller::knob::Knob;
use fryer_controller::usb_interface::usb_task;
use fryer_controller::{FryerShared, VERSION};
use log::*;
use static_cell::StaticCell;

/// Deep fryer controller running against a simulated oil bath.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// JSON document overriding any of the default settings
    #[clap(long)]
    config: Option<PathBuf>,
    /// Knob position at startup; the setpoint is this times the setpoint step
    #[clap(long, default_value_t = 70)]
    knob: i32,
    /// Detents to turn the knob after each power-up
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    turn: i32,
    /// Seconds each ON session runs before the long press
    #[clap(long, default_value_t = 300)]
    session_secs: u64,
    #[clap(long, default_value_t = 1)]
    sessions: u32,
    /// Simulated seconds per real second
    #[clap(long, default_value_t = 10.0)]
    time_scale: f32,
}

fn load_config(path: Option<&PathBuf>) -> FryerConfig {
    let Some(path) = path else {
        return FryerConfig::DEFAULT;
    };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!("Cannot read {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    match FryerConfig::from_json(&text) {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    info!("Fryer simulator {}", VERSION);

    static CONFIG: StaticCell<FryerConfig> = StaticCell::new();
    let config: &'static FryerConfig = CONFIG.init(load_config(args.config.as_ref()));

    let knob = Knob::new(args.knob, config.knob_min, config.knob_max, config.knob_mode);
    static SHARED: StaticCell<SimShared> = StaticCell::new();
    let shared: &'static SimShared =
        SHARED.init(FryerShared::new(build_display(), knob, config.setpoint_step));

    let script = OperatorScript {
        knob_detents: args.turn,
        session_ms: args.session_secs * 1000,
        sessions: args.sessions,
        ..OperatorScript::default()
    };

    spawner.spawn(usb_task(&shared.status).unwrap());
    spawner.spawn(power_task(config, shared, args.time_scale).unwrap());
    spawner.spawn(operator_task(script, &shared.buttons, &shared.knob).unwrap());
}
