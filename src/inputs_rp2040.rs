use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Ticker, Timer};

use crate::inputs::ButtonEvents;
use crate::knob::{Knob, Quadrature};
use crate::resources::{ButtonResources, EncoderResources};

const DEBOUNCE_MS: u64 = 20;
const LONG_PRESS_MS: u64 = 1000;
const ENCODER_POLL_MS: u64 = 1;

/// Knob push button, active low. `press` fires as the button goes down,
/// `long` once it has been held for [`LONG_PRESS_MS`].
#[embassy_executor::task]
pub async fn button_task(r: ButtonResources, events: &'static ButtonEvents) -> ! {
    let mut button = Input::new(r.pin, Pull::Up);
    loop {
        button.wait_for_falling_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        if button.is_high() {
            continue;
        }
        debug!("Button pressed");
        events.press.signal(());

        match select(
            button.wait_for_high(),
            Timer::after_millis(LONG_PRESS_MS - DEBOUNCE_MS),
        )
        .await
        {
            Either::First(()) => {}
            Either::Second(()) => {
                debug!("Button long press");
                events.long.signal(());
                button.wait_for_high().await;
            }
        }
        Timer::after_millis(DEBOUNCE_MS).await;
    }
}

#[embassy_executor::task]
pub async fn encoder_task(r: EncoderResources, knob: &'static Knob) -> ! {
    let clk = Input::new(r.clk, Pull::Up);
    let dt = Input::new(r.dt, Pull::Up);
    let mut decoder = Quadrature::new(clk.is_high(), dt.is_high());
    let mut ticker = Ticker::every(Duration::from_millis(ENCODER_POLL_MS));
    loop {
        if let Some(delta) = decoder.update(clk.is_high(), dt.is_high()) {
            let position = knob.step(delta);
            trace!("Knob at {}", position);
        }
        ticker.next().await;
    }
}
