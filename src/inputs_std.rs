use embassy_time::Timer;

use crate::inputs::ButtonEvents;
use crate::knob::Knob;
use crate::log::*;

/// What the simulated operator does, in order: wait, press, turn the knob,
/// let the session run, long press. Repeated `sessions` times.
#[derive(Debug, Clone, Copy)]
pub struct OperatorScript {
    pub press_after_ms: u64,
    /// Detents turned right after power-up; negative turns down.
    pub knob_detents: i32,
    pub session_ms: u64,
    pub sessions: u32,
}

impl Default for OperatorScript {
    fn default() -> Self {
        Self {
            press_after_ms: 1000,
            knob_detents: 0,
            session_ms: 60_000,
            sessions: 1,
        }
    }
}

#[embassy_executor::task]
pub async fn operator_task(
    script: OperatorScript,
    events: &'static ButtonEvents,
    knob: &'static Knob,
) {
    for session in 0..script.sessions {
        Timer::after_millis(script.press_after_ms).await;
        info!("Operator: press (session {})", session + 1);
        events.press.signal(());

        let direction = script.knob_detents.signum();
        for _ in 0..script.knob_detents.unsigned_abs() {
            Timer::after_millis(50).await;
            knob.step(direction);
        }

        Timer::after_millis(script.session_ms).await;
        info!("Operator: long press");
        events.long.signal(());
    }
    info!("Operator script finished");
}
