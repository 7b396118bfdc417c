//! Front-panel button events.
//!
//! The board tasks debounce the push button and raise `press` on a short
//! press and `long` once the button has been held past the long-press time.
//! Each signal holds at most one pending event.

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;

pub struct ButtonEvents {
    pub press: Signal<NoopRawMutex, ()>,
    pub long: Signal<NoopRawMutex, ()>,
}

impl ButtonEvents {
    pub const fn new() -> Self {
        Self {
            press: Signal::new(),
            long: Signal::new(),
        }
    }

    /// Drop events that arrived while they could not be acted on.
    pub fn clear(&self) {
        self.press.reset();
        self.long.reset();
    }
}

impl Default for ButtonEvents {
    fn default() -> Self {
        Self::new()
    }
}
