//! Rotary knob state and the setpoint handler duty.
//!
//! The board's encoder task runs pin levels through [`Quadrature`] and calls
//! [`Knob::step`]; the knob keeps the position inside its configured range
//! and raises `changed`.
//! [`knob_handler`] consumes that notification and rescales the position
//! into a setpoint.

use core::cell::Cell;
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;
use serde::Deserialize;

use crate::display::SharedDisplay;
use crate::log::*;
use crate::Setpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum RangeMode {
    /// Stops at either end.
    Bounded,
    /// Rolls over from max to min and back.
    Wrap,
}

pub struct Knob {
    position: Mutex<NoopRawMutex, Cell<i32>>,
    min: i32,
    max: i32,
    mode: RangeMode,
    /// Raised on every position change. Level triggered: stays set until a
    /// waiter takes it, so a change made while nobody waits is not lost and
    /// is seen exactly once.
    pub changed: Signal<NoopRawMutex, ()>,
}

impl Knob {
    pub fn new(initial: i32, min: i32, max: i32, mode: RangeMode) -> Self {
        Self {
            position: Mutex::new(Cell::new(initial.clamp(min, max))),
            min,
            max,
            mode,
            changed: Signal::new(),
        }
    }

    pub fn position(&self) -> i32 {
        self.position.lock(|p| p.get())
    }

    /// Setpoint for the current position.
    pub fn setpoint(&self, step: u16) -> u16 {
        let scaled = self.position().saturating_mul(i32::from(step));
        scaled.clamp(0, i32::from(u16::MAX)) as u16
    }

    /// Move by `delta` detents. Returns the new position.
    pub fn step(&self, delta: i32) -> i32 {
        let span = self.max - self.min + 1;
        let new = self.position.lock(|p| {
            let target = p.get() + delta;
            let new = match self.mode {
                RangeMode::Bounded => target.clamp(self.min, self.max),
                RangeMode::Wrap => self.min + (target - self.min).rem_euclid(span),
            };
            let old = p.replace(new);
            (old != new).then_some(new)
        });
        match new {
            Some(position) => {
                self.changed.signal(());
                position
            }
            None => self.position(),
        }
    }
}

// Indexed by (previous << 2) | current, each state being (a << 1) | b.
const QUADRATURE_STEPS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];
const TRANSITIONS_PER_DETENT: i8 = 4;

/// Gray code decoder for a two-channel encoder, one count per detent.
/// Invalid jumps (both channels changing at once) are ignored.
#[derive(Debug, Clone, Copy)]
pub struct Quadrature {
    state: u8,
    partial: i8,
}

impl Quadrature {
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            state: Self::encode(a, b),
            partial: 0,
        }
    }

    fn encode(a: bool, b: bool) -> u8 {
        (u8::from(a) << 1) | u8::from(b)
    }

    /// Feed the current channel levels; returns a whole detent when one
    /// completes.
    pub fn update(&mut self, a: bool, b: bool) -> Option<i32> {
        let current = Self::encode(a, b);
        if current == self.state {
            return None;
        }
        let index = usize::from((self.state << 2) | current);
        self.state = current;
        self.partial += QUADRATURE_STEPS[index];
        if self.partial >= TRANSITIONS_PER_DETENT {
            self.partial = 0;
            Some(1)
        } else if self.partial <= -TRANSITIONS_PER_DETENT {
            self.partial = 0;
            Some(-1)
        } else {
            None
        }
    }
}

/// Knob duty: rescale every position change into the shared setpoint and
/// the SV display. Runs until cancelled.
pub async fn knob_handler<P: OutputPin>(
    knob: &Knob,
    setpoint: &Setpoint,
    display: &SharedDisplay<P>,
    step: u16,
) -> Infallible {
    let mut last = setpoint.get();
    loop {
        // `wait` takes the notification, clearing it for the next round.
        knob.changed.wait().await;
        let new = knob.setpoint(step);
        if new != last {
            last = new;
            setpoint.set(new);
            display.set_sv(new);
            debug!("Setpoint changed to {}", new);
        }
    }
}
