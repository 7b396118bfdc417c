//! Two multiplexed 3-digit seven-segment displays on shared segment lines.
//!
//! ```text
//!   A ->>  ---
//!         |   |
//!   F     |   |  B
//!   G ->>  ---
//!         |   |
//!   E     |   |  C
//!   D ->>  --- .  <<- DP
//! ```
//!
//! Only one digit is lit at a time. [`SevenSegmentDisplay::next_digit`]
//! must be called at a steady ~1 ms cadence so persistence of vision shows
//! all six digits. The SV display is common cathode (digit select active
//! low, segment lit high); the PV display is common anode, so both the
//! digit select and the segment levels are inverted.

use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt::Write as _;

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::Fault;

pub const DIGITS: usize = 3;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Segments: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const C = 1 << 2;
        const D = 1 << 3;
        const E = 1 << 4;
        const F = 1 << 5;
        const G = 1 << 6;
        const DP = 1 << 7;
    }
}

/// Bitmap for a character. Space and anything unknown are blank.
pub fn glyph(c: u8) -> Segments {
    let bits = match c {
        b'0' => 0x3f,
        b'1' => 0x06,
        b'2' => 0x5b,
        b'3' => 0x4f,
        b'4' => 0x66,
        b'5' => 0x6d,
        b'6' => 0x7d,
        b'7' => 0x07,
        b'8' => 0x7f,
        b'9' => 0x6f,
        b'l' => 0x30,
        b'o' => 0x5c,
        b'-' => 0x40,
        _ => 0x00,
    };
    Segments::from_bits_retain(bits)
}

/// Something that can be shown on a 3-digit display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Readout<'a> {
    Number(i32),
    Text(&'a str),
}

impl From<i32> for Readout<'_> {
    fn from(value: i32) -> Self {
        Readout::Number(value)
    }
}

impl From<u16> for Readout<'_> {
    fn from(value: u16) -> Self {
        Readout::Number(i32::from(value))
    }
}

impl<'a> From<&'a str> for Readout<'a> {
    fn from(value: &'a str) -> Self {
        Readout::Text(value)
    }
}

/// Exactly three ASCII characters, right justified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayText([u8; DIGITS]);

impl DisplayText {
    pub const BLANK: Self = Self([b' '; DIGITS]);

    pub fn new<'a>(value: impl Into<Readout<'a>>) -> Self {
        match value.into() {
            Readout::Number(n) => {
                let mut digits: String<DIGITS> = String::new();
                // 0..=999 always fits
                let _ = write!(digits, "{}", n.clamp(0, 999));
                Self::justify(digits.as_str())
            }
            Readout::Text(s) => Self::justify(s),
        }
    }

    /// Keeps the first three characters; shorter text is left padded.
    fn justify(s: &str) -> Self {
        let mut out = [b' '; DIGITS];
        let len = s.chars().count().min(DIGITS);
        let pad = DIGITS - len;
        for (slot, c) in out[pad..].iter_mut().zip(s.chars()) {
            *slot = if c.is_ascii() { c as u8 } else { b' ' };
        }
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; DIGITS] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored.
        core::str::from_utf8(&self.0).unwrap_or("   ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum Panel {
    /// Setpoint, small common-cathode display.
    Sv,
    /// Process value, large common-anode display.
    Pv,
}

impl Panel {
    fn other(self) -> Self {
        match self {
            Panel::Sv => Panel::Pv,
            Panel::Pv => Panel::Sv,
        }
    }

    fn digit_level(self, selected: bool) -> PinState {
        match self {
            Panel::Sv => PinState::from(!selected),
            Panel::Pv => PinState::from(selected),
        }
    }

    fn segment_level(self, lit: bool) -> PinState {
        match self {
            Panel::Sv => PinState::from(lit),
            Panel::Pv => PinState::from(!lit),
        }
    }
}

/// Which digit of which panel is strobed on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub panel: Panel,
    pub digit: usize,
}

impl Cursor {
    const START: Self = Self {
        panel: Panel::Sv,
        digit: 0,
    };

    fn advance(self) -> Self {
        if self.digit + 1 < DIGITS {
            Self {
                panel: self.panel,
                digit: self.digit + 1,
            }
        } else {
            Self {
                panel: self.panel.other(),
                digit: 0,
            }
        }
    }
}

pub struct DisplayPins<P> {
    /// A, B, C, D, E, F, G, DP
    pub segments: [P; 8],
    pub digits: [P; DIGITS],
    /// Shared common-pin enable; low blanks everything.
    pub enable: P,
}

pub struct SevenSegmentDisplay<P> {
    pins: DisplayPins<P>,
    sv: DisplayText,
    pv: DisplayText,
    cursor: Cursor,
}

fn drive<P: OutputPin>(pin: &mut P, state: PinState) -> Result<(), Fault> {
    pin.set_state(state).map_err(|_| Fault::OutputPin)
}

impl<P: OutputPin> SevenSegmentDisplay<P> {
    pub fn new(pins: DisplayPins<P>) -> Self {
        Self {
            pins,
            sv: DisplayText::BLANK,
            pv: DisplayText::BLANK,
            cursor: Cursor::START,
        }
    }

    pub fn set_sv<'a>(&mut self, value: impl Into<Readout<'a>>) {
        self.sv = DisplayText::new(value);
    }

    pub fn set_pv<'a>(&mut self, value: impl Into<Readout<'a>>) {
        self.pv = DisplayText::new(value);
    }

    pub fn sv(&self) -> DisplayText {
        self.sv
    }

    pub fn pv(&self) -> DisplayText {
        self.pv
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Strobe the digit under the cursor and move the cursor on.
    pub fn next_digit(&mut self) -> Result<(), Fault> {
        let Cursor { panel, digit } = self.cursor;
        self.cursor = self.cursor.advance();

        let text = match panel {
            Panel::Sv => &self.sv,
            Panel::Pv => &self.pv,
        };
        let bitmap = glyph(text.as_bytes()[digit]);
        if bitmap.is_empty() {
            // Nothing to light; skip the frame.
            return drive(&mut self.pins.enable, PinState::Low);
        }

        drive(&mut self.pins.enable, PinState::High)?;
        for (idx, pin) in self.pins.digits.iter_mut().enumerate() {
            drive(pin, panel.digit_level(idx == digit))?;
        }
        for (bit, pin) in self.pins.segments.iter_mut().enumerate() {
            let lit = bitmap.bits() & (1 << bit) != 0;
            drive(pin, panel.segment_level(lit))?;
        }
        Ok(())
    }

    /// Blank both displays regardless of the cursor.
    pub fn off(&mut self) -> Result<(), Fault> {
        drive(&mut self.pins.enable, PinState::Low)
    }
}

/// The display as shared between the refresh duty and its writers. Every
/// call locks for the duration of one synchronous update, so a buffer is
/// never observed half written.
pub struct SharedDisplay<P>(Mutex<NoopRawMutex, RefCell<SevenSegmentDisplay<P>>>);

impl<P: OutputPin> SharedDisplay<P> {
    pub fn new(display: SevenSegmentDisplay<P>) -> Self {
        Self(Mutex::new(RefCell::new(display)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut SevenSegmentDisplay<P>) -> R) -> R {
        self.0.lock(|d| f(&mut d.borrow_mut()))
    }

    pub fn set_sv<'a>(&self, value: impl Into<Readout<'a>>) {
        self.with(|d| d.set_sv(value));
    }

    pub fn set_pv<'a>(&self, value: impl Into<Readout<'a>>) {
        self.with(|d| d.set_pv(value));
    }

    pub fn sv(&self) -> DisplayText {
        self.with(|d| d.sv())
    }

    pub fn pv(&self) -> DisplayText {
        self.with(|d| d.pv())
    }

    pub fn next_digit(&self) -> Result<(), Fault> {
        self.with(|d| d.next_digit())
    }

    pub fn off(&self) -> Result<(), Fault> {
        self.with(|d| d.off())
    }
}

/// Display duty: strobe one digit per period until cancelled.
pub async fn refresh<P: OutputPin, D: DelayNs>(
    display: &SharedDisplay<P>,
    delay: &mut D,
    period_ms: u32,
) -> Result<Infallible, Fault> {
    loop {
        display.next_digit()?;
        delay.delay_ms(period_ms).await;
    }
}
