use embassy_rp::adc::{self, Adc, Channel, InterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::Pull;

use crate::log::*;
use crate::resources::ProbeResources;
use crate::temperature_sensor::ProbeAdc;
use crate::Fault;

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => InterruptHandler;
});

/// Thermistor probe on the RP2040 ADC.
pub struct RpProbe {
    adc: Adc<'static, adc::Async>,
    channel: Channel<'static>,
}

impl RpProbe {
    pub fn new(r: ProbeResources) -> Self {
        Self {
            adc: Adc::new(r.adc, Irqs, adc::Config::default()),
            channel: Channel::new_pin(r.pin, Pull::None),
        }
    }
}

impl ProbeAdc for RpProbe {
    async fn read_raw(&mut self) -> Result<u16, Fault> {
        match self.adc.read(&mut self.channel).await {
            // 12-bit conversion stretched to the full 16-bit range.
            Ok(sample) => Ok((sample << 4) | (sample >> 8)),
            Err(e) => {
                warn!("ADC read failed: {}", Debug2Format(&e));
                Err(Fault::ProbeRead)
            }
        }
    }
}
