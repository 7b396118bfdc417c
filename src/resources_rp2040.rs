use assign_resources::assign_resources;
use embassy_rp::peripherals;
use embassy_rp::Peri;

assign_resources! {
    display: DisplayResources {
        seg_a: PIN_21,
        seg_b: PIN_26,
        seg_c: PIN_17,
        seg_d: PIN_19,
        seg_e: PIN_20,
        seg_f: PIN_22,
        seg_g: PIN_16,
        seg_dp: PIN_18,
        digit_0: PIN_13,
        digit_1: PIN_14,
        digit_2: PIN_15,
        enable: PIN_12,
    },
    outputs: OutputResources {
        relay_pwm: PWM_SLICE3,
        relay: PIN_6,
        beeper_pwm: PWM_SLICE2,
        beeper: PIN_4,
        led_orange: PIN_10,
        led_blue: PIN_11,
    },
    probe: ProbeResources {
        adc: ADC,
        pin: PIN_28,
    },
    button: ButtonResources {
        pin: PIN_9,
    },
    encoder: EncoderResources {
        clk: PIN_7,
        dt: PIN_8,
    },
    usb: UsbResources {
        usb: USB,
    },
}
