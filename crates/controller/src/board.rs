//! Digital I/O: valve relay, indicator LEDs and push-buttons. The `gpio`
//! feature gates the real rppal driver; without it, a mock board records
//! outputs and logs changes.

use anyhow::Result;

use crate::config::PinConfig;
use crate::controller::{ButtonLevels, Outputs};

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, InputPin, OutputPin};

// ---------------------------------------------------------------------------
// Real GPIO board (requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub(crate) struct Board {
    valve: OutputPin,
    armed_led: OutputPin,
    open_led: OutputPin,
    fault_led: OutputPin,
    arm_button: InputPin,
    bypass_button: InputPin,
    relay_active_low: bool,
    buttons_active_low: bool,
}

#[cfg(feature = "gpio")]
impl Board {
    pub(crate) fn new(pins: &PinConfig) -> Result<Self> {
        let gpio = Gpio::new()?;
        let output = |pin: i64| -> Result<OutputPin> { Ok(gpio.get(pin as u8)?.into_output_low()) };
        let input = |pin: i64| -> Result<InputPin> {
            let pin = gpio.get(pin as u8)?;
            Ok(if pins.buttons_active_low {
                pin.into_input_pullup()
            } else {
                pin.into_input_pulldown()
            })
        };

        // Fail-safe: the relay starts in its OFF level, no glitch on init.
        let valve = if pins.relay_active_low {
            gpio.get(pins.valve as u8)?.into_output_high()
        } else {
            gpio.get(pins.valve as u8)?.into_output_low()
        };

        let board = Self {
            valve,
            armed_led: output(pins.armed_led)?,
            open_led: output(pins.open_led)?,
            fault_led: output(pins.fault_led)?,
            arm_button: input(pins.arm_button)?,
            bypass_button: input(pins.bypass_button)?,
            relay_active_low: pins.relay_active_low,
            buttons_active_low: pins.buttons_active_low,
        };

        tracing::info!(valve = pins.valve, "gpio board initialised");
        Ok(board)
    }

    fn set_valve(&mut self, open: bool) {
        // active-low relay: LOW = ON, HIGH = OFF
        if open != self.relay_active_low {
            self.valve.set_high();
        } else {
            self.valve.set_low();
        }
    }

    fn set_led(pin: &mut OutputPin, on: bool) {
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }

    pub(crate) fn read_buttons(&self) -> ButtonLevels {
        let pressed = |pin: &InputPin| pin.is_low() == self.buttons_active_low;
        ButtonLevels {
            arm: pressed(&self.arm_button),
            bypass: pressed(&self.bypass_button),
        }
    }

    pub(crate) fn drive(&mut self, out: &Outputs) {
        self.set_valve(out.valve_open);
        Self::set_led(&mut self.armed_led, out.armed_led);
        Self::set_led(&mut self.open_led, out.open_led);
        Self::set_led(&mut self.fault_led, out.fault_led);
    }

    pub(crate) fn all_off(&mut self) {
        self.drive(&Outputs::default());
    }
}

// ---------------------------------------------------------------------------
// Mock board (no hardware, logs output changes)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub(crate) struct Board {
    pub(super) outputs: Outputs,
}

#[cfg(not(feature = "gpio"))]
impl Board {
    pub(crate) fn new(pins: &PinConfig) -> Result<Self> {
        tracing::info!(
            valve = pins.valve,
            arm_button = pins.arm_button,
            bypass_button = pins.bypass_button,
            "[mock-gpio] board initialised (no hardware)"
        );
        Ok(Self {
            outputs: Outputs::default(),
        })
    }

    /// The mock has no buttons; they always read released.
    pub(crate) fn read_buttons(&self) -> ButtonLevels {
        ButtonLevels::default()
    }

    pub(crate) fn drive(&mut self, out: &Outputs) {
        if *out != self.outputs {
            tracing::info!(
                valve = if out.valve_open { "ON" } else { "OFF" },
                armed = out.armed_led,
                open = out.open_led,
                fault = out.fault_led,
                "[mock-gpio] outputs changed"
            );
            self.outputs = *out;
        }
    }

    pub(crate) fn all_off(&mut self) {
        self.drive(&Outputs::default());
    }
}

// ===========================================================================
// Tests
// ===========================================================================
