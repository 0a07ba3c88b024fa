//! SHT1x soil humidity / temperature probe, bit-banged over two GPIOs.
//!
//! 14-bit temperature and 12-bit humidity, default resolution. Each reading
//! is two measurements of up to ~320 ms, well inside one controller tick.
//! The CRC byte is not requested.

#[cfg(feature = "gpio")]
use anyhow::{bail, ensure, Result};
#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, IoPin, Mode, OutputPin, PullUpDown};
#[cfg(feature = "gpio")]
use std::{
    thread,
    time::{Duration, Instant},
};

#[cfg(feature = "gpio")]
use crate::sensor::{Reading, Sensor};

// ── Conversion coefficients (datasheet, VDD 3.5 V, default resolution) ────

const D1: f32 = -39.7;
const D2: f32 = 0.01;

const C1: f32 = -2.0468;
const C2: f32 = 0.0367;
const C3: f32 = -1.5955e-6;

const T1: f32 = 0.01;
const T2: f32 = 0.00008;

// ── Commands ────────────────────────────────────────────────────────────────

#[cfg(feature = "gpio")]
const CMD_MEASURE_TEMPERATURE: u8 = 0b0000_0011;
#[cfg(feature = "gpio")]
const CMD_MEASURE_HUMIDITY: u8 = 0b0000_0101;

/// 14-bit conversion takes at most 320 ms.
#[cfg(feature = "gpio")]
const MEASUREMENT_TIMEOUT: Duration = Duration::from_millis(400);

#[cfg(feature = "gpio")]
const HALF_CLOCK: Duration = Duration::from_micros(5);

/// Raw 14-bit temperature word to degrees Celsius.
pub fn temperature_from_raw(raw: u16) -> f32 {
    D1 + D2 * f32::from(raw)
}

/// Raw 12-bit humidity word to temperature-compensated relative humidity,
/// clamped to 0..=100 %.
pub fn humidity_from_raw(raw: u16, temperature: f32) -> f32 {
    let so = f32::from(raw);
    let linear = C1 + C2 * so + C3 * so * so;
    let compensated = (temperature - 25.0) * (T1 + T2 * so) + linear;
    compensated.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Driver (requires rppal + Raspberry Pi hardware)
// ---------------------------------------------------------------------------

#[cfg(feature = "gpio")]
pub struct Sht1x {
    data: IoPin,
    clock: OutputPin,
}

#[cfg(feature = "gpio")]
impl Sht1x {
    pub fn new(data_pin: u8, clock_pin: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut data = gpio.get(data_pin)?.into_io(Mode::Output);
        data.set_pullupdown(PullUpDown::PullUp);
        data.set_high();
        let mut clock = gpio.get(clock_pin)?.into_output();
        clock.set_low();

        tracing::info!(data_pin, clock_pin, "sht1x initialised");
        Ok(Self { data, clock })
    }

    fn pause() {
        thread::sleep(HALF_CLOCK);
    }

    fn pulse(&mut self) {
        self.clock.set_high();
        Self::pause();
        self.clock.set_low();
        Self::pause();
    }

    /// Transmission start: DATA falls while SCK is high, then rises again
    /// during the next SCK high phase.
    fn start(&mut self) {
        self.data.set_mode(Mode::Output);
        self.data.set_high();
        self.clock.set_low();
        Self::pause();
        self.clock.set_high();
        Self::pause();
        self.data.set_low();
        Self::pause();
        self.clock.set_low();
        Self::pause();
        self.clock.set_high();
        Self::pause();
        self.data.set_high();
        Self::pause();
        self.clock.set_low();
        Self::pause();
    }

    fn write_command(&mut self, cmd: u8) -> Result<()> {
        self.data.set_mode(Mode::Output);
        for bit in (0..8).rev() {
            if (cmd >> bit) & 1 == 1 {
                self.data.set_high();
            } else {
                self.data.set_low();
            }
            self.pulse();
        }

        self.data.set_mode(Mode::Input);
        self.clock.set_high();
        Self::pause();
        let ack = self.data.is_low();
        self.clock.set_low();
        Self::pause();
        ensure!(ack, "sht1x: no ack for command {cmd:#04x}");
        Ok(())
    }

    fn wait_for_result(&mut self) -> Result<()> {
        let deadline = Instant::now() + MEASUREMENT_TIMEOUT;
        while self.data.is_high() {
            if Instant::now() >= deadline {
                bail!("sht1x: measurement timed out");
            }
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    fn read_byte(&mut self, ack: bool) -> u8 {
        self.data.set_mode(Mode::Input);
        let mut value = 0u8;
        for _ in 0..8 {
            self.clock.set_high();
            Self::pause();
            value = (value << 1) | u8::from(self.data.is_high());
            self.clock.set_low();
            Self::pause();
        }

        // ACK keeps the transfer going; leaving DATA high skips the CRC.
        self.data.set_mode(Mode::Output);
        if ack {
            self.data.set_low();
        } else {
            self.data.set_high();
        }
        self.pulse();
        self.data.set_mode(Mode::Input);
        value
    }

    fn measure(&mut self, cmd: u8) -> Result<u16> {
        self.start();
        self.write_command(cmd)?;
        self.wait_for_result()?;
        let hi = self.read_byte(true);
        let lo = self.read_byte(false);
        Ok(u16::from_be_bytes([hi, lo]))
    }
}

#[cfg(feature = "gpio")]
impl Sensor for Sht1x {
    fn read(&mut self) -> Result<Reading> {
        let raw_t = self.measure(CMD_MEASURE_TEMPERATURE)?;
        let temperature = temperature_from_raw(raw_t);
        let raw_rh = self.measure(CMD_MEASURE_HUMIDITY)?;
        Ok(Reading {
            humidity: humidity_from_raw(raw_rh, temperature),
            temperature,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
