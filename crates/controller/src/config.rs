//! TOML deployment config: watering timings and limits, GPIO wiring and
//! storage paths. Every field has a default so an empty file is a valid
//! config for the simulator.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use time::UtcOffset;

use crate::button::DEBOUNCE_MS;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watering: WateringConfig,
    pub pins: PinConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WateringConfig {
    /// Scheduler tick period.
    pub tick_ms: u64,
    pub measurement_interval_sec: u32,
    pub cooldown_sec: u32,
    pub duration_sec: u32,
    pub daily_limit_sec: u32,
    /// Below this soil temperature automatic watering is skipped.
    pub min_temperature_c: f32,
    pub debounce_ms: u64,
    /// Local time offset from UTC, used for log stamps and the midnight
    /// budget reset.
    pub utc_offset_minutes: i32,
}

impl Default for WateringConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1_000,
            measurement_interval_sec: 60,
            cooldown_sec: 3_600,
            duration_sec: 180,
            daily_limit_sec: 900,
            min_temperature_c: 10.0,
            debounce_ms: DEBOUNCE_MS,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub valve: i64,
    pub armed_led: i64,
    pub open_led: i64,
    pub fault_led: i64,
    pub arm_button: i64,
    pub bypass_button: i64,
    pub sensor_data: i64,
    pub sensor_clock: i64,
    /// Many common relay boards are active-low.
    pub relay_active_low: bool,
    /// Buttons wired to ground with pull-ups read low when pressed.
    pub buttons_active_low: bool,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            valve: 17,
            armed_led: 22,
            open_led: 23,
            fault_led: 24,
            arm_button: 5,
            bypass_button: 6,
            sensor_data: 20,
            sensor_clock: 21,
            relay_active_low: true,
            buttons_active_low: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub log: PathBuf,
    pub threshold: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            log: PathBuf::from("water.txt"),
            threshold: PathBuf::from("threshold.txt"),
        }
    }
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
/// GPIO 28+ are not exposed on the standard header.
const VALID_GPIO_PINS: std::ops::RangeInclusive<i64> = 2..=27;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all entries. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_watering(&mut errors);
        self.validate_pins(&mut errors);
        self.validate_paths(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_watering(&self, errors: &mut Vec<String>) {
        let w = &self.watering;

        // ── Timing values (all must be positive) ────────────
        let positive: [(&str, u64); 6] = [
            ("tick_ms", w.tick_ms),
            ("measurement_interval_sec", w.measurement_interval_sec.into()),
            ("cooldown_sec", w.cooldown_sec.into()),
            ("duration_sec", w.duration_sec.into()),
            ("daily_limit_sec", w.daily_limit_sec.into()),
            ("debounce_ms", w.debounce_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                errors.push(format!("watering: {name} must be positive"));
            }
        }

        // A single watering cannot exceed the daily maximum.
        if w.duration_sec > 0 && w.daily_limit_sec > 0 && w.duration_sec > w.daily_limit_sec {
            errors.push(format!(
                "watering: duration_sec ({}) exceeds daily_limit_sec ({})",
                w.duration_sec, w.daily_limit_sec
            ));
        }

        // The close deadline is only checked once per tick.
        if w.tick_ms > 0 && w.tick_ms > u64::from(w.measurement_interval_sec) * 1_000 {
            errors.push(format!(
                "watering: tick_ms ({}) is longer than measurement_interval_sec ({})",
                w.tick_ms, w.measurement_interval_sec
            ));
        }

        if w.debounce_ms > 0 && w.tick_ms > 0 && w.debounce_ms > w.tick_ms * 10 {
            errors.push(format!(
                "watering: debounce_ms ({}) spans more than ten ticks of {} ms",
                w.debounce_ms, w.tick_ms
            ));
        }

        if !w.min_temperature_c.is_finite() {
            errors.push("watering: min_temperature_c must be a finite number".to_string());
        }

        if self.local_offset().is_err() {
            errors.push(format!(
                "watering: utc_offset_minutes {} out of range",
                w.utc_offset_minutes
            ));
        }
    }

    fn validate_pins(&self, errors: &mut Vec<String>) {
        let mut seen: HashSet<i64> = HashSet::new();

        for (name, pin) in self.pins.named() {
            if !VALID_GPIO_PINS.contains(&pin) {
                errors.push(format!(
                    "pins: {name} {pin} is not a valid BCM GPIO pin (allowed: 2-27)"
                ));
            } else if !seen.insert(pin) {
                errors.push(format!("pins: {name} {pin} is already used by another pin"));
            }
        }
    }

    fn validate_paths(&self, errors: &mut Vec<String>) {
        if self.paths.log.as_os_str().is_empty() {
            errors.push("paths: log is empty".to_string());
        }
        if self.paths.threshold.as_os_str().is_empty() {
            errors.push("paths: threshold is empty".to_string());
        }
    }

    pub fn local_offset(&self) -> Result<UtcOffset> {
        UtcOffset::from_whole_seconds(self.watering.utc_offset_minutes.saturating_mul(60))
            .context("invalid utc offset")
    }
}

impl PinConfig {
    fn named(&self) -> [(&'static str, i64); 8] {
        [
            ("valve", self.valve),
            ("armed_led", self.armed_led),
            ("open_led", self.open_led),
            ("fault_led", self.fault_led),
            ("arm_button", self.arm_button),
            ("bypass_button", self.bypass_button),
            ("sensor_data", self.sensor_data),
            ("sensor_clock", self.sensor_clock),
        ]
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.
pub fn load(path: &str) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
