//! Stateful soil probe simulator for running the controller without
//! hardware.
//!
//! Models:
//! - Temporal coherence via random walk with mean reversion
//! - Gradual drying drift (evaporation)
//! - Per-reading electronic noise
//! - Diurnal temperature cycle
//! - Closed-loop watering response (humidity rises while the valve is open)

use anyhow::Result;
use std::fmt;

use crate::sensor::{Reading, Sensor};

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Irwin-Hall approximation of N(0,1): sum of 12 uniform [0,1) minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Simulation profiles selectable via the `SIM_SCENARIO` env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Starts just above a typical threshold and dries out steadily on a
    /// warm day. Triggers automatic watering within the first hour.
    Drying,
    /// Hovers around 60 %, mild weather. Never triggers watering.
    Stable,
    /// Dry soil but near-freezing temperatures. Exercises the cold advisory.
    Cold,
    /// Wet soil, very slow drying.
    Wet,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stable" => Self::Stable,
            "cold" => Self::Cold,
            "wet" => Self::Wet,
            _ => Self::Drying,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drying => write!(f, "drying"),
            Self::Stable => write!(f, "stable"),
            Self::Cold => write!(f, "cold"),
            Self::Wet => write!(f, "wet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct SoilSim {
    /// "True" humidity percent. Evolves on every sample.
    humidity: f64,
    center: f64,

    drift_per_sample: f64,
    walk_sigma: f64,
    mean_reversion: f64,
    noise_sigma: f64,

    mean_temperature: f64,
    diurnal_amplitude: f64,
    diurnal_period_s: f64,

    watering: bool,
    wet_rate: f64,
}

impl SoilSim {
    /// `diurnal_period_s` sets the day/night cycle length: 600 for fast dev
    /// iteration, 86400 for real time.
    pub fn new(scenario: Scenario, diurnal_period_s: f64) -> Self {
        // (start %, centre %, drift/sample, walk sigma, reversion, mean temp C)
        let (start, center, drift, walk_sigma, mean_rev, mean_temp) = match scenario {
            Scenario::Drying => (58.0, 40.0, -0.15, 0.3, 0.01, 22.0),
            Scenario::Stable => (60.0, 60.0, 0.0, 0.2, 0.05, 18.0),
            Scenario::Cold => (35.0, 35.0, -0.05, 0.2, 0.05, 3.0),
            Scenario::Wet => (85.0, 80.0, -0.02, 0.2, 0.02, 15.0),
        };

        Self {
            humidity: start,
            center,
            drift_per_sample: drift,
            walk_sigma,
            mean_reversion: mean_rev,
            noise_sigma: 0.5,
            mean_temperature: mean_temp,
            diurnal_amplitude: 4.0,
            diurnal_period_s,
            watering: false,
            wet_rate: 2.5,
        }
    }

    /// Produce the next sample. Each call advances the internal state.
    pub fn sample(&mut self) -> Reading {
        let pull = self.mean_reversion * (self.center - self.humidity);
        let walk = gaussian(0.0, self.walk_sigma);
        let wet = if self.watering { self.wet_rate } else { 0.0 };

        self.humidity = (self.humidity + self.drift_per_sample + pull + walk + wet).clamp(0.0, 100.0);

        let now_s = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let phase = 2.0 * std::f64::consts::PI * now_s / self.diurnal_period_s;
        let temperature = self.mean_temperature + self.diurnal_amplitude * phase.sin();

        let humidity = (self.humidity + gaussian(0.0, self.noise_sigma)).clamp(0.0, 100.0);

        Reading {
            humidity: humidity as f32,
            temperature: (temperature + gaussian(0.0, 0.1)) as f32,
        }
    }
}

impl Sensor for SoilSim {
    fn read(&mut self) -> Result<Reading> {
        Ok(self.sample())
    }

    fn set_watering(&mut self, active: bool) {
        self.watering = active;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_humidity(sim: &mut SoilSim, n: usize) -> f64 {
        (0..n).map(|_| sim.sample().humidity as f64).sum::<f64>() / n as f64
    }

    #[test]
    fn readings_within_percent_range() {
        for scenario in [
            Scenario::Drying,
            Scenario::Stable,
            Scenario::Cold,
            Scenario::Wet,
        ] {
            let mut sim = SoilSim::new(scenario, 600.0);
            for _ in 0..500 {
                let r = sim.sample();
                assert!(
                    (0.0..=100.0).contains(&r.humidity),
                    "{scenario}: humidity out of range: {}",
                    r.humidity
                );
            }
        }
    }

    #[test]
    fn temporal_coherence() {
        let mut sim = SoilSim::new(Scenario::Stable, 600.0);
        let samples: Vec<f32> = (0..100).map(|_| sim.sample().humidity).collect();
        let max_jump = samples
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_jump < 10.0, "max consecutive jump too large: {max_jump}");
    }

    #[test]
    fn drying_scenario_trends_down() {
        let mut sim = SoilSim::new(Scenario::Drying, 600.0);
        let early = mean_humidity(&mut sim, 10);
        for _ in 0..200 {
            sim.sample();
        }
        let late = mean_humidity(&mut sim, 10);
        assert!(late < early, "expected drying: early={early:.1} late={late:.1}");
    }

    #[test]
    fn watering_raises_humidity() {
        let mut sim = SoilSim::new(Scenario::Drying, 600.0);
        for _ in 0..20 {
            sim.sample();
        }
        let before = mean_humidity(&mut sim, 20);

        sim.set_watering(true);
        for _ in 0..20 {
            sim.sample();
        }
        let after = mean_humidity(&mut sim, 20);

        assert!(
            after > before,
            "watering should raise humidity: before={before:.1} after={after:.1}"
        );
    }

    #[test]
    fn cold_scenario_stays_cold() {
        let mut sim = SoilSim::new(Scenario::Cold, 600.0);
        for _ in 0..50 {
            assert!(sim.sample().temperature < 10.0);
        }
    }

    #[test]
    fn read_never_fails() {
        let mut sim = SoilSim::new(Scenario::Wet, 600.0);
        assert!(sim.read().is_ok());
    }

    #[test]
    fn scenario_from_str_lossy() {
        assert_eq!(Scenario::from_str_lossy("drying"), Scenario::Drying);
        assert_eq!(Scenario::from_str_lossy("STABLE"), Scenario::Stable);
        assert_eq!(Scenario::from_str_lossy("Cold"), Scenario::Cold);
        assert_eq!(Scenario::from_str_lossy("wet"), Scenario::Wet);
        assert_eq!(Scenario::from_str_lossy("unknown"), Scenario::Drying);
        assert_eq!(Scenario::from_str_lossy(""), Scenario::Drying);
    }

    #[test]
    fn scenario_display() {
        assert_eq!(Scenario::Drying.to_string(), "drying");
        assert_eq!(Scenario::Stable.to_string(), "stable");
        assert_eq!(Scenario::Cold.to_string(), "cold");
        assert_eq!(Scenario::Wet.to_string(), "wet");
    }
}
