use anyhow::Result;
use serde::Serialize;

/// One soil sample. Values are passed through as read; plausibility is not
/// checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Relative humidity, percent.
    pub humidity: f32,
    /// Soil temperature, degrees Celsius.
    pub temperature: f32,
}

/// Soil moisture / temperature probe.
pub trait Sensor {
    fn read(&mut self) -> Result<Reading>;

    /// Told whenever the valve changes state. Real probes ignore it; the
    /// simulator uses it to close the loop.
    fn set_watering(&mut self, _active: bool) {}
}
