use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::controller::ControllerStatus;

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedState = Arc<RwLock<SystemState>>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

pub struct SystemState {
    pub started_at: Instant,
    pub mqtt_connected: bool,
    pub controller: Option<ControllerStatus>,
    pub events: VecDeque<SystemEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemEvent {
    /// Seconds since startup.
    pub uptime_secs: u64,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Valve,
    Advisory,
    Error,
    System,
}

impl EventKind {
    /// Classify a watering-log line by its event text.
    fn of_line(line: &str) -> Self {
        if line.contains("DRYNESS =") {
            EventKind::Reading
        } else if line.contains("VALVE") || line.contains("BYPASS") {
            EventKind::Valve
        } else if line.contains("TOO COLD")
            || line.contains("Daily limit")
            || line.contains("INVALID")
            || line.contains("UNREADABLE")
        {
            EventKind::Advisory
        } else {
            EventKind::System
        }
    }
}

// ---------------------------------------------------------------------------
// JSON response (what the API returns)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub mqtt_connected: bool,
    pub controller: Option<ControllerStatus>,
    /// Newest first.
    pub events: Vec<SystemEvent>,
}

// ---------------------------------------------------------------------------
// Construction & mutation
// ---------------------------------------------------------------------------

impl SystemState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            mqtt_connected: false,
            controller: None,
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Record the controller snapshot and the log lines written during the
    /// tick that produced it.
    pub fn record_tick(&mut self, status: ControllerStatus, lines: Vec<String>) {
        for line in lines {
            self.push_event(EventKind::of_line(&line), line);
        }
        self.controller = Some(status);
    }

    pub fn record_error(&mut self, detail: String) {
        self.push_event(EventKind::Error, detail);
    }

    pub fn record_system(&mut self, detail: String) {
        self.push_event(EventKind::System, detail);
    }

    /// Build the JSON-serialisable status snapshot.
    pub fn to_status(&self) -> StatusResponse {
        StatusResponse {
            uptime_secs: self.started_at.elapsed().as_secs(),
            mqtt_connected: self.mqtt_connected,
            controller: self.controller.clone(),
            events: self.events.iter().rev().cloned().collect(),
        }
    }

    fn push_event(&mut self, kind: EventKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(SystemEvent {
            uptime_secs: self.started_at.elapsed().as_secs(),
            kind,
            detail,
        });
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_log_lines() {
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 DRYNESS = 45 TEMP = 20"),
            EventKind::Reading
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 VALVE OPEN"),
            EventKind::Valve
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 BYPASS CANCEL"),
            EventKind::Valve
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 TOO COLD (5 C). Watering suspended"),
            EventKind::Advisory
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 DRYNESS THRESHOLD INVALID (\"0\"). Automatic watering disabled"),
            EventKind::Advisory
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 DRYNESS THRESHOLD UNREADABLE. Automatic watering disabled"),
            EventKind::Advisory
        );
        assert_eq!(
            EventKind::of_line("20240601 12:00:00 ARMED"),
            EventKind::System
        );
    }

    #[test]
    fn ring_buffer_keeps_newest() {
        let mut st = SystemState::new();
        for i in 0..(MAX_EVENTS + 5) {
            st.record_system(format!("event {i}"));
        }
        assert_eq!(st.events.len(), MAX_EVENTS);
        assert_eq!(st.events.front().unwrap().detail, "event 5");

        let status = st.to_status();
        assert_eq!(status.events[0].detail, format!("event {}", MAX_EVENTS + 4));
    }

    #[test]
    fn fresh_state_has_no_snapshot() {
        let status = SystemState::new().to_status();
        assert!(!status.mqtt_connected);
        assert!(status.controller.is_none());
        assert!(status.events.is_empty());
    }
}
