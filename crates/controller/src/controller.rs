//! Watering decision-and-timing state machine.
//!
//! One [`Controller::tick`] per scheduler period, never blocking. The valve is
//! closed by the auto-close gate expiring on a later tick, not by sleeping.
//!
//! ## Valve states
//!
//! ```text
//!            bypass press (bypass false→true)
//!   ┌──────────────────────────────────────────────┐
//!   │                                              ▼
//! Closed ──[armed, cooldown due, warm, budget, dry]──▶ Open(Auto)
//!   ▲                                              │
//!   └──────[close gate due | bypass press (cancel)]┘
//! ```
//!
//! ## Tick order
//!
//! 1. buttons (bypass, then arm)
//! 2. daily budget rollover
//! 3. measurement gate: read, log if an hour boundary passed since the last
//!    logged reading, publish, decide
//! 4. close check
//! 5. remember the minute for the next tick's wrap-around check

use serde::Serialize;
use time::PrimitiveDateTime;
use tracing::{debug, error, info, warn};

use crate::budget::DailyBudget;
use crate::button::{DebouncedButton, Edge};
use crate::clock::{stamp, Clock};
use crate::config::WateringConfig;
use crate::gate::{TimeGate, TimeGates};
use crate::sensor::{Reading, Sensor};
use crate::sink::LogSink;
use crate::telemetry::Telemetry;
use crate::threshold::DrynessThreshold;

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Auto,
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ValveState {
    Closed,
    /// The origin only changes how a bypass press is logged while open.
    Open { origin: Origin },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmState {
    Armed,
    Disarmed,
}

/// Reason the fault indicator was latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    ConfigInvalid,
    StorageUnavailable,
    SensorUnavailable,
    TelemetryFailed,
}

/// Logical button levels for one tick, polarity already resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonLevels {
    pub arm: bool,
    pub bypass: bool,
}

/// Pin levels the board should drive after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outputs {
    pub valve_open: bool,
    pub armed_led: bool,
    pub open_led: bool,
    pub fault_led: bool,
}

/// Read-only snapshot for the status API.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub valve: ValveState,
    pub arm: ArmState,
    pub bypass: bool,
    pub threshold: DrynessThreshold,
    pub consumed_sec: u32,
    pub daily_limit_sec: u32,
    pub last_reading: Option<Reading>,
    pub next_measurement_at: Option<String>,
    pub next_activation_at: Option<String>,
    pub valve_close_at: Option<String>,
    pub fault: Option<Fault>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller<C, S, L, T> {
    settings: WateringConfig,
    threshold: DrynessThreshold,

    clock: C,
    sensor: S,
    log: L,
    telemetry: T,

    arm_button: DebouncedButton,
    bypass_button: DebouncedButton,

    valve: ValveState,
    arm: ArmState,
    bypass: bool,
    gates: TimeGates,
    budget: DailyBudget,

    /// Minute of the previous tick, for the reading-log throttle.
    prev_minute: u8,
    /// Set when the minute wrapped between two ticks; consumed by the next
    /// successful reading.
    pending_hourly_log: bool,
    last_reading: Option<Reading>,
    fault: Option<Fault>,
}

impl<C, S, L, T> Controller<C, S, L, T>
where
    C: Clock,
    S: Sensor,
    L: LogSink,
    T: Telemetry,
{
    /// Build the controller in its initial state (closed, armed, no bypass,
    /// every gate due) and log the startup line. A threshold that is
    /// unconfigured or unreadable is logged once here and latches the fault
    /// indicator.
    pub fn new(
        settings: WateringConfig,
        threshold: DrynessThreshold,
        clock: C,
        sensor: S,
        log: L,
        telemetry: T,
    ) -> Self {
        let debounce_ms = settings.debounce_ms;
        let mut ctl = Self {
            settings,
            threshold,
            clock,
            sensor,
            log,
            telemetry,
            arm_button: DebouncedButton::new(debounce_ms),
            bypass_button: DebouncedButton::new(debounce_ms),
            valve: ValveState::Closed,
            arm: ArmState::Armed,
            bypass: false,
            gates: TimeGates::default(),
            budget: DailyBudget::new(),
            prev_minute: 0,
            pending_hourly_log: false,
            last_reading: None,
            fault: None,
        };

        let now = ctl.clock.now();
        info!(threshold = %ctl.threshold, "controller started");
        ctl.write_log(now, &format!("CONTROLLER STARTED. Dryness threshold {}", ctl.threshold));

        match ctl.threshold.clone() {
            DrynessThreshold::Configured { .. } => {}
            DrynessThreshold::Unconfigured { raw } => {
                let line =
                    format!("DRYNESS THRESHOLD INVALID ({raw:?}). Automatic watering disabled");
                ctl.raise(Fault::ConfigInvalid, &line);
                ctl.write_log(now, &line);
            }
            DrynessThreshold::Unreadable { reason } => {
                ctl.raise(Fault::StorageUnavailable, &reason);
                ctl.write_log(now, "DRYNESS THRESHOLD UNREADABLE. Automatic watering disabled");
            }
        }

        ctl
    }

    /// Run one scheduler period and return the pin levels to drive.
    pub fn tick(&mut self, buttons: ButtonLevels) -> Outputs {
        let now = self.clock.now();
        let now_ms = self.clock.monotonic_ms();

        self.process_buttons(buttons, now, now_ms);

        if self.budget.observe(now.day()) {
            info!(day = now.day(), "daily budget reset");
            self.write_log(now, "NEW DAY. Water budget reset");
        }

        if self.prev_minute > now.minute() {
            self.pending_hourly_log = true;
        }
        if self.gates.next_measurement_at.is_due(now) {
            self.measure(now);
        }

        self.close_check(now);

        self.prev_minute = now.minute();
        self.outputs()
    }

    // -- Step 1: buttons ----------------------------------------------------

    fn process_buttons(&mut self, buttons: ButtonLevels, now: PrimitiveDateTime, now_ms: u64) {
        if self.bypass_button.poll(buttons.bypass, now_ms) == Edge::Pressed {
            self.on_bypass_press(now);
        }
        if self.arm_button.poll(buttons.arm, now_ms) == Edge::Pressed {
            self.on_arm_press(now);
        }
    }

    fn on_bypass_press(&mut self, now: PrimitiveDateTime) {
        match self.valve {
            ValveState::Open { origin } => {
                // Cancel: close on this tick's close check.
                info!(?origin, "bypass press while open, cancelling");
                self.gates.valve_close_at.force(now);
                self.write_log(now, "BYPASS CANCEL");
            }
            ValveState::Closed => {
                self.bypass = !self.bypass;
                if self.bypass {
                    self.open_valve(now, Origin::Bypass);
                    // Opening by hand re-arms automatic watering.
                    self.arm = ArmState::Armed;
                    self.budget.consume(self.settings.duration_sec);
                    self.write_log(now, "VALVE OPEN (BYPASS)");
                }
            }
        }
    }

    fn on_arm_press(&mut self, now: PrimitiveDateTime) {
        self.arm = match self.arm {
            ArmState::Armed => ArmState::Disarmed,
            ArmState::Disarmed => ArmState::Armed,
        };
        info!(arm = ?self.arm, "arm toggled");
        let line = match self.arm {
            ArmState::Armed => "ARMED",
            ArmState::Disarmed => "DISARMED",
        };
        self.write_log(now, line);
    }

    // -- Step 3: measurement ------------------------------------------------

    fn measure(&mut self, now: PrimitiveDateTime) {
        match self.sensor.read() {
            Ok(reading) => {
                self.last_reading = Some(reading);
                let wrapped = std::mem::take(&mut self.pending_hourly_log);
                debug!(
                    humidity = reading.humidity,
                    temperature = reading.temperature,
                    "reading"
                );

                if wrapped {
                    self.write_log(
                        now,
                        &format!(
                            "DRYNESS = {} TEMP = {}",
                            reading.humidity as i32, reading.temperature as i32
                        ),
                    );
                }

                if let Err(e) = self.telemetry.publish(&reading) {
                    self.raise(Fault::TelemetryFailed, &format!("{e:#}"));
                }

                if reading.temperature < self.settings.min_temperature_c {
                    if wrapped {
                        self.write_log(
                            now,
                            &format!(
                                "TOO COLD ({} C). Watering suspended",
                                reading.temperature as i32
                            ),
                        );
                    }
                } else if self.activation_permitted(now, &reading) {
                    self.open_valve(now, Origin::Auto);
                    self.gates
                        .next_activation_at
                        .arm(now, self.settings.cooldown_sec);
                    self.budget.consume(self.settings.duration_sec);
                    info!(
                        humidity = reading.humidity,
                        threshold = %self.threshold,
                        consumed_sec = self.budget.consumed_seconds(),
                        "automatic watering started"
                    );
                    self.write_log(now, "VALVE OPEN");
                }
            }
            Err(e) => {
                self.raise(Fault::SensorUnavailable, &format!("{e:#}"));
            }
        }

        self.gates
            .next_measurement_at
            .arm(now, self.settings.measurement_interval_sec);
    }

    fn activation_permitted(&self, now: PrimitiveDateTime, reading: &Reading) -> bool {
        self.arm == ArmState::Armed
            && self.valve == ValveState::Closed
            && self.gates.next_activation_at.is_due(now)
            && reading.temperature >= self.settings.min_temperature_c
            && self
                .budget
                .remaining_below_limit(self.settings.daily_limit_sec)
            && self.threshold.permits(reading.humidity)
    }

    // -- Step 4: close check ------------------------------------------------

    fn close_check(&mut self, now: PrimitiveDateTime) {
        if self.valve == ValveState::Closed || !self.gates.valve_close_at.is_due(now) {
            return;
        }

        self.valve = ValveState::Closed;
        self.gates.valve_close_at.clear();
        self.bypass = false;
        self.sensor.set_watering(false);

        let closed_at = self.clock.now();
        let consumed = self.budget.consumed_seconds();
        info!(consumed_sec = consumed, "valve shut");
        self.write_log(
            closed_at,
            &format!("VALVE SHUT. Water time consumed: {consumed} sec"),
        );

        // Advisory only: the next measurement's budget check does the gating.
        if consumed > self.settings.daily_limit_sec {
            warn!(
                consumed_sec = consumed,
                limit_sec = self.settings.daily_limit_sec,
                "daily limit reached"
            );
            self.write_log(closed_at, "Daily limit consumed. Resting till tomorrow");
        }
    }

    // -- Helpers ------------------------------------------------------------

    fn open_valve(&mut self, now: PrimitiveDateTime, origin: Origin) {
        self.valve = ValveState::Open { origin };
        self.gates
            .valve_close_at
            .arm(now, self.settings.duration_sec);
        self.sensor.set_watering(true);
    }

    fn write_log(&mut self, at: PrimitiveDateTime, event: &str) {
        let line = format!("{} {event}", stamp(at));
        if let Err(e) = self.log.append(&line) {
            self.raise(Fault::StorageUnavailable, &format!("{e:#}"));
        }
    }

    fn raise(&mut self, fault: Fault, detail: &str) {
        error!(?fault, "{detail}");
        self.fault = Some(fault);
    }

    pub fn outputs(&self) -> Outputs {
        let open = matches!(self.valve, ValveState::Open { .. });
        Outputs {
            valve_open: open,
            armed_led: self.arm == ArmState::Armed,
            open_led: open,
            fault_led: self.fault.is_some(),
        }
    }

    pub fn status(&self) -> ControllerStatus {
        let fmt_gate = |g: &TimeGate| g.deadline().map(stamp);
        ControllerStatus {
            valve: self.valve,
            arm: self.arm,
            bypass: self.bypass,
            threshold: self.threshold.clone(),
            consumed_sec: self.budget.consumed_seconds(),
            daily_limit_sec: self.settings.daily_limit_sec,
            last_reading: self.last_reading,
            next_measurement_at: fmt_gate(&self.gates.next_measurement_at),
            next_activation_at: fmt_gate(&self.gates.next_activation_at),
            valve_close_at: fmt_gate(&self.gates.valve_close_at),
            fault: self.fault,
        }
    }

    pub fn log_sink_mut(&mut self) -> &mut L {
        &mut self.log
    }
}

#[cfg(test)]
impl<C, S, L, T> Controller<C, S, L, T> {
    pub fn valve(&self) -> ValveState {
        self.valve
    }

    pub fn arm_state(&self) -> ArmState {
        self.arm
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    pub fn budget(&self) -> &DailyBudget {
        &self.budget
    }

    pub fn gates(&self) -> &TimeGates {
        &self.gates
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }
}

// ===========================================================================
// Tests
// ===========================================================================
