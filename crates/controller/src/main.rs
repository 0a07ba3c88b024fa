mod board;
mod budget;
mod button;
mod clock;
mod config;
mod controller;
mod gate;
mod sensor;
#[cfg_attr(not(feature = "gpio"), allow(dead_code))]
mod sht1x;
#[cfg(feature = "sim")]
#[cfg_attr(feature = "gpio", allow(dead_code))]
mod sim;
mod sink;
mod state;
mod telemetry;
mod threshold;
mod web;

#[cfg(not(any(feature = "gpio", feature = "sim")))]
compile_error!("enable the `gpio` feature for hardware or `sim` for the soil simulator");

use anyhow::Result;
use rumqttc::{AsyncClient, MqttOptions};
use std::{env, sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use board::Board;
use clock::SystemClock;
use config::Config;
use controller::Controller;
use sensor::Sensor;
use sink::FileLog;
use state::SystemState;
use telemetry::MqttTelemetry;
use threshold::DrynessThreshold;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Env config ──────────────────────────────────────────────────
    let broker = env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("MQTT_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1883);
    let node_id = env::var("NODE_ID").unwrap_or_else(|_| "garden-1".to_string());

    // ── Config file ─────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::load(&config_path)?;
    let offset = cfg.local_offset()?;
    tracing::info!(
        path = %config_path,
        tick_ms = cfg.watering.tick_ms,
        duration_sec = cfg.watering.duration_sec,
        daily_limit_sec = cfg.watering.daily_limit_sec,
        "config loaded"
    );

    // Unreadable threshold disables automatic watering but not the bypass.
    let threshold = DrynessThreshold::load_or_unreadable(&cfg.paths.threshold);
    if threshold.is_configured() {
        tracing::info!(%threshold, "dryness threshold loaded");
    }

    // ── Board & sensor ──────────────────────────────────────────────
    let mut board = Board::new(&cfg.pins)?;
    board.all_off();
    let sensor = build_sensor(&cfg)?;

    // ── Shared state (ephemeral, for the status API) ────────────────
    let shared = SystemState::shared();
    shared
        .write()
        .await
        .record_system(format!("controller {node_id} started"));

    // ── Web server ──────────────────────────────────────────────────
    let web_state = Arc::clone(&shared);
    tokio::spawn(async move {
        if let Err(e) = web::serve(web_state).await {
            tracing::error!("{e:#}");
        }
    });

    // ── MQTT ────────────────────────────────────────────────────────
    let mut mqttoptions = MqttOptions::new(format!("garden-controller-{node_id}"), broker, port);
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    let (client, eventloop) = AsyncClient::new(mqttoptions, 20);
    tokio::spawn(telemetry::run_event_loop(eventloop, Arc::clone(&shared)));

    // ── Controller ──────────────────────────────────────────────────
    let mut controller = Controller::new(
        cfg.watering.clone(),
        threshold,
        SystemClock::new(offset),
        sensor,
        FileLog::new(&cfg.paths.log),
        MqttTelemetry::new(client, &node_id),
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.watering.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = &mut shutdown => {
                if let Err(e) = res {
                    tracing::error!("failed to listen for ctrl-c: {e}");
                }
                break;
            }
        }

        let buttons = board.read_buttons();
        let outputs = controller.tick(buttons);
        board.drive(&outputs);

        let lines = controller.log_sink_mut().take_recent();
        let status = controller.status();
        shared.write().await.record_tick(status, lines);
    }

    // Fail-safe: never leave the valve open behind us.
    board.all_off();
    tracing::info!("shutdown: valve closed, outputs off");
    Ok(())
}

#[cfg(feature = "gpio")]
fn build_sensor(cfg: &Config) -> Result<impl Sensor> {
    sht1x::Sht1x::new(cfg.pins.sensor_data as u8, cfg.pins.sensor_clock as u8)
}

#[cfg(all(feature = "sim", not(feature = "gpio")))]
fn build_sensor(_cfg: &Config) -> Result<impl Sensor> {
    let scenario = sim::Scenario::from_str_lossy(
        &env::var("SIM_SCENARIO").unwrap_or_else(|_| "drying".to_string()),
    );
    let diurnal_period_s: f64 = env::var("SIM_DIURNAL_S")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(86_400.0);
    tracing::info!(%scenario, diurnal_period_s, "[sim] soil simulator");
    Ok(sim::SoilSim::new(scenario, diurnal_period_s))
}
