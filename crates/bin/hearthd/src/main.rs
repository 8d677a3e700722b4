//! # hearthd — heating controller daemon
//!
//! Composition root that wires the readings store and the switch driver
//! together and runs the control loop.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Pick the switch driver (Kasa plugs or virtual switches)
//! - Build one actuator handle per component and the control loop
//! - Synchronise with the switches, then tick until SIGINT/SIGTERM
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use hearth_adapter_kasa::KasaDiscovery;
use hearth_adapter_storage_sqlite_sqlx::{Config as StorageConfig, SqliteReadingsStore};
use hearth_adapter_virtual::VirtualPlugs;
use hearth_app::actuator::{Acquire, ActuatorHandle};
use hearth_app::control_loop::ControlLoop;
use hearth_app::ports::SwitchDiscovery;
use hearth_domain::component::Component;

use crate::config::{Config, Driver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Handlers go in before anything touches a switch.
    let shutdown = listen_for_shutdown()?;

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .with_context(|| format!("failed to open database {}", config.database_url()))?;
    let store = Arc::new(SqliteReadingsStore::new(db.pool().clone()));

    // Switches
    match config.actuators.driver {
        Driver::Kasa => {
            let discovery = Arc::new(KasaDiscovery::new(config.kasa.clone()));
            run(&config, store, discovery, shutdown).await;
        }
        Driver::Virtual => {
            tracing::warn!("virtual switch driver selected, no hardware will be switched");
            let discovery = Arc::new(VirtualPlugs::with_aliases(
                Component::ALL.map(|component| config.device(component).alias.as_str()),
            ));
            run(&config, store, discovery, shutdown).await;
        }
    }

    Ok(())
}

async fn run<D: SwitchDiscovery>(
    config: &Config,
    store: Arc<SqliteReadingsStore>,
    discovery: Arc<D>,
    shutdown: watch::Receiver<bool>,
) {
    let handles = config.actuator_settings().map(|component, settings| {
        let device = config.device(component);
        ActuatorHandle::new(
            component,
            &device.alias,
            &device.location,
            Arc::clone(&discovery),
            Arc::clone(&store),
            settings,
        )
    });

    let mut control = ControlLoop::new(store, config.controller_settings(), handles);

    // discovery only reads from the switches
    let acquired = tokio::select! {
        biased;
        () = stopped(shutdown.clone()) => {
            tracing::info!("shutdown requested during startup");
            return;
        }
        acquired = control.initialize() => acquired,
    };
    let missing: Vec<Component> = acquired
        .iter()
        .filter(|(_, result)| **result == Acquire::NotFound)
        .map(|(component, _)| component)
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "starting without some switches, will keep trying");
    }

    control.run(stopped(shutdown)).await;
}

/// Install the signal handlers and flag the returned channel on the first
/// SIGINT or SIGTERM.
fn listen_for_shutdown() -> anyhow::Result<watch::Receiver<bool>> {
    let signal = shutdown_signal()?;
    let (sender, receiver) = watch::channel(false);
    tokio::spawn(async move {
        signal.await;
        let _ = sender.send(true);
    });
    Ok(receiver)
}

async fn stopped(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // sender gone without a signal
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to listen for SIGINT")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::info!("received SIGINT"),
            _ = terminate.recv() => tracing::info!("received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c");
    })
}
