//! Daemon wiring: shared state, the periodic tick loop, and teardown.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, interval};

use tabsweep_daemon::engine::SweepEngine;
use tabsweep_editor::protocol::EditorCommand;

use crate::cli::DaemonOpts;
use crate::server;
use crate::settings::SettingsStore;

/// Shared daemon state protected by a mutex.
pub struct DaemonState {
    pub engine: SweepEngine,
    pub store: SettingsStore,
    /// Writer handle for the attached editor adapter, if any.
    pub editor_tx: Option<UnboundedSender<EditorCommand>>,
    /// Last flag version delivered to the adapter.
    pub published_version: u64,
}

impl DaemonState {
    pub fn new(engine: SweepEngine, store: SettingsStore) -> Self {
        Self {
            engine,
            store,
            editor_tx: None,
            published_version: 0,
        }
    }

    /// Deliver a command to the adapter. Returns `false` when no adapter is
    /// attached or the link is gone (the sender side observes the closed
    /// channel and drops it).
    pub fn send_command(&mut self, command: EditorCommand) -> bool {
        match &self.editor_tx {
            Some(tx) => {
                if tx.send(command).is_ok() {
                    true
                } else {
                    self.editor_tx = None;
                    false
                }
            }
            None => false,
        }
    }
}

/// Push the current flag value to the adapter unconditionally.
pub(crate) async fn publish_current_flag(state: &Arc<Mutex<DaemonState>>) {
    let mut st = state.lock().await;
    let active = st.engine.is_active();
    let version = st.engine.version();
    st.send_command(EditorCommand::PublishActive { active });
    st.published_version = version;
}

/// Push the flag only when its version advanced since the last delivery.
pub(crate) async fn publish_flag_if_changed(state: &Arc<Mutex<DaemonState>>) {
    let mut st = state.lock().await;
    if st.engine.version() > st.published_version {
        let active = st.engine.is_active();
        let version = st.engine.version();
        st.send_command(EditorCommand::PublishActive { active });
        st.published_version = version;
    }
}

/// Run the daemon: tick loop + UDS server, until a shutdown signal.
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let settings_path = opts
        .settings_path
        .clone()
        .unwrap_or_else(crate::cli::default_settings_path);
    let store = SettingsStore::load(&settings_path)?;
    let engine = SweepEngine::new(
        store.settings().clone(),
        opts.tick_interval_minutes,
        Utc::now(),
    );
    let state = Arc::new(Mutex::new(DaemonState::new(engine, store)));

    tracing::info!(
        "tick interval {}min, settings at {settings_path}",
        opts.tick_interval_minutes
    );

    // Start UDS server
    let server_state = Arc::clone(&state);
    let server_socket = socket_path.to_string();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Start tick loop
    let tick_state = Arc::clone(&state);
    let tick_minutes = opts.tick_interval_minutes.max(1);
    let mut tick_handle = tokio::spawn(async move {
        run_tick_loop(tick_state, tick_minutes).await;
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = &mut tick_handle => {
            tracing::warn!("tick loop exited unexpectedly");
        }
        _ = &mut server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    // Stop the ticker before anything else; aborting a finished task is a
    // no-op, so teardown stays idempotent.
    tick_handle.abort();
    server_handle.abort();

    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}

async fn run_tick_loop(state: Arc<Mutex<DaemonState>>, tick_minutes: u64) {
    let mut ticker = interval(Duration::from_secs(tick_minutes * 60));
    // tokio's first interval tick completes immediately; skip it so tabs
    // start aging from zero rather than one.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        run_tick(&state).await;
    }
}

/// One aging/closing pass: increment to completion, then evaluate.
pub(crate) async fn run_tick(state: &Arc<Mutex<DaemonState>>) {
    let now = Utc::now();
    let mut st = state.lock().await;
    let outcome = st.engine.tick(now);

    if !outcome.orphaned.is_empty() {
        tracing::warn!(
            "ledger drift: {} entries not reported open: {:?}",
            outcome.orphaned.len(),
            outcome.orphaned
        );
    }

    tracing::debug!(
        "tick: {} tracked, active={}",
        outcome.incremented,
        outcome.active
    );

    if !outcome.plan.is_empty() {
        let tabs = outcome.plan.close.clone();
        tracing::info!("requesting close of {} stale tabs", tabs.len());
        if !st.send_command(EditorCommand::CloseTabs { tabs }) {
            // Counters stay put, so the next tick simply retries.
            tracing::warn!("no editor adapter attached; close request dropped");
        }
    }
    drop(st);

    publish_flag_if_changed(state).await;
}

// ─── Tests ───────────────────────────────────────────────────────
