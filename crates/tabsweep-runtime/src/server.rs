//! UDS newline-JSON server: client RPCs plus the long-lived editor feed.
//!
//! Connection-per-request for clients; an `attach` request upgrades the
//! connection into the editor adapter feed (NDJSON notices in, command
//! lines out).

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use tabsweep_core::activation::ToggleOutcome;
use tabsweep_core::types::SettingKey;
use tabsweep_editor::feed::{parse_feed_line, translate};
use tabsweep_editor::protocol::{EditorCommand, encode_command};

use crate::sweep_loop::{DaemonState, publish_current_flag, publish_flag_if_changed};

/// Run the UDS server.
pub async fn run_server(socket_path: &str, state: Arc<Mutex<DaemonState>>) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    state: Arc<Mutex<DaemonState>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");

    // The editor adapter upgrades its connection to a long-lived feed.
    if method == "attach" {
        return run_feed(reader, writer, state).await;
    }

    let id = request["id"].clone();
    let params = request["params"].clone();

    let dispatched = {
        let mut st = state.lock().await;
        dispatch_request(method, &params, &mut st)
    };
    // Commands may have moved the flag; deliver before responding.
    publish_flag_if_changed(&state).await;

    let response = match dispatched {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err((code, message)) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message},
            "id": id,
        }),
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

// ─── Editor feed ─────────────────────────────────────────────────

/// Long-lived editor adapter connection: NDJSON notices in, commands out.
async fn run_feed(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    state: Arc<Mutex<DaemonState>>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<EditorCommand>();
    {
        let mut st = state.lock().await;
        st.editor_tx = Some(tx);
    }
    tracing::info!("editor adapter attached");

    // Writer task: one command per line.
    let write_task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match encode_command(&command) {
                Ok(mut cmd_line) => {
                    cmd_line.push('\n');
                    if let Err(e) = writer.write_all(cmd_line.as_bytes()).await {
                        tracing::warn!("editor link write failed: {e}");
                        break;
                    }
                }
                Err(e) => tracing::warn!("editor command encode failed: {e}"),
            }
        }
    });

    // Let the freshly attached adapter know the current flag.
    publish_current_flag(&state).await;

    let mut line = String::new();
    let mut line_num = 0usize;
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        line_num += 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_feed_line(&line, line_num) {
            Ok(message) => {
                let now = Utc::now();
                let events = translate(message, now);
                {
                    let mut st = state.lock().await;
                    st.engine.apply_events(&events, now);
                }
                publish_flag_if_changed(&state).await;
            }
            Err(e) => tracing::debug!("feed parse error: {e}"),
        }
    }

    tracing::info!("editor adapter detached");
    {
        let mut st = state.lock().await;
        st.editor_tx = None;
    }
    write_task.abort();
    Ok(())
}

// ─── Request dispatch ────────────────────────────────────────────

type RpcError = (i64, String);

/// Dispatch one request/response method. Pure with respect to IO: all
/// side effects go through the shared state, so tests can call it directly.
pub(crate) fn dispatch_request(
    method: &str,
    params: &serde_json::Value,
    st: &mut DaemonState,
) -> Result<serde_json::Value, RpcError> {
    match method {
        "status" => Ok(build_status(st)),
        "sweep_now" => {
            let now = Utc::now();
            let plan = st.engine.sweep_now(now);
            let delivered = if plan.is_empty() {
                false
            } else {
                st.send_command(EditorCommand::CloseTabs {
                    tabs: plan.close.clone(),
                })
            };
            Ok(serde_json::json!({
                "requested": plan.close,
                "spared": plan.spared,
                "delivered": delivered,
            }))
        }
        "activate" | "deactivate" => {
            let now = Utc::now();
            let outcome = if method == "activate" {
                st.engine.activate(now)
            } else {
                st.engine.deactivate(now)
            };
            match outcome {
                ToggleOutcome::Changed => {
                    let snapshot = st.engine.settings().clone();
                    if let Err(e) = st.store.replace(snapshot) {
                        return Err((-32000, format!("failed to persist settings: {e}")));
                    }
                }
                ToggleOutcome::AlreadySet => {}
                ToggleOutcome::NoWorkspace => {
                    tracing::warn!("{method} requested with no permanent workspace identifier");
                    st.send_command(EditorCommand::ShowNotice {
                        message: "tabsweep: open a workspace or a single folder to change \
                                  per-workspace activation"
                            .to_string(),
                    });
                }
            }
            Ok(serde_json::json!({
                "outcome": outcome_str(outcome),
                "active": st.engine.is_active(),
            }))
        }
        "get_setting" => {
            let key = parse_key(params)?;
            Ok(serde_json::json!({
                "key": key.as_str(),
                "value": st.store.get(key),
            }))
        }
        "set_setting" => {
            let key = parse_key(params)?;
            let value = params["value"].clone();
            let change = st
                .store
                .set(key, value)
                .map_err(|e| (-32602, e.to_string()))?;
            let snapshot = st.store.settings().clone();
            st.engine.apply_setting_change(snapshot, change.key, Utc::now());
            Ok(serde_json::json!({
                "key": change.key.as_str(),
                "changed_at": change.changed_at,
            }))
        }
        "flag_changes" => {
            let since = params["since_version"].as_u64().unwrap_or(0);
            let changes = st.engine.changes_since(since);
            Ok(serde_json::json!({
                "changes": changes,
                "version": st.engine.version(),
            }))
        }
        _ => Err((-32601, "method not found".to_string())),
    }
}

fn outcome_str(outcome: ToggleOutcome) -> &'static str {
    match outcome {
        ToggleOutcome::Changed => "changed",
        ToggleOutcome::AlreadySet => "already_set",
        ToggleOutcome::NoWorkspace => "no_workspace",
    }
}

fn parse_key(params: &serde_json::Value) -> Result<SettingKey, RpcError> {
    let raw = params["key"]
        .as_str()
        .ok_or((-32602, "missing setting key".to_string()))?;
    raw.parse::<SettingKey>()
        .map_err(|e| (-32602, e.to_string()))
}

/// Build the `status` response.
pub(crate) fn build_status(state: &DaemonState) -> serde_json::Value {
    let tabs: Vec<serde_json::Value> = state
        .engine
        .open_tabs()
        .into_iter()
        .map(|(tab, group, age)| {
            serde_json::json!({
                "tab": tab,
                "group": group,
                "age_ticks": age,
            })
        })
        .collect();

    let settings = state.engine.settings();
    serde_json::json!({
        "active": state.engine.is_active(),
        "workspace": state.engine.workspace(),
        "activation_mode": settings.activation_mode,
        "close_threshold_minutes": settings.close_threshold_minutes,
        "tracked": state.engine.tracked_len(),
        "editor_attached": state.editor_tx.is_some(),
        "flag_version": state.engine.version(),
        "tabs": tabs,
    })
}

// ─── Tests ───────────────────────────────────────────────────────
