//! `tabsweep status` — human or JSON status output.

use crate::client::rpc_call;

pub async fn cmd_status(socket_path: &str, json: bool) -> anyhow::Result<()> {
    let status = rpc_call(socket_path, "status", serde_json::json!({})).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    print!("{}", format_status(&status));
    Ok(())
}

/// Pure formatting logic, separated for testability.
pub(crate) fn format_status(status: &serde_json::Value) -> String {
    let workspace = status["workspace"].as_str().unwrap_or("(none)");
    let mode = status["activation_mode"].as_str().unwrap_or("?");
    let active = status["active"].as_bool().unwrap_or(false);
    let threshold = status["close_threshold_minutes"].as_u64().unwrap_or(0);
    let attached = status["editor_attached"].as_bool().unwrap_or(false);

    let mut out = String::new();
    out.push_str(&format!("workspace:  {workspace}\n"));
    out.push_str(&format!("mode:       {mode}\n"));
    out.push_str(&format!(
        "active:     {}\n",
        if active { "yes" } else { "no" }
    ));
    out.push_str(&format!("threshold:  {threshold}min\n"));
    out.push_str(&format!(
        "editor:     {}\n",
        if attached { "attached" } else { "detached" }
    ));

    match status["tabs"].as_array() {
        Some(tabs) if !tabs.is_empty() => {
            out.push_str("tabs:\n");
            for tab in tabs {
                let id = tab["tab"].as_str().unwrap_or("?");
                let group = tab["group"].as_str().unwrap_or("?");
                let age = tab["age_ticks"].as_u64().unwrap_or(0);
                out.push_str(&format!("  {id}  group={group} age={age}\n"));
            }
        }
        _ => out.push_str("tabs:       none\n"),
    }

    out
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_status(active: bool, tabs: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "active": active,
            "workspace": "file:///home/dev/proj",
            "activation_mode": "default-active",
            "close_threshold_minutes": 30,
            "tracked": 2,
            "editor_attached": true,
            "flag_version": 1,
            "tabs": tabs,
        })
    }

    #[test]
    fn format_status_basic_fields() {
        let status = make_status(true, serde_json::json!([]));
        let out = format_status(&status);
        assert!(out.contains("file:///home/dev/proj"));
        assert!(out.contains("active:     yes"));
        assert!(out.contains("threshold:  30min"));
        assert!(out.contains("editor:     attached"));
        assert!(out.contains("tabs:       none"));
    }

    #[test]
    fn format_status_lists_tabs() {
        let tabs = serde_json::json!([
            {"tab": "t1", "group": "g1", "age_ticks": 12},
            {"tab": "t2", "group": "g2", "age_ticks": 0},
        ]);
        let status = make_status(false, tabs);
        let out = format_status(&status);
        assert!(out.contains("active:     no"));
        assert!(out.contains("t1  group=g1 age=12"));
        assert!(out.contains("t2  group=g2 age=0"));
    }

    #[test]
    fn format_status_missing_workspace() {
        let mut status = make_status(true, serde_json::json!([]));
        status["workspace"] = serde_json::Value::Null;
        let out = format_status(&status);
        assert!(out.contains("workspace:  (none)"));
    }
}
