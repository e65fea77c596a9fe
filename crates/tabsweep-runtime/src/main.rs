//! tabsweep: stale editor tab sweeper.
//! Single-process binary embedding the sweep engine, the UDS server for the
//! editor adapter and CLI clients, and the periodic tick loop.

use clap::Parser;

mod cli;
mod client;
mod cmd_status;
mod server;
mod settings;
mod sweep_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("TABSWEEP_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("tabsweep daemon starting");
            sweep_loop::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Sweep => {
            let result =
                client::rpc_call(&socket_path, "sweep_now", serde_json::json!({})).await?;
            let requested = result["requested"].as_array().map_or(0, |a| a.len());
            println!("requested {requested} tab close(s)");
            if let Some(spared) = result["spared"].as_str() {
                println!("spared {spared} to keep one tab open");
            }
            if result["delivered"] == false && requested > 0 {
                println!("warning: no editor adapter attached; nothing was closed");
            }
        }
        cli::Command::Activate => {
            let result = client::rpc_call(&socket_path, "activate", serde_json::json!({})).await?;
            print_toggle("activated", &result);
        }
        cli::Command::Deactivate => {
            let result =
                client::rpc_call(&socket_path, "deactivate", serde_json::json!({})).await?;
            print_toggle("deactivated", &result);
        }
        cli::Command::Status(opts) => {
            cmd_status::cmd_status(&socket_path, opts.json).await?;
        }
    }

    Ok(())
}

fn print_toggle(action: &str, result: &serde_json::Value) {
    match result["outcome"].as_str() {
        Some("changed") => println!("{action} in this workspace"),
        Some("already_set") => println!("already in the requested state"),
        Some("no_workspace") => {
            println!("no permanent workspace open; nothing changed");
        }
        _ => println!("{result}"),
    }
}
