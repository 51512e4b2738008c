mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use razer_mux::{LifecycleController, MatchTable, Registry, REPORT_LENGTH};
use razer_raw::{
    battery_level, list_nodes, serial_number, HotplugWatcher, NodeClient, SocketPublisher,
};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run => run_daemon(cli.socket_dir).await,
        Commands::List => cmd_list(&cli.socket_dir),
        Commands::Battery { node } => {
            let node = resolve_node(&cli.socket_dir, node)?;
            println!("{}%", battery_level(&node)?);
            Ok(())
        }
        Commands::Serial { node } => {
            let node = resolve_node(&cli.socket_dir, node)?;
            println!("{}", serial_number(&node)?);
            Ok(())
        }
        Commands::Read { node } => cmd_read(resolve_node(&cli.socket_dir, node)?),
        Commands::Write { node, payload } => {
            cmd_write(resolve_node(&cli.socket_dir, node)?, &payload)
        }
    }
}

async fn run_daemon(socket_dir: PathBuf) -> Result<()> {
    let registry = Arc::new(Registry::new());
    let publisher = Arc::new(
        SocketPublisher::new(&socket_dir)
            .with_context(|| format!("preparing {}", socket_dir.display()))?,
    );
    let lifecycle = Arc::new(LifecycleController::new(registry, publisher));

    let watcher = HotplugWatcher::new(lifecycle.clone(), MatchTable::new());
    let watch_task = tokio::spawn(watcher.run());

    info!("multiplexer running, nodes under {}", socket_dir.display());
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");

    watch_task.abort();
    lifecycle.shutdown();
    Ok(())
}

fn resolve_node(dir: &PathBuf, node: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(node) = node {
        return Ok(node);
    }
    let nodes = list_nodes(dir).with_context(|| format!("listing {}", dir.display()))?;
    match nodes.into_iter().next() {
        Some(first) => Ok(first),
        None => bail!("no device nodes under {}", dir.display()),
    }
}

fn cmd_list(dir: &PathBuf) -> Result<()> {
    for node in list_nodes(dir).with_context(|| format!("listing {}", dir.display()))? {
        println!("{}", node.display());
    }
    Ok(())
}

fn cmd_read(node: PathBuf) -> Result<()> {
    let mut client = NodeClient::open(&node)?;
    dump_report(&client.read_report()?);
    Ok(())
}

fn cmd_write(node: PathBuf, payload: &str) -> Result<()> {
    let report = razer_raw::protocol::report_from_hex(payload)?;
    let mut client = NodeClient::open(&node)?;
    let written = client.write_report(&report)?;
    info!("wrote {} bytes", written);
    dump_report(&client.read_report()?);
    Ok(())
}

fn dump_report(report: &[u8; REPORT_LENGTH]) {
    for chunk in report.chunks(16) {
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{}", line.join(" "));
    }
}
