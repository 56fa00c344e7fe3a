use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    ControlLayout, ControlPanel, LockPolicy, PanelEvent, PanelRuntime, PanelView, WsTransport,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{parse_command, Command, HELP};
use config::{load_settings, PanelSettings};
use render::render;

#[derive(Parser, Debug)]
#[command(about = "Terminal ventilation control panel")]
struct Args {
    #[arg(long, default_value = "panel.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// Page url; an `authtoken` query parameter marks this panel as local.
    #[arg(long)]
    page_url: Option<String>,
    #[arg(long)]
    error_display_ms: Option<u64>,
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,
    #[arg(long)]
    olga_lock_policy: Option<LockPolicy>,
    #[arg(long)]
    laser_lock_policy: Option<LockPolicy>,
}

impl Args {
    fn apply_to(&self, settings: &mut PanelSettings) -> Result<()> {
        let overrides = [
            ("server_url", self.server_url.clone()),
            ("page_url", self.page_url.clone()),
            ("error_display_ms", self.error_display_ms.map(|v| v.to_string())),
            ("reconnect_delay_ms", self.reconnect_delay_ms.map(|v| v.to_string())),
            ("olga_lock_policy", self.olga_lock_policy.map(|v| v.to_string())),
            ("laser_lock_policy", self.laser_lock_policy.map(|v| v.to_string())),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                settings
                    .apply(key, &value)
                    .with_context(|| format!("invalid --{}", key.replace('_', "-")))?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config, |key| std::env::var(key).ok())?;
    args.apply_to(&mut settings)?;
    let page_url = settings.page_url()?;
    info!(server = %settings.server_url, page = %page_url, "panel starting");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (sink, transport) = WsTransport::new(settings.server_url.clone(), settings.reconnect_delay)
        .spawn(events_tx.clone());
    let panel = ControlPanel::new(
        &ControlLayout::ventilation(),
        Arc::new(sink),
        settings.panel_options(),
    );
    let (runtime, view_rx) = PanelRuntime::new(panel, page_url);
    let runtime_task = tokio::spawn(runtime.run(events_rx));
    let render_task = tokio::spawn(print_views(view_rx.clone()));

    println!("{HELP}");
    let result = read_commands(&events_tx, &view_rx).await;

    transport.abort();
    drop(events_tx);
    let _ = runtime_task.await;
    render_task.abort();
    result
}

async fn print_views(mut view_rx: watch::Receiver<PanelView>) {
    while view_rx.changed().await.is_ok() {
        let view = view_rx.borrow_and_update().clone();
        println!("{}", render(&view));
    }
}

async fn read_commands(
    events_tx: &mpsc::UnboundedSender<PanelEvent>,
    view_rx: &watch::Receiver<PanelView>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Action(action))) => {
                if events_tx.send(PanelEvent::Action(action)).is_err() {
                    warn!("panel runtime stopped");
                    break;
                }
            }
            Ok(Some(Command::Show)) => println!("{}", render(&view_rx.borrow())),
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(Some(Command::Quit)) => break,
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}
