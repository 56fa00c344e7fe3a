use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use shared::protocol::{ClientRequest, ControlState, ServerEvent, WireMessage};
use tokio::{
    sync::{broadcast, mpsc},
    time::{interval_at, Instant},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod hub;
mod rules;

use app_state::AppState;
use config::load_settings;
use hub::{spawn_hub, HubConfig};

const MAX_MESSAGE_SIZE: usize = 512;
const PING_PERIOD: Duration = Duration::from_secs(58);

#[derive(Debug, Deserialize)]
struct SockQuery {
    authtoken: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings().context("failed to load server settings")?;
    if settings.local_token.is_empty() {
        warn!("no local_token configured; every lock request will be refused");
    }

    let (hub, _hub_task) = spawn_hub(HubConfig {
        local_token: settings.local_token.clone(),
        lock_timeout: settings.lock_timeout,
    });
    let app = build_router(AppState::new(hub, &settings.local_token));

    info!(addr = %settings.bind_addr, "server listening");
    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sock", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<SockQuery>,
) -> impl IntoResponse {
    let from_local_panel = state.is_local_socket(q.authtoken.as_deref());
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| ws_connection(state, socket, from_local_panel))
}

async fn ws_connection(state: AppState, socket: WebSocket, from_local_panel: bool) {
    let (sender, mut receiver) = socket.split();
    let updates = state.hub.subscribe();
    let initial = match state.hub.snapshot().await {
        Ok(snapshot) => ControlState::from(&snapshot),
        Err(err) => {
            warn!(%err, "sock: no state for new client");
            return;
        }
    };
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    info!(from_local_panel, "sock: client connected");

    let send_task = tokio::spawn(write_to_client(sender, initial, updates, reply_rx));

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(%err, "sock: read failed");
                break;
            }
        };
        let Some(request) = decode_request(&text) else {
            continue;
        };
        if let Err(err) = state
            .hub
            .submit(request, from_local_panel, reply_tx.clone())
            .await
        {
            warn!(%err, "sock: dropping request");
            break;
        }
    }

    send_task.abort();
    info!(from_local_panel, "sock: client disconnected");
}

/// Single writer per socket: initial state, broadcasts, direct replies and pings.
async fn write_to_client(
    mut sender: SplitSink<WebSocket, Message>,
    initial: ControlState,
    mut updates: broadcast::Receiver<ServerEvent>,
    mut replies: mpsc::UnboundedReceiver<ServerEvent>,
) {
    if send_event(&mut sender, &ServerEvent::VentChange(initial)).await.is_err() {
        return;
    }
    let mut ping = interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);
    loop {
        let sent = tokio::select! {
            update = updates.recv() => match update {
                Ok(event) => send_event(&mut sender, &event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // the next broadcast carries the full state again
                    warn!(skipped, "sock: client lagging behind updates");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(event) = replies.recv() => send_event(&mut sender, &event).await,
            _ = ping.tick() => sender.send(Message::Ping(Vec::new())).await,
        };
        if sent.is_err() {
            return;
        }
    }
    let _ = sender.send(Message::Close(None)).await;
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match event.to_wire().to_text() {
        Ok(text) => sender.send(Message::Text(text)).await,
        Err(err) => {
            warn!(ctx = %event.context(), %err, "sock: failed to encode event");
            Ok(())
        }
    }
}

fn decode_request(text: &str) -> Option<ClientRequest> {
    let wire = match WireMessage::from_text(text) {
        Ok(wire) => wire,
        Err(err) => {
            debug!(%err, "sock: ignoring undecodable frame");
            return None;
        }
    };
    let ctx = wire.ctx.clone();
    match ClientRequest::decode(wire) {
        Ok(Some(request)) => Some(request),
        Ok(None) => {
            debug!(%ctx, "sock: ignoring frame for unknown context");
            None
        }
        Err(err) => {
            warn!(%ctx, %err, "sock: ignoring malformed request");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
