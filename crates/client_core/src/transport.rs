use std::time::Duration;

use futures::{SinkExt, StreamExt};
use shared::protocol::{ClientRequest, ServerEvent, WireMessage};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::runtime::PanelEvent;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
}

/// Outbound half of the socket as seen by the panel.
pub trait MessageSink: Send + Sync {
    fn send(&self, request: ClientRequest) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ClientRequest>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, request: ClientRequest) -> Result<(), TransportError> {
        self.tx.send(request).map_err(|_| TransportError::Closed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Disconnected,
    Message(ServerEvent),
}

/// Decodes one text frame; malformed frames and unknown contexts yield `None`.
pub fn decode_frame(text: &str) -> Option<ServerEvent> {
    let wire = match WireMessage::from_text(text) {
        Ok(wire) => wire,
        Err(err) => {
            warn!(%err, "transport: dropping undecodable frame");
            return None;
        }
    };
    let ctx = wire.ctx.clone();
    match ServerEvent::decode(wire) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(%ctx, "transport: ignoring frame for unknown context");
            None
        }
        Err(err) => {
            warn!(%ctx, %err, "transport: dropping malformed payload");
            None
        }
    }
}

enum PumpExit {
    Disconnected,
    PanelGone,
}

/// Websocket connection that keeps reconnecting until the panel goes away.
pub struct WsTransport {
    url: String,
    reconnect_delay: Duration,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
        }
    }

    pub fn spawn(self, events: mpsc::UnboundedSender<PanelEvent>) -> (ChannelSink, JoinHandle<()>) {
        let (sink, outbound) = ChannelSink::new();
        let handle = tokio::spawn(self.run(outbound, events));
        (sink, handle)
    }

    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<ClientRequest>,
        events: mpsc::UnboundedSender<PanelEvent>,
    ) {
        loop {
            // snapshots taken while offline are stale once the server resends its state
            let mut dropped = 0usize;
            while outbound.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                debug!(dropped, "transport: discarded requests queued while disconnected");
            }

            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    info!(url = %self.url, "transport: connected");
                    if events
                        .send(PanelEvent::Transport(TransportEvent::Opened))
                        .is_err()
                    {
                        return;
                    }
                    let exit = pump(stream, &mut outbound, &events).await;
                    info!(url = %self.url, "transport: disconnected");
                    if events
                        .send(PanelEvent::Transport(TransportEvent::Disconnected))
                        .is_err()
                    {
                        return;
                    }
                    if matches!(exit, PumpExit::PanelGone) {
                        return;
                    }
                }
                Err(err) => {
                    warn!(url = %self.url, %err, "transport: connect failed");
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
            if events.is_closed() {
                return;
            }
        }
    }
}

async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound: &mut mpsc::UnboundedReceiver<ClientRequest>,
    events: &mpsc::UnboundedSender<PanelEvent>,
) -> PumpExit {
    let (mut writer, mut reader) = stream.split();
    loop {
        tokio::select! {
            request = outbound.recv() => {
                let Some(request) = request else {
                    let _ = writer.send(Message::Close(None)).await;
                    return PumpExit::PanelGone;
                };
                let text = match request.to_wire().to_text() {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(ctx = %request.context(), %err, "transport: failed to encode request");
                        continue;
                    }
                };
                debug!(ctx = %request.context(), "transport: sending");
                if let Err(err) = writer.send(Message::Text(text)).await {
                    warn!(%err, "transport: send failed");
                    return PumpExit::Disconnected;
                }
            }
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Some(event) = decode_frame(&text) else {
                        continue;
                    };
                    if events
                        .send(PanelEvent::Transport(TransportEvent::Message(event)))
                        .is_err()
                    {
                        return PumpExit::PanelGone;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return PumpExit::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "transport: receive failed");
                    return PumpExit::Disconnected;
                }
            }
        }
    }
}
