use std::time::Duration;

use anyhow::anyhow;
use shared::{
    domain::{LockKind, VentilationRequest, VentilationState},
    error::WsError,
    protocol::{ClientRequest, ControlState, LockRequest, ServerEvent},
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::rules::{check_transition, INVALID_STATE, LASER_LOCK_DENIED, OLGA_LOCK_DENIED};

const COMMAND_BUFFER: usize = 64;
const UPDATE_BUFFER: usize = 32;

/// Replies addressed to a single connection.
pub(crate) type ReplySender = mpsc::UnboundedSender<ServerEvent>;

pub(crate) enum HubCommand {
    Request {
        request: ClientRequest,
        from_local_panel: bool,
        reply: ReplySender,
    },
    Snapshot {
        reply: oneshot::Sender<VentilationState>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct HubConfig {
    pub(crate) local_token: String,
    pub(crate) lock_timeout: Duration,
}

/// Cloneable access to the hub task.
#[derive(Clone)]
pub(crate) struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    updates: broadcast::Sender<ServerEvent>,
}

impl HubHandle {
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.updates.subscribe()
    }

    pub(crate) async fn submit(
        &self,
        request: ClientRequest,
        from_local_panel: bool,
        reply: ReplySender,
    ) -> anyhow::Result<()> {
        self.commands
            .send(HubCommand::Request {
                request,
                from_local_panel,
                reply,
            })
            .await
            .map_err(|_| anyhow!("ventilation hub stopped"))
    }

    pub(crate) async fn snapshot(&self) -> anyhow::Result<VentilationState> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(HubCommand::Snapshot { reply })
            .await
            .map_err(|_| anyhow!("ventilation hub stopped"))?;
        rx.await.map_err(|_| anyhow!("ventilation hub dropped snapshot request"))
    }
}

/// True when `candidate` proves the sender is the local panel.
pub(crate) fn is_local_token(local_token: &str, candidate: &str) -> bool {
    !local_token.is_empty() && candidate == local_token
}

/// Owns the authoritative ventilation state. Every request is serialized
/// through this task; accepted changes go out to all connections.
struct VentilationHub {
    state: VentilationState,
    config: HubConfig,
    lock_deadline: Option<Instant>,
    updates: broadcast::Sender<ServerEvent>,
}

pub(crate) fn spawn_hub(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
    let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (updates, _) = broadcast::channel(UPDATE_BUFFER);
    let hub = VentilationHub {
        state: VentilationState::default(),
        config,
        lock_deadline: None,
        updates: updates.clone(),
    };
    let task = tokio::spawn(hub.run(commands_rx));
    (HubHandle { commands, updates }, task)
}

impl VentilationHub {
    async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        loop {
            let deadline = self.lock_deadline;
            let lock_expiry = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                () = lock_expiry => self.expire_locks(),
            }
        }
        debug!("hub: all handles dropped, stopping");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Snapshot { reply } => {
                let _ = reply.send(self.state);
            }
            HubCommand::Request {
                request: ClientRequest::VentChange(requested),
                from_local_panel,
                reply,
            } => self.change_ventilation(&requested, from_local_panel, &reply),
            HubCommand::Request {
                request: ClientRequest::Lock(request),
                reply,
                ..
            } => self.change_lock(request, &reply),
        }
    }

    fn change_ventilation(&mut self, requested: &ControlState, from_local_panel: bool, reply: &ReplySender) {
        let mut next = match VentilationRequest::try_from(requested) {
            Ok(next) => next,
            Err(err) => {
                debug!(%err, "hub: rejecting undecodable ventilation state");
                self.reject(reply, WsError::prohibited(INVALID_STATE));
                return;
            }
        };
        if let Err(error) = check_transition(&self.state, &mut next, from_local_panel) {
            info!(msg = %error.msg, from_local_panel, "hub: rejected ventilation change");
            self.reject(reply, error);
            return;
        }
        self.state.vent = next;
        info!(state = ?self.state, "hub: ventilation changed");
        self.publish();
    }

    fn change_lock(&mut self, request: LockRequest, reply: &ReplySender) {
        if !is_local_token(&self.config.local_token, &request.auth_token) {
            let msg = match request.kind {
                LockKind::Laser => LASER_LOCK_DENIED,
                LockKind::Olga => OLGA_LOCK_DENIED,
            };
            info!(lock = %request.kind, "hub: rejected lock change from remote panel");
            self.reject(reply, WsError::prohibited(msg));
            return;
        }
        self.state.set_lock(request.kind, request.locked);
        info!(lock = %request.kind, locked = request.locked, "hub: lock changed");
        if request.locked {
            self.lock_deadline = Some(Instant::now() + self.config.lock_timeout);
        } else if !LockKind::ALL.into_iter().any(|kind| self.state.lock(kind)) {
            self.lock_deadline = None;
        }
        self.publish();
    }

    fn expire_locks(&mut self) {
        info!(timeout = ?self.config.lock_timeout, "hub: lock timeout elapsed, releasing locks");
        self.lock_deadline = None;
        for kind in LockKind::ALL {
            self.state.set_lock(kind, false);
        }
        self.publish();
    }

    fn publish(&self) {
        // no subscribers just means no panel is connected
        let _ = self
            .updates
            .send(ServerEvent::VentChange(ControlState::from(&self.state)));
    }

    /// Resends the unchanged state to the requester, then the reason.
    fn reject(&self, reply: &ReplySender, error: WsError) {
        let current = ServerEvent::VentChange(ControlState::from(&self.state));
        if reply.send(current).and_then(|()| reply.send(ServerEvent::Error(error))).is_err() {
            warn!("hub: requester went away before rejection was delivered");
        }
    }
}

#[cfg(test)]
#[path = "tests/hub_tests.rs"]
mod tests;
