use std::{sync::Arc, time::Duration};

use shared::{domain::LockKind, protocol::ServerEvent};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    layout::ControlLayout,
    lock::{LockOverride, LockToggleOutcome},
    notice::{ConnectionBanner, ConnectionState, DismissTicket, ErrorNotice},
    sync::ControlStateSync,
    transport::{MessageSink, TransportError, TransportEvent},
};

pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_millis(1100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOptions {
    pub error_display: Duration,
    pub locks: LockOverride,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            error_display: DEFAULT_ERROR_DISPLAY,
            locks: LockOverride::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub name: String,
    pub options: Vec<OptionView>,
    /// Lock-button marking; `None` for ordinary selector groups.
    pub lock_button: Option<bool>,
}

/// Everything a renderer needs to draw the panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView {
    pub groups: Vec<GroupView>,
    pub connection: ConnectionState,
    pub notice: Option<String>,
}

impl PanelView {
    pub fn active_option(&self, group: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|view| view.name == group)?
            .options
            .iter()
            .find(|option| option.active)
            .map(|option| option.value.as_str())
    }

    pub fn lock_button(&self, kind: LockKind) -> Option<bool> {
        self.groups
            .iter()
            .find(|view| view.name == kind.flag_name())
            .and_then(|view| view.lock_button)
    }
}

/// The panel's whole client-side state; renderers only ever see [`PanelView`].
pub struct ControlPanel {
    sync: ControlStateSync,
    locks: LockOverride,
    notice: ErrorNotice,
    banner: ConnectionBanner,
    error_display: Duration,
}

impl ControlPanel {
    pub fn new(layout: &ControlLayout, sink: Arc<dyn MessageSink>, options: PanelOptions) -> Self {
        Self {
            sync: ControlStateSync::new(layout, sink),
            locks: options.locks,
            notice: ErrorNotice::default(),
            banner: ConnectionBanner::default(),
            error_display: options.error_display,
        }
    }

    pub fn sync(&self) -> &ControlStateSync {
        &self.sync
    }

    pub fn handle_local_selection(
        &mut self,
        group: &str,
        option: &str,
    ) -> Result<bool, TransportError> {
        self.sync.handle_local_selection(group, option)
    }

    pub fn handle_lock_toggle(
        &mut self,
        control_name: &str,
        auth_token: Option<&str>,
    ) -> Result<LockToggleOutcome, TransportError> {
        self.locks
            .handle_lock_toggle(&mut self.sync, control_name, auth_token)
    }

    pub fn show_error(
        &mut self,
        message: impl Into<String>,
        duration: Duration,
        now: Instant,
    ) -> DismissTicket {
        self.notice.show_error(message, duration, now)
    }

    pub fn dismiss_notice(&mut self, ticket: DismissTicket) -> bool {
        self.notice.dismiss(ticket)
    }

    pub fn show_connecting(&mut self) {
        self.banner.show_connecting();
    }

    pub fn show_connected(&mut self) {
        self.banner.show_connected();
    }

    /// Routes one typed server event to its handler. Returns the dismissal
    /// the caller has to schedule when an error notice was shown.
    pub fn handle_server_event(&mut self, event: ServerEvent, now: Instant) -> Option<DismissTicket> {
        match event {
            ServerEvent::VentChange(snapshot) => {
                self.sync.apply_remote_state(&snapshot);
                None
            }
            ServerEvent::LockChanged { kind, locked } => {
                self.locks.apply_remote_lock(&mut self.sync, kind, locked);
                None
            }
            ServerEvent::Error(error) => {
                warn!(kind = ?error.kind, msg = %error.msg, "panel: server reported error");
                Some(self.show_error(error.msg, self.error_display, now))
            }
        }
    }

    pub fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        now: Instant,
    ) -> Option<DismissTicket> {
        match event {
            TransportEvent::Opened => {
                info!("panel: connection established");
                self.show_connected();
                None
            }
            TransportEvent::Disconnected => {
                info!("panel: waiting for connection");
                self.show_connecting();
                None
            }
            TransportEvent::Message(event) => self.handle_server_event(event, now),
        }
    }

    pub fn view(&self) -> PanelView {
        let groups = self
            .sync
            .groups()
            .iter()
            .map(|group| GroupView {
                name: group.name().to_string(),
                options: group
                    .options()
                    .iter()
                    .map(|option| OptionView {
                        value: option.clone(),
                        active: group.active_option() == Some(option.as_str()),
                    })
                    .collect(),
                lock_button: group.lock().map(|kind| self.sync.lock_engaged(kind)),
            })
            .collect();
        PanelView {
            groups,
            connection: self.banner.state(),
            notice: self
                .notice
                .is_visible()
                .then(|| self.notice.text().to_string()),
        }
    }
}
