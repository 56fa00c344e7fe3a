use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    auth::auth_token,
    lock::LockToggleOutcome,
    notice::DismissTicket,
    panel::{ControlPanel, PanelView},
    transport::TransportEvent,
};

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Select { group: String, option: String },
    ToggleLock { control: String },
    /// The hosting page moved; later lock clicks read their token from here.
    Navigate(Url),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Transport(TransportEvent),
    Action(UserAction),
}

/// Serializes every panel mutation onto one task and publishes the resulting
/// view after each event.
pub struct PanelRuntime {
    panel: ControlPanel,
    page_url: Url,
    view_tx: watch::Sender<PanelView>,
}

impl PanelRuntime {
    pub fn new(panel: ControlPanel, page_url: Url) -> (Self, watch::Receiver<PanelView>) {
        let (view_tx, view_rx) = watch::channel(panel.view());
        (
            Self {
                panel,
                page_url,
                view_tx,
            },
            view_rx,
        )
    }

    /// Runs until every event sender is dropped, then hands the panel back.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<PanelEvent>) -> ControlPanel {
        let (dismiss_tx, mut dismiss_rx) = mpsc::unbounded_channel::<DismissTicket>();
        loop {
            let scheduled = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(ticket) = dismiss_rx.recv() => {
                    self.panel.dismiss_notice(ticket);
                    None
                }
            };
            if let Some(ticket) = scheduled {
                schedule_dismissal(ticket, dismiss_tx.clone());
            }
            self.publish_view();
        }
        self.panel
    }

    fn handle_event(&mut self, event: PanelEvent) -> Option<DismissTicket> {
        match event {
            PanelEvent::Transport(event) => self.panel.handle_transport_event(event, Instant::now()),
            PanelEvent::Action(UserAction::Select { group, option }) => {
                if let Err(err) = self.panel.handle_local_selection(&group, &option) {
                    warn!(%err, group = %group, option = %option, "runtime: failed to publish selection");
                }
                None
            }
            PanelEvent::Action(UserAction::ToggleLock { control }) => {
                let token = auth_token(&self.page_url);
                match self.panel.handle_lock_toggle(&control, token.as_deref()) {
                    Ok(LockToggleOutcome::NotALock) => {
                        debug!(control = %control, "runtime: toggle on a control without lock");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(%err, control = %control, "runtime: failed to publish lock change"),
                }
                None
            }
            PanelEvent::Action(UserAction::Navigate(url)) => {
                self.page_url = url;
                None
            }
        }
    }

    fn publish_view(&self) {
        let view = self.panel.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}

fn schedule_dismissal(ticket: DismissTicket, dismiss_tx: mpsc::UnboundedSender<DismissTicket>) {
    tokio::spawn(async move {
        tokio::time::sleep_until(ticket.deadline()).await;
        let _ = dismiss_tx.send(ticket);
    });
}
