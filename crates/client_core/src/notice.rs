use std::time::Duration;

use tokio::time::Instant;

/// Identifies one `show_error` call and when its dismissal is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissTicket {
    generation: u64,
    deadline: Instant,
}

impl DismissTicket {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Transient error banner.
///
/// A newer `show_error` supersedes the pending dismissal of an older one: only
/// the ticket of the latest call hides the banner.
#[derive(Debug, Default)]
pub struct ErrorNotice {
    text: String,
    visible: bool,
    generation: u64,
}

impl ErrorNotice {
    pub fn show_error(
        &mut self,
        message: impl Into<String>,
        duration: Duration,
        now: Instant,
    ) -> DismissTicket {
        self.text = message.into();
        self.visible = true;
        self.generation += 1;
        DismissTicket {
            generation: self.generation,
            deadline: now + duration,
        }
    }

    pub fn dismiss(&mut self, ticket: DismissTicket) -> bool {
        if ticket.generation != self.generation || !self.visible {
            return false;
        }
        self.visible = false;
        true
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
}

#[derive(Debug, Default)]
pub struct ConnectionBanner {
    state: ConnectionState,
}

impl ConnectionBanner {
    pub fn show_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub fn show_connected(&mut self) {
        self.state = ConnectionState::Connected;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the "waiting for connection" overlay is shown.
    pub fn overlay_visible(&self) -> bool {
        self.state == ConnectionState::Connecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_ticket_is_due_after_display_duration() {
        let now = Instant::now();
        let mut notice = ErrorNotice::default();
        let ticket = notice.show_error("Disconnected", Duration::from_millis(1100), now);

        assert!(notice.is_visible());
        assert_eq!(notice.text(), "Disconnected");
        assert_eq!(ticket.deadline(), now + Duration::from_millis(1100));
        assert!(notice.dismiss(ticket));
        assert!(!notice.is_visible());
        assert!(!notice.dismiss(ticket));
    }

    #[test]
    fn later_error_supersedes_earlier_dismissal() {
        let now = Instant::now();
        let mut notice = ErrorNotice::default();
        let first = notice.show_error("first", Duration::from_millis(500), now);
        let second = notice.show_error("second", Duration::from_millis(1100), now);

        assert!(!notice.dismiss(first));
        assert!(notice.is_visible());
        assert_eq!(notice.text(), "second");
        assert!(notice.dismiss(second));
        assert!(!notice.is_visible());
    }

    #[test]
    fn banner_follows_transport_lifecycle() {
        let mut banner = ConnectionBanner::default();
        assert_eq!(banner.state(), ConnectionState::Connecting);
        assert!(banner.overlay_visible());

        banner.show_connected();
        assert!(!banner.overlay_visible());

        banner.show_connecting();
        assert_eq!(banner.state(), ConnectionState::Connecting);
    }
}
