pub mod auth;
pub mod layout;
pub mod lock;
pub mod notice;
pub mod panel;
pub mod runtime;
pub mod sync;
pub mod transport;

pub use auth::{auth_token, auth_token_from_str, AUTH_TOKEN_PARAM};
pub use layout::{ControlLayout, GroupDef};
pub use lock::{LockOverride, LockPolicy, LockToggleOutcome};
pub use notice::{ConnectionBanner, ConnectionState, DismissTicket, ErrorNotice};
pub use panel::{ControlPanel, GroupView, OptionView, PanelOptions, PanelView, DEFAULT_ERROR_DISPLAY};
pub use runtime::{PanelEvent, PanelRuntime, UserAction};
pub use sync::{ControlGroup, ControlStateSync};
pub use transport::{
    decode_frame, ChannelSink, MessageSink, TransportError, TransportEvent, WsTransport,
};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
