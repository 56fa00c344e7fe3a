use std::sync::Arc;

use crate::hub::{is_local_token, HubHandle};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) hub: HubHandle,
    local_token: Arc<str>,
}

impl AppState {
    pub(crate) fn new(hub: HubHandle, local_token: &str) -> Self {
        Self {
            hub,
            local_token: Arc::from(local_token),
        }
    }

    /// Whether a socket opened with this `authtoken` belongs to the local panel.
    pub(crate) fn is_local_socket(&self, authtoken: Option<&str>) -> bool {
        authtoken.is_some_and(|token| is_local_token(&self.local_token, token))
    }
}
