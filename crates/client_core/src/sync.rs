use std::sync::Arc;

use shared::{
    domain::{LockKind, LOCK_ENGAGED},
    protocol::{ClientRequest, ControlState},
};
use tracing::debug;

use crate::{
    layout::ControlLayout,
    transport::{MessageSink, TransportError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroup {
    name: String,
    options: Vec<String>,
    active: Option<String>,
    lock: Option<LockKind>,
}

impl ControlGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn active_option(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn lock(&self) -> Option<LockKind> {
        self.lock
    }
}

/// In-memory control state of a panel and its synchronization with the server.
///
/// Each group holds at most one active option. Local selections are published
/// as full [`ControlState`] snapshots; inbound snapshots replace the whole state.
pub struct ControlStateSync {
    groups: Vec<ControlGroup>,
    sink: Arc<dyn MessageSink>,
}

impl ControlStateSync {
    pub fn new(layout: &ControlLayout, sink: Arc<dyn MessageSink>) -> Self {
        let groups = layout
            .groups()
            .iter()
            .map(|def| ControlGroup {
                name: def.name.clone(),
                options: def.options.clone(),
                active: None,
                lock: def.lock,
            })
            .collect();
        Self { groups, sink }
    }

    pub fn groups(&self) -> &[ControlGroup] {
        &self.groups
    }

    pub fn active_option(&self, group: &str) -> Option<&str> {
        self.group(group).and_then(ControlGroup::active_option)
    }

    /// Clears every group, then activates the options named by truthy entries.
    pub fn apply_remote_state(&mut self, snapshot: &ControlState) {
        for group in &mut self.groups {
            group.active = None;
        }
        for (group, option) in snapshot.active_options() {
            if !self.mark_active(group, &option) {
                debug!(group, option = %option, "sync: ignoring unknown group/option in snapshot");
            }
        }
    }

    /// Activates `option` in `group` and publishes the resulting snapshot.
    /// Returns `Ok(false)` without publishing when the pair is unknown or
    /// names a lock group; locks only change through `LockOverride`.
    pub fn handle_local_selection(
        &mut self,
        group: &str,
        option: &str,
    ) -> Result<bool, TransportError> {
        if let Some(kind) = self.lock_kind_of(group) {
            debug!(lock = %kind, option, "sync: ignoring plain selection of a lock group");
            return Ok(false);
        }
        if !self.mark_active(group, option) {
            debug!(group, option, "sync: ignoring selection of unknown group/option");
            return Ok(false);
        }
        self.publish_local_state()?;
        Ok(true)
    }

    pub fn publish_local_state(&self) -> Result<(), TransportError> {
        let snapshot = self.snapshot();
        debug!(groups = snapshot.len(), "sync: publishing control state");
        self.send(ClientRequest::VentChange(snapshot))
    }

    /// Full snapshot of the active option of every group.
    pub fn snapshot(&self) -> ControlState {
        self.groups
            .iter()
            .filter_map(|group| {
                group
                    .active
                    .as_ref()
                    .map(|option| (group.name.clone(), option.clone()))
            })
            .collect()
    }

    pub fn lock_kind_of(&self, group: &str) -> Option<LockKind> {
        self.group(group).and_then(ControlGroup::lock)
    }

    pub fn lock_engaged(&self, kind: LockKind) -> bool {
        self.groups
            .iter()
            .find(|group| group.lock == Some(kind))
            .and_then(ControlGroup::active_option)
            == Some(LOCK_ENGAGED)
    }

    pub(crate) fn set_lock(&mut self, kind: LockKind, engaged: bool) -> bool {
        let Some(group) = self.groups.iter_mut().find(|group| group.lock == Some(kind)) else {
            return false;
        };
        group.active = engaged.then(|| LOCK_ENGAGED.to_string());
        true
    }

    pub(crate) fn send(&self, request: ClientRequest) -> Result<(), TransportError> {
        self.sink.send(request)
    }

    fn mark_active(&mut self, group: &str, option: &str) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.name == group) else {
            return false;
        };
        if !group.options.iter().any(|candidate| candidate == option) {
            return false;
        }
        group.active = Some(option.to_string());
        true
    }

    fn group(&self, name: &str) -> Option<&ControlGroup> {
        self.groups.iter().find(|group| group.name == name)
    }
}
