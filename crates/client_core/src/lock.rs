use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::{
    domain::LockKind,
    protocol::{ClientRequest, LockRequest},
};
use tracing::info;

use crate::{sync::ControlStateSync, transport::TransportError};

/// How a lock button reacts when the page carries no `authtoken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Without a token the click has no visual effect and sends nothing.
    RequireToken,
    /// The click always toggles and sends; a missing token is sent as `""`.
    AlwaysToggle,
}

impl fmt::Display for LockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockPolicy::RequireToken => "require_token",
            LockPolicy::AlwaysToggle => "always_toggle",
        })
    }
}

impl FromStr for LockPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "require_token" => Ok(LockPolicy::RequireToken),
            "always_toggle" => Ok(LockPolicy::AlwaysToggle),
            other => Err(format!("unknown lock policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockToggleOutcome {
    NotALock,
    Suppressed,
    Toggled { engaged: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOverride {
    policies: BTreeMap<LockKind, LockPolicy>,
}

impl Default for LockOverride {
    fn default() -> Self {
        Self::new()
            .with_policy(LockKind::Olga, LockPolicy::RequireToken)
            .with_policy(LockKind::Laser, LockPolicy::AlwaysToggle)
    }
}

impl LockOverride {
    /// Empty policy table. Every lock falls back to [`LockPolicy::RequireToken`]
    /// until configured with [`LockOverride::with_policy`].
    pub fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    pub fn with_policy(mut self, kind: LockKind, policy: LockPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    /// Configured policy for `kind`, or `RequireToken` when none was set.
    pub fn policy(&self, kind: LockKind) -> LockPolicy {
        self.policies
            .get(&kind)
            .copied()
            .unwrap_or(LockPolicy::RequireToken)
    }

    pub fn handle_lock_toggle(
        &self,
        sync: &mut ControlStateSync,
        control_name: &str,
        auth_token: Option<&str>,
    ) -> Result<LockToggleOutcome, TransportError> {
        let Some(kind) = sync.lock_kind_of(control_name) else {
            return Ok(LockToggleOutcome::NotALock);
        };
        let token = auth_token.filter(|token| !token.is_empty());
        let policy = self.policy(kind);
        if policy == LockPolicy::RequireToken && token.is_none() {
            info!(lock = %kind, %policy, "lock: toggle suppressed without auth token");
            return Ok(LockToggleOutcome::Suppressed);
        }

        let engaged = !sync.lock_engaged(kind);
        sync.set_lock(kind, engaged);
        info!(lock = %kind, engaged, "lock: toggled locally");
        sync.send(ClientRequest::Lock(LockRequest {
            kind,
            locked: engaged,
            auth_token: token.unwrap_or_default().to_string(),
        }))?;
        Ok(LockToggleOutcome::Toggled { engaged })
    }

    /// Applies a lock flag pushed by the server without touching other groups.
    pub fn apply_remote_lock(&self, sync: &mut ControlStateSync, kind: LockKind, locked: bool) -> bool {
        sync.set_lock(kind, locked)
    }
}
