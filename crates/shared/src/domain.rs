use std::fmt;

use serde::{Deserialize, Serialize};

pub const DAMPER1: &str = "Damper1";
pub const DAMPER2: &str = "Damper2";
pub const DAMPER3: &str = "Damper3";
pub const FAN: &str = "Fan";

/// Option value a lock group carries while the lock is engaged.
pub const LOCK_ENGAGED: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LockKind {
    #[serde(rename = "OLGALock")]
    Olga,
    #[serde(rename = "LaserLock")]
    Laser,
}

impl LockKind {
    pub const ALL: [LockKind; 2] = [LockKind::Olga, LockKind::Laser];

    /// Name of the control group (and payload flag) carrying this lock.
    pub fn flag_name(self) -> &'static str {
        match self {
            LockKind::Olga => "OLGALock",
            LockKind::Laser => "LaserLock",
        }
    }

    pub fn from_flag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.flag_name() == name)
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamperPosition {
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "halfopen")]
    HalfOpen,
    #[serde(rename = "open")]
    Open,
}

impl DamperPosition {
    pub const ALL: [DamperPosition; 3] = [
        DamperPosition::Closed,
        DamperPosition::HalfOpen,
        DamperPosition::Open,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DamperPosition::Closed => "closed",
            DamperPosition::HalfOpen => "halfopen",
            DamperPosition::Open => "open",
        }
    }

    pub fn is_closed(self) -> bool {
        self == DamperPosition::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanState {
    Off,
    On,
}

impl FanState {
    pub const ALL: [FanState; 2] = [FanState::Off, FanState::On];

    pub fn as_str(self) -> &'static str {
        match self {
            FanState::Off => "off",
            FanState::On => "on",
        }
    }
}

/// Damper and fan positions requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VentilationRequest {
    #[serde(rename = "Damper1")]
    pub damper1: DamperPosition,
    #[serde(rename = "Damper2")]
    pub damper2: DamperPosition,
    #[serde(rename = "Damper3")]
    pub damper3: DamperPosition,
    #[serde(rename = "Fan")]
    pub fan: FanState,
}

impl VentilationRequest {
    pub fn dampers(&self) -> [DamperPosition; 3] {
        [self.damper1, self.damper2, self.damper3]
    }

    pub fn all_dampers_closed(&self) -> bool {
        self.dampers().iter().all(|damper| damper.is_closed())
    }

    pub fn all_dampers_opened(&self) -> bool {
        self.dampers().iter().all(|damper| !damper.is_closed())
    }
}

impl Default for VentilationRequest {
    fn default() -> Self {
        Self {
            damper1: DamperPosition::Closed,
            damper2: DamperPosition::Closed,
            damper3: DamperPosition::Closed,
            fan: FanState::Off,
        }
    }
}

/// Authoritative ventilation state as broadcast by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VentilationState {
    #[serde(flatten)]
    pub vent: VentilationRequest,
    #[serde(rename = "OLGALock", default)]
    pub olga_lock: bool,
    #[serde(rename = "LaserLock", default)]
    pub laser_lock: bool,
}

impl VentilationState {
    pub fn lock(&self, kind: LockKind) -> bool {
        match kind {
            LockKind::Olga => self.olga_lock,
            LockKind::Laser => self.laser_lock,
        }
    }

    pub fn set_lock(&mut self, kind: LockKind, locked: bool) {
        match kind {
            LockKind::Olga => self.olga_lock = locked,
            LockKind::Laser => self.laser_lock = locked,
        }
    }
}
