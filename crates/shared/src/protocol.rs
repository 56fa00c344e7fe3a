use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{LockKind, VentilationRequest, VentilationState, DAMPER1, DAMPER2, DAMPER3, FAN},
    error::{ProtocolError, WsError},
};

/// Payload field carrying the page's `authtoken` query parameter.
pub const AUTH_TOKEN_FIELD: &str = "authtoken";

/// Logical channel within the single socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    VentChange,
    Error,
    LockLaser,
    LockOlga,
}

impl Context {
    pub const ALL: [Context; 4] = [
        Context::VentChange,
        Context::Error,
        Context::LockLaser,
        Context::LockOlga,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Context::VentChange => "ventchange",
            Context::Error => "error",
            Context::LockLaser => "locklaser",
            Context::LockOlga => "lockolga",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ctx| ctx.as_str() == raw)
    }

    pub fn for_lock(kind: LockKind) -> Self {
        match kind {
            LockKind::Olga => Context::LockOlga,
            LockKind::Laser => Context::LockLaser,
        }
    }

    pub fn lock_kind(self) -> Option<LockKind> {
        match self {
            Context::LockOlga => Some(LockKind::Olga),
            Context::LockLaser => Some(LockKind::Laser),
            Context::VentChange | Context::Error => None,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON text frame exchanged in both directions: `{"ctx": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub ctx: String,
    #[serde(default)]
    pub data: Value,
}

impl WireMessage {
    pub fn new(ctx: Context, data: Value) -> Self {
        Self {
            ctx: ctx.as_str().to_string(),
            data,
        }
    }

    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Envelope)
    }

    pub fn to_text(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Envelope)
    }
}

/// Flat snapshot of the active option per control group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlState(BTreeMap<String, Value>);

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: impl Into<String>, value: Value) {
        self.0.insert(group.into(), value);
    }

    pub fn insert_option(&mut self, group: impl Into<String>, option: impl Into<String>) {
        self.insert(group, Value::String(option.into()));
    }

    pub fn get(&self, group: &str) -> Option<&Value> {
        self.0.get(group)
    }

    /// Active option of `group`, `None` when absent or falsy.
    pub fn option(&self, group: &str) -> Option<String> {
        self.0.get(group).and_then(option_value)
    }

    /// Entries whose value selects an option; falsy entries are skipped.
    pub fn active_options(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.0
            .iter()
            .filter_map(|(group, value)| option_value(value).map(|option| (group.as_str(), option)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.0.iter().map(|(group, value)| (group.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_payload(ctx: Context, data: Value) -> Result<Self, ProtocolError> {
        match data {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            _ => Err(ProtocolError::NotAnObject { ctx: ctx.as_str() }),
        }
    }

    fn to_payload(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(group, value)| (group.clone(), value.clone()))
                .collect::<Map<_, _>>(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ControlState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (group, option) in iter {
            state.insert_option(group, option);
        }
        state
    }
}

impl From<&VentilationState> for ControlState {
    fn from(state: &VentilationState) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert_option(DAMPER1, state.vent.damper1.as_str());
        snapshot.insert_option(DAMPER2, state.vent.damper2.as_str());
        snapshot.insert_option(DAMPER3, state.vent.damper3.as_str());
        snapshot.insert_option(FAN, state.vent.fan.as_str());
        for kind in LockKind::ALL {
            snapshot.insert(kind.flag_name(), Value::Bool(state.lock(kind)));
        }
        snapshot
    }
}

impl TryFrom<&ControlState> for VentilationRequest {
    type Error = serde_json::Error;

    fn try_from(state: &ControlState) -> Result<Self, Self::Error> {
        serde_json::from_value(state.to_payload())
    }
}

/// Option selected by a snapshot value, following the panel's truthiness rules:
/// `null`, `false`, `0` and `""` select nothing, other scalars select their
/// string form. Arrays and objects never name an option.
pub fn option_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(number) => {
            if number.as_f64() == Some(0.0) {
                None
            } else {
                Some(number.to_string())
            }
        }
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub kind: LockKind,
    pub locked: bool,
    pub auth_token: String,
}

impl LockRequest {
    fn to_payload(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.kind.flag_name().to_string(), Value::Bool(self.locked));
        map.insert(
            AUTH_TOKEN_FIELD.to_string(),
            Value::String(self.auth_token.clone()),
        );
        Value::Object(map)
    }

    fn from_payload(kind: LockKind, data: &Value) -> Result<Self, ProtocolError> {
        let ctx = Context::for_lock(kind).as_str();
        let Value::Object(map) = data else {
            return Err(ProtocolError::NotAnObject { ctx });
        };
        let locked = map
            .get(kind.flag_name())
            .and_then(Value::as_bool)
            .ok_or(ProtocolError::MissingFlag {
                ctx,
                flag: kind.flag_name(),
            })?;
        let auth_token = map
            .get(AUTH_TOKEN_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            kind,
            locked,
            auth_token,
        })
    }
}

/// Messages a panel sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    VentChange(ControlState),
    Lock(LockRequest),
}

impl ClientRequest {
    pub fn context(&self) -> Context {
        match self {
            ClientRequest::VentChange(_) => Context::VentChange,
            ClientRequest::Lock(request) => Context::for_lock(request.kind),
        }
    }

    pub fn to_wire(&self) -> WireMessage {
        let data = match self {
            ClientRequest::VentChange(state) => state.to_payload(),
            ClientRequest::Lock(request) => request.to_payload(),
        };
        WireMessage::new(self.context(), data)
    }

    /// Decodes a client frame; `Ok(None)` for contexts a client never sends.
    pub fn decode(wire: WireMessage) -> Result<Option<Self>, ProtocolError> {
        let Some(ctx) = Context::parse(&wire.ctx) else {
            return Ok(None);
        };
        match ctx {
            Context::VentChange => {
                ControlState::from_payload(ctx, wire.data).map(|state| Some(Self::VentChange(state)))
            }
            Context::LockLaser | Context::LockOlga => {
                let Some(kind) = ctx.lock_kind() else {
                    return Ok(None);
                };
                LockRequest::from_payload(kind, &wire.data).map(|request| Some(Self::Lock(request)))
            }
            Context::Error => Ok(None),
        }
    }
}

/// Messages the server pushes to panels.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    VentChange(ControlState),
    LockChanged { kind: LockKind, locked: bool },
    Error(WsError),
}

impl ServerEvent {
    pub fn context(&self) -> Context {
        match self {
            ServerEvent::VentChange(_) => Context::VentChange,
            ServerEvent::LockChanged { kind, .. } => Context::for_lock(*kind),
            ServerEvent::Error(_) => Context::Error,
        }
    }

    pub fn to_wire(&self) -> WireMessage {
        let data = match self {
            ServerEvent::VentChange(state) => state.to_payload(),
            ServerEvent::LockChanged { kind, locked } => {
                let mut map = Map::new();
                map.insert(kind.flag_name().to_string(), Value::Bool(*locked));
                Value::Object(map)
            }
            ServerEvent::Error(error) => {
                let mut map = Map::new();
                if let Some(kind) = error.kind {
                    map.insert("type".to_string(), Value::String(kind.as_str().to_string()));
                }
                map.insert("msg".to_string(), Value::String(error.msg.clone()));
                Value::Object(map)
            }
        };
        WireMessage::new(self.context(), data)
    }

    /// Decodes a server frame; `Ok(None)` for unknown contexts.
    pub fn decode(wire: WireMessage) -> Result<Option<Self>, ProtocolError> {
        let Some(ctx) = Context::parse(&wire.ctx) else {
            return Ok(None);
        };
        match ctx {
            Context::VentChange => {
                ControlState::from_payload(ctx, wire.data).map(|state| Some(Self::VentChange(state)))
            }
            Context::Error => serde_json::from_value::<WsError>(wire.data)
                .map(|error| Some(Self::Error(error)))
                .map_err(|source| ProtocolError::Payload {
                    ctx: ctx.as_str(),
                    source,
                }),
            Context::LockLaser | Context::LockOlga => {
                let Some(kind) = ctx.lock_kind() else {
                    return Ok(None);
                };
                let locked = wire
                    .data
                    .get(kind.flag_name())
                    .map(|value| option_value(value).is_some())
                    .ok_or(ProtocolError::MissingFlag {
                        ctx: ctx.as_str(),
                        flag: kind.flag_name(),
                    })?;
                Ok(Some(Self::LockChanged { kind, locked }))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
