use shared::domain::{
    DamperPosition, FanState, LockKind, DAMPER1, DAMPER2, DAMPER3, FAN, LOCK_ENGAGED,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDef {
    pub name: String,
    pub options: Vec<String>,
    pub lock: Option<LockKind>,
}

/// Declares which control groups a panel shows and which options each offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlLayout {
    groups: Vec<GroupDef>,
}

impl ControlLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Damper/fan selectors plus both lock groups.
    pub fn ventilation() -> Self {
        let dampers: Vec<&str> = DamperPosition::ALL.iter().map(|d| d.as_str()).collect();
        let fan: Vec<&str> = FanState::ALL.iter().map(|f| f.as_str()).collect();
        Self::new()
            .with_group(DAMPER1, dampers.iter().copied())
            .with_group(DAMPER2, dampers.iter().copied())
            .with_group(DAMPER3, dampers.iter().copied())
            .with_group(FAN, fan)
            .with_lock(LockKind::Olga)
            .with_lock(LockKind::Laser)
    }

    pub fn with_group<I, S>(mut self, name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(GroupDef {
            name: name.into(),
            options: options.into_iter().map(Into::into).collect(),
            lock: None,
        });
        self
    }

    /// Adds the lock group for `kind`; its single option is [`LOCK_ENGAGED`].
    pub fn with_lock(mut self, kind: LockKind) -> Self {
        self.push(GroupDef {
            name: kind.flag_name().to_string(),
            options: vec![LOCK_ENGAGED.to_string()],
            lock: Some(kind),
        });
        self
    }

    pub fn groups(&self) -> &[GroupDef] {
        &self.groups
    }

    fn push(&mut self, def: GroupDef) {
        // a later declaration replaces an earlier one with the same name
        self.groups.retain(|existing| existing.name != def.name);
        self.groups.push(def);
    }
}
