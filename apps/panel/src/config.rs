use std::{path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{LockOverride, LockPolicy, PanelOptions, DEFAULT_ERROR_DISPLAY};
use shared::{domain::LockKind, settings::load_layered};
use url::Url;

const KEYS: [&str; 6] = [
    "server_url",
    "page_url",
    "error_display_ms",
    "reconnect_delay_ms",
    "olga_lock_policy",
    "laser_lock_policy",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub server_url: String,
    /// Page the panel pretends to be hosted on; its `authtoken` unlocks locks.
    pub page_url: String,
    pub error_display: Duration,
    pub reconnect_delay: Duration,
    pub olga_lock_policy: LockPolicy,
    pub laser_lock_policy: LockPolicy,
}

impl Default for PanelSettings {
    fn default() -> Self {
        let locks = LockOverride::default();
        Self {
            server_url: "ws://127.0.0.1:8080/sock".to_string(),
            page_url: "http://127.0.0.1/".to_string(),
            error_display: DEFAULT_ERROR_DISPLAY,
            reconnect_delay: Duration::from_millis(2000),
            olga_lock_policy: locks.policy(LockKind::Olga),
            laser_lock_policy: locks.policy(LockKind::Laser),
        }
    }
}

impl PanelSettings {
    pub fn panel_options(&self) -> PanelOptions {
        PanelOptions {
            error_display: self.error_display,
            locks: LockOverride::default()
                .with_policy(LockKind::Olga, self.olga_lock_policy)
                .with_policy(LockKind::Laser, self.laser_lock_policy),
        }
    }

    pub fn page_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.page_url).with_context(|| format!("'{}' is not a url", self.page_url))
    }

    pub(crate) fn apply(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            "server_url" => self.server_url = parse_url(value)?,
            "page_url" => self.page_url = parse_url(value)?,
            "error_display_ms" => self.error_display = parse_millis(value)?,
            "reconnect_delay_ms" => self.reconnect_delay = parse_millis(value)?,
            "olga_lock_policy" => self.olga_lock_policy = value.parse().map_err(|e: String| anyhow!(e))?,
            "laser_lock_policy" => self.laser_lock_policy = value.parse().map_err(|e: String| anyhow!(e))?,
            _ => tracing::warn!(key, "config: ignoring unknown setting"),
        }
        Ok(())
    }
}

/// Defaults, then the TOML file (if present), then `APP__*` variables.
/// Command line flags are applied on top by the caller.
pub fn load_settings(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PanelSettings> {
    let mut settings = PanelSettings::default();
    load_layered(&mut settings, path, &KEYS, env, PanelSettings::apply)?;
    Ok(settings)
}

fn parse_url(value: &str) -> anyhow::Result<String> {
    Url::parse(value).with_context(|| format!("'{value}' is not a url"))?;
    Ok(value.to_string())
}

fn parse_millis(value: &str) -> anyhow::Result<Duration> {
    value
        .parse()
        .map(Duration::from_millis)
        .with_context(|| format!("'{value}' is not a number of milliseconds"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
