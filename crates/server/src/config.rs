use std::{net::SocketAddr, path::Path, time::Duration};

use anyhow::Context;
use shared::settings::load_layered;

const SETTINGS_FILE: &str = "server.toml";
const KEYS: [&str; 3] = ["bind_addr", "local_token", "lock_timeout_secs"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Token the local touch panel presents; empty disables lock changes.
    pub local_token: String,
    pub lock_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            local_token: String::new(),
            lock_timeout: Duration::from_secs(30 * 60),
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file (if present), then `APP__*` variables.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    load_layered(&mut settings, path, &KEYS, env, apply)?;
    Ok(settings)
}

fn apply(settings: &mut Settings, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "bind_addr" => {
            settings.bind_addr = value
                .trim()
                .parse()
                .with_context(|| format!("'{value}' is not a socket address"))?;
        }
        "local_token" => settings.local_token = value.trim().to_string(),
        "lock_timeout_secs" => {
            let secs: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("'{value}' is not a number of seconds"))?;
            settings.lock_timeout = Duration::from_secs(secs);
        }
        _ => tracing::warn!(key, "config: ignoring unknown setting"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
