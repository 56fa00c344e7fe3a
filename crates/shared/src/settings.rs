use std::{collections::HashMap, fs, io, path::Path};

use anyhow::Context;

/// Layers a TOML file (if present) and then `APP__<KEY>` variables over
/// `settings`, feeding every value through `apply` as a string.
///
/// File keys are passed through as written, so `apply` decides what is
/// unknown. Only `keys` are looked up in the environment.
pub fn load_layered<S>(
    settings: &mut S,
    path: &Path,
    keys: &[&str],
    env: impl Fn(&str) -> Option<String>,
    mut apply: impl FnMut(&mut S, &str, &str) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
                .with_context(|| format!("failed to parse '{}'", path.display()))?;
            for (key, value) in &file_cfg {
                let value = match value {
                    toml::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                apply(settings, key, &value)
                    .with_context(|| format!("invalid '{key}' in '{}'", path.display()))?;
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    for key in keys {
        let var = env_var_name(key);
        if let Some(value) = env(&var) {
            apply(settings, key, &value).with_context(|| format!("invalid {var}"))?;
        }
    }
    Ok(())
}

fn env_var_name(key: &str) -> String {
    format!("APP__{}", key.to_ascii_uppercase())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
