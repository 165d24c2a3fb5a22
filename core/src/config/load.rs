use std::path::Path;

use anyhow::Context;

use super::types::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "arbor.toml";

pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// `./arbor.toml` if present, defaults otherwise. Environment overrides apply
/// in both cases.
pub fn load_default() -> anyhow::Result<AppConfig> {
    let local_config = Path::new(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return load_from_path(local_config);
    }

    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Some(v) = env_value("ARBOR_ORDER_SEED") {
        let seed = v
            .parse::<u64>()
            .with_context(|| format!("ARBOR_ORDER_SEED is not a number: {v}"))?;
        cfg.order.seed = Some(seed);
    }
    if let Some(v) = env_value("ARBOR_FILTER") {
        cfg.filter.pattern = Some(v);
    }
    if let Some(v) = env_value("ARBOR_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
