use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default fanout data directory: ~/.fanout
pub fn get_fanout_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".fanout"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.fanout/config.toml (highest)
    let fanout_dir = get_fanout_data_dir()?;
    let user_config = fanout_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = fanout_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest). Empty values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, get: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("FANOUT_EXECUTOR_ENABLED") {
        cfg.executor.enabled = parse_bool(&v)
            .ok_or_else(|| anyhow::anyhow!("FANOUT_EXECUTOR_ENABLED: not a boolean: {v}"))?;
    }
    if let Some(v) = var("FANOUT_MAX_CONCURRENT_TASKS") {
        let n: usize = v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("FANOUT_MAX_CONCURRENT_TASKS: {e}"))?;
        // 0 is ignored, same as the runtime setter
        if n > 0 {
            cfg.executor.max_concurrent_tasks = n;
        }
    }
    if let Some(v) = var("FANOUT_MAX_RETRIES") {
        cfg.executor.retry.max_retries = v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("FANOUT_MAX_RETRIES: {e}"))?;
    }
    if let Some(v) = var("FANOUT_BASE_DELAY_MS") {
        cfg.executor.retry.base_delay_ms = v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("FANOUT_BASE_DELAY_MS: {e}"))?;
    }
    if let Some(v) = var("FANOUT_TASK_FACTORY") {
        cfg.executor.task_factory = v.trim().to_string();
    }
    if let Some(v) = var("FANOUT_LOG_LEVEL") {
        cfg.logging.level = v.trim().to_string();
    }

    Ok(())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
