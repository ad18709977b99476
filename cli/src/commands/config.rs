use fanout_core::api as core_api;

/// Handle config command
pub fn handle_config(cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let rendered = toml::to_string_pretty(cfg)
        .map_err(|e| core_api::CliError::Config(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(0)
}
