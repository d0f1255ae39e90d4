//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use deckcraft_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            output.json(&serde_json::json!({
                "data_dir": config.data_dir,
                "export_dir": config.export_dir(),
                "history_debounce_ms": config.history_debounce_ms,
                "export_scale": config.export_scale,
                "compression_level": config.compression_level,
                "status_linger_ms": config.status_linger_ms,
                "log_level": config.log_level,
                "log_file": config.log_file,
            }));
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  export_dir:          {}", config.export_dir().display());
            println!("  history_debounce_ms: {}", config.history_debounce_ms);
            println!("  export_scale:        {}", config.export_scale);
            println!("  compression_level:   {}", config.compression_level);
            println!("  status_linger_ms:    {}", config.status_linger_ms);
            println!(
                "  log_level:           {}",
                config.log_level.as_deref().unwrap_or("(not set)")
            );
            println!("  log_file:            {}", display_or_unset(&config.log_file));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn display_or_unset(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
