use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use warble_core::config::{self, BASE_URL_ENV, WarbleConfig};

use crate::output::Output;

/// Show current configuration
pub async fn show(config: &WarbleConfig, output: &Output) -> Result<()> {
    output.section("Current Configuration");
    output.print("");

    // Display the current config in TOML format
    let toml_str = toml::to_string_pretty(config).into_diagnostic()?;
    for line in toml_str.lines() {
        output.print(line);
    }

    output.print("");
    output.kv("Effective base URL", &config.server.effective_base_url());
    if std::env::var(BASE_URL_ENV).is_ok() {
        output.status(&format!("(overridden by {})", BASE_URL_ENV));
    }
    output.kv(
        "Auth database",
        &config.database.auth_db().display().to_string(),
    );

    Ok(())
}

/// Save current configuration to file
pub async fn save(config: &WarbleConfig, path: &PathBuf, output: &Output) -> Result<()> {
    output.info(
        "Saving configuration to:",
        &path.display().to_string(),
    );

    config::save_config(config, path).await?;

    output.success("Configuration saved!");
    output.print("");
    output.status("To use this configuration, run:");
    output.status(&format!(
        "{} --config {}",
        "warble".bright_green(),
        path.display()
    ));

    Ok(())
}
