//! Config file commands.

use std::path::{Path, PathBuf};

use crate::config::{self, Config};

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Print where the config file lives.
pub fn cmd_config_path(custom: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", resolve_path(custom)?.display());
    Ok(())
}

/// Write the default configuration, refusing to clobber unless `force`.
pub fn cmd_config_init(custom: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = resolve_path(custom)?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    config::save_to(&Config::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn resolve_path(custom: Option<&Path>) -> anyhow::Result<PathBuf> {
    match custom {
        Some(path) => Ok(path.to_path_buf()),
        None => config::config_path().ok_or_else(|| config::ConfigError::NoConfigDir.into()),
    }
}
