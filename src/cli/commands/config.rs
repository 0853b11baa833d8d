//! Config file command.

use crate::config::{Config, config_path};

/// Show or create the config file
pub fn cmd_config(config: &Config, show: bool, init: bool) -> anyhow::Result<()> {
    if init {
        match config_path() {
            Some(path) if path.exists() => println!("Config already exists at {}", path.display()),
            _ => {
                let path = Config::default().save()?;
                println!("Wrote default config to {}", path.display());
            }
        }
    }

    if show {
        print!("{}", config.to_toml()?);
    } else if !init {
        match config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("Could not determine config directory"),
        }
    }
    Ok(())
}
