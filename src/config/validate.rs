// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RecipeshardError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RecipeshardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_channels(cfg)?;
    validate_matrix("env_matrix", &cfg.env_matrix)?;
    validate_matrix("variants", &cfg.variants)?;
    validate_tools(cfg)?;
    validate_index(cfg)?;
    Ok(())
}

fn validate_channels(cfg: &RawConfigFile) -> Result<()> {
    let listed = cfg.channels.iter().chain(cfg.check_channels.iter().flatten());
    for channel in listed {
        if channel.trim().is_empty() {
            return Err(RecipeshardError::ConfigError(
                "channel names must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_matrix(
    section: &str,
    matrix: &std::collections::BTreeMap<String, Vec<String>>,
) -> Result<()> {
    for (key, values) in matrix {
        if values.is_empty() {
            return Err(RecipeshardError::ConfigError(format!(
                "[{section}].{key} must list at least one value"
            )));
        }
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    let tools = &cfg.tools;
    let commands = [
        ("build", &tools.build),
        ("package_test", &tools.package_test),
        ("purge", &tools.purge),
        ("upload", &tools.upload),
        ("image_upload", &tools.image_upload),
    ];
    for (name, argv) in commands {
        if argv.is_empty() || argv[0].trim().is_empty() {
            return Err(RecipeshardError::ConfigError(format!(
                "[tools].{name} must name a program"
            )));
        }
    }

    if let Some(container) = &tools.container {
        if container.image.trim().is_empty() {
            return Err(RecipeshardError::ConfigError(
                "[tools.container].image must not be empty".to_string(),
            ));
        }
        if container.runtime.trim().is_empty() {
            return Err(RecipeshardError::ConfigError(
                "[tools.container].runtime must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_index(cfg: &RawConfigFile) -> Result<()> {
    for source in &cfg.index.sources {
        if source.path.as_os_str().is_empty() {
            return Err(RecipeshardError::ConfigError(format!(
                "index source for channel '{}' has an empty path",
                source.channel
            )));
        }
    }
    Ok(())
}
