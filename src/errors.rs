// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecipeshardError {
    /// Invalid configuration detected before any build starts (bad shard
    /// index, missing config for a filtering mode, malformed config file).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The dependency graph over the selected recipes is not acyclic.
    #[error("Cycle detected in dependency graph: {0}")]
    DagCycle(String),

    /// Recipe metadata could not be loaded or rendered.
    #[error("Failed to render recipe {recipe}: {message}")]
    Render { recipe: String, message: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RecipeshardError {
    pub fn render(recipe: impl ToString, message: impl ToString) -> Self {
        RecipeshardError::Render {
            recipe: recipe.to_string(),
            message: message.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RecipeshardError>;
