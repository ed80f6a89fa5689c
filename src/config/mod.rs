//! Configuration module.
//!
//! Loads configuration from environment variables, plus the seed template
//! new guilds are created from.

use std::env;
use std::path::Path;

use crate::database::models::GuildConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Optional JSON file overriding the stock guild seed template.
    pub guild_defaults_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "garrison".to_string()),
            guild_defaults_path: env::var("GUILD_DEFAULTS_PATH").ok(),
        }
    }

    /// The guild seed template: the configured file when set, stock
    /// defaults otherwise.
    pub fn guild_defaults(&self) -> anyhow::Result<GuildDefaults> {
        match &self.guild_defaults_path {
            Some(path) => GuildDefaults::from_file(path),
            None => Ok(GuildDefaults::default()),
        }
    }
}

/// Template new guilds are seeded from on first access.
///
/// The stock template is an empty configuration at the current schema
/// version; deployments can override it with a JSON file.
#[derive(Debug, Clone, Default)]
pub struct GuildDefaults {
    template: GuildConfig,
}

impl GuildDefaults {
    pub fn new(template: GuildConfig) -> Self {
        Self { template }
    }

    /// Load a template from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut template: GuildConfig = serde_json::from_str(&raw)?;
        template.ensure_defaults();
        Ok(Self { template })
    }

    pub fn template(&self) -> &GuildConfig {
        &self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_defaults_are_valid() {
        let defaults = GuildDefaults::default();
        assert_eq!(defaults.template().schema_version, 1);
        assert!(defaults.template().role_sets.is_empty());
    }
}
