//! Process configuration, read once at startup from flags and environment.

use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

/// The only environment variable that configures the store URL.
pub const STORE_URL_VAR: &str = "MONGODB_URL";

/// Names other deployments have used for the store URL. Setting any of them
/// is a startup error so a typo never silently falls back to the default.
pub const STORE_URL_ALIASES: [&str; 3] = ["MONGO_URL", "MONGO_URI", "MONGODB_URI"];

#[derive(Parser, Debug, Clone)]
#[command(name = "todo-server", version, about = "REST service for todos")]
pub struct Config {
    /// Document store URL: mongodb://, mongodb+srv:// or memory://
    #[arg(long, env = "MONGODB_URL", default_value = "mongodb://localhost:27017")]
    pub mongodb_url: String,

    /// Database holding the todos collection
    #[arg(long, env = "TODO_DATABASE", default_value = "todo_db")]
    pub database: String,

    /// Bind host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Server selection and connect timeout for the store, in milliseconds
    #[arg(long, env = "TODO_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,
}

/// Which repository backend the store URL selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUrl {
    Mongo(String),
    Memory,
}

impl Config {
    /// Check the store configuration. `lookup` reads an environment variable.
    pub fn validate(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<StoreUrl, ConfigError> {
        check_store_aliases(lookup)?;
        self.store_url()
    }

    pub fn store_url(&self) -> Result<StoreUrl, ConfigError> {
        let url = self.mongodb_url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyStoreUrl);
        }
        if url.starts_with("memory://") {
            return Ok(StoreUrl::Memory);
        }
        if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
            return Ok(StoreUrl::Mongo(url.to_string()));
        }
        let scheme = url.split("://").next().unwrap_or(url);
        Err(ConfigError::UnsupportedScheme(scheme.to_string()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn check_store_aliases(lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    match STORE_URL_ALIASES.into_iter().find(|name| lookup(name).is_some()) {
        Some(alias) => Err(ConfigError::StoreUrlAlias {
            alias,
            canonical: STORE_URL_VAR,
        }),
        None => Ok(()),
    }
}
