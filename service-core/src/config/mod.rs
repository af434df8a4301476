use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::default().ignore_empty(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Reads a required variable through `lookup`. Empty values count as unset.
pub fn required_var<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, key).ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!(
            "{} environment variable is required",
            key
        ))
    })
}

pub fn optional_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.is_empty())
}

pub fn var_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, key).unwrap_or_else(|| default.to_string())
}

pub fn flag_var<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(false)
}

/// Process environment lookup for use with the `*_var` helpers.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
