use std::{env, fmt::Display, str::FromStr};

use crate::{
    error::ConfigError,
    scanners::{device::QrBox, scanner::ScanOptions},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub scan_target: String,
    pub scan: ScanOptions,
    pub database_url: Option<String>,
    pub operator_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so it can be fed from something
    /// other than the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ScanOptions::default();
        let config = Self {
            scan_target: lookup("SCAN_TARGET").unwrap_or_else(|| "reader".to_string()),
            scan: ScanOptions {
                qrbox: QrBox {
                    width: parse(&lookup, "SCAN_BOX_WIDTH", defaults.qrbox.width)?,
                    height: parse(&lookup, "SCAN_BOX_HEIGHT", defaults.qrbox.height)?,
                },
                fps: parse(&lookup, "SCAN_FPS", defaults.fps)?,
            },
            database_url: lookup("DATABASE_URL"),
            operator_email: lookup("OPERATOR_EMAIL")
                .unwrap_or_else(|| "operator@localhost".to_string()),
        };
        config
            .scan
            .validate()
            .map_err(|e| ConfigError::Invalid {
                key: "SCAN_*",
                value: format!("{:?}", config.scan),
                reason: e.to_string(),
            })?;
        Ok(config)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
