// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration data shape (§6). Loading it from a file or environment is
//! out of scope for this crate — the embedding binary is responsible for
//! that; this struct only describes what a loaded configuration looks like.

use std::path::PathBuf;

use serde::Deserialize;

fn default_jwt_token() -> String {
    "secret".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file.
    #[serde(default, rename = "databasefile")]
    pub database_file: PathBuf,

    /// Shared secret used to sign and verify bearer tokens.
    #[serde(default = "default_jwt_token", rename = "jwttoken")]
    pub jwt_token: String,

    /// `host:port` the REST server listens on. If absent the server does not start.
    #[serde(default, rename = "apiaddr")]
    pub api_addr: Option<String>,

    /// Serve Swagger/OpenAPI documentation (REST layer concern, out of scope here).
    #[serde(default, rename = "useswagger")]
    pub use_swagger: bool,

    /// Serve the static web UI directory (REST layer concern, out of scope here).
    #[serde(default, rename = "usewebdir")]
    pub use_webdir: bool,

    /// Generate synthetic temperature readings instead of reading 1-wire hardware.
    #[serde(default, rename = "generaterandomtemperature")]
    pub generate_random_temperature: bool,

    /// Thermal Sampler tick period, in milliseconds.
    #[serde(default, rename = "thermalupdateinterval")]
    pub thermal_update_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: PathBuf::new(),
            jwt_token: default_jwt_token(),
            api_addr: None,
            use_swagger: false,
            use_webdir: false,
            generate_random_temperature: false,
            thermal_update_interval_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_jwt_token_matches_spec_default() {
        assert_eq!(Config::default().jwt_token, "secret");
    }

    #[test]
    fn deserializes_from_the_documented_json_shape() {
        let json = r#"{
            "databasefile": "/var/lib/panelctl/panel.db",
            "thermalupdateinterval": 5000,
            "generaterandomtemperature": true
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.database_file, PathBuf::from("/var/lib/panelctl/panel.db"));
        assert_eq!(config.jwt_token, "secret");
        assert_eq!(config.thermal_update_interval_ms, 5000);
        assert!(config.generate_random_temperature);
    }
}
