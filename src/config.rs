//! Server configuration: TOML file, then environment, then command line.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Admin account created at startup when missing.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    /// Login email.
    email: String,
    /// Plain-text password, hashed before storage.
    password: String,
    /// Display name.
    #[serde(default = "default_admin_name")]
    full_name: String,
}

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    port: u16,

    /// SQLite database file.
    #[serde(default = "default_database_url")]
    database_url: String,

    /// HMAC secret for signing tokens. Must not be empty.
    #[serde(default)]
    jwt_secret: String,

    /// Token lifetime in days.
    #[serde(default = "default_token_ttl_days")]
    token_ttl_days: i64,

    /// Origin allowed by CORS.
    #[serde(default = "default_client_origin")]
    client_origin: String,

    /// Include internal error detail in 500 responses.
    #[serde(default)]
    expose_errors: bool,

    /// Admin account ensured at startup.
    #[serde(default)]
    #[setters(strip_option)]
    bootstrap_admin: Option<BootstrapAdmin>,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    5000
}

#[instrument]
fn default_database_url() -> String {
    "vuot_vu_mon.db".to_string()
}

#[instrument]
fn default_token_ttl_days() -> i64 {
    30
}

#[instrument]
fn default_client_origin() -> String {
    "http://localhost:5173".to_string()
}

#[instrument]
fn default_admin_name() -> String {
    "Administrator".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            jwt_secret: String::new(),
            token_ttl_days: default_token_ttl_days(),
            client_origin: default_client_origin(),
            expose_errors: false,
            bootstrap_admin: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid configuration.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Overlays values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric or boolean variable does not parse.
    #[instrument(skip(self))]
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlays values looked up through `lookup`.
    ///
    /// Recognised keys: `VVM_HOST`, `VVM_PORT`, `DATABASE_URL`, `JWT_SECRET`,
    /// `JWT_EXPIRES_IN_DAYS`, `CLIENT_URL`, `VVM_EXPOSE_ERRORS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric or boolean value does not parse.
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VVM_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("VVM_PORT") {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid VVM_PORT '{}': {}", port, e)))?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(days) = lookup("JWT_EXPIRES_IN_DAYS") {
            self.token_ttl_days = days.parse().map_err(|e| {
                ConfigError::new(format!("Invalid JWT_EXPIRES_IN_DAYS '{}': {}", days, e))
            })?;
        }
        if let Some(origin) = lookup("CLIENT_URL") {
            self.client_origin = origin;
        }
        if let Some(flag) = lookup("VVM_EXPOSE_ERRORS") {
            self.expose_errors = match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::new(format!(
                        "Invalid VVM_EXPOSE_ERRORS '{}'",
                        other
                    )));
                }
            };
        }
        Ok(self)
    }

    /// Checks that the configuration can start a server.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is empty or the token lifetime is
    /// not positive.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::new(
                "jwt_secret is empty; set JWT_SECRET or jwt_secret in the config file".to_string(),
            ));
        }
        if self.token_ttl_days <= 0 {
            return Err(ConfigError::new(format!(
                "token_ttl_days must be positive, got {}",
                self.token_ttl_days
            )));
        }
        if self.expose_errors {
            warn!("Internal error details will be included in responses");
        }
        Ok(())
    }

    /// The socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = ServerConfig::from_toml("jwt_secret = \"s3cret\"\n").unwrap();
        assert_eq!(config.port(), &5000);
        assert_eq!(config.token_ttl_days(), &30);
        assert_eq!(config.client_origin(), "http://localhost:5173");
        assert!(config.bootstrap_admin().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bootstrap_admin_table() {
        let config = ServerConfig::from_toml(
            "jwt_secret = \"x\"\n[bootstrap_admin]\nemail = \"admin@example.com\"\npassword = \"admin123\"\n",
        )
        .unwrap();
        let admin = config.bootstrap_admin().as_ref().unwrap();
        assert_eq!(admin.email(), "admin@example.com");
        assert_eq!(admin.full_name(), "Administrator");
    }

    #[test]
    fn test_env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("VVM_PORT", "8080"),
            ("JWT_SECRET", "from-env"),
            ("VVM_EXPOSE_ERRORS", "true"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_toml("port = 7000\njwt_secret = \"file\"\n")
            .unwrap()
            .with_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port(), &8080);
        assert_eq!(config.jwt_secret(), "from-env");
        assert!(*config.expose_errors());
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = ServerConfig::default().with_vars(|k| (k == "VVM_PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_secret_fails_validation() {
        assert!(ServerConfig::default().validate().is_err());
        let ok = ServerConfig::default().with_jwt_secret("k".to_string());
        assert!(ok.validate().is_ok());
    }
}
