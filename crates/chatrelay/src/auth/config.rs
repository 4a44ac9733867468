//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accept `X-Dev-User` for configured dev users.
    pub dev_mode: bool,

    /// HS256 secret. Either a literal or `env:VAR_NAME`.
    /// Required when dev_mode is false.
    pub jwt_secret: Option<String>,

    /// Development users (only used in dev mode).
    pub dev_users: Vec<DevUser>,

    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            jwt_secret: None,
            dev_users: Vec::new(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        let Some(value) = &self.jwt_secret else {
            return Ok(None);
        };

        match value.strip_prefix("env:") {
            Some(var_name) => match std::env::var(var_name) {
                Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
            },
            None => Ok(Some(value.clone())),
        }
    }

    /// Validate the configuration for the current mode.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = self.resolve_jwt_secret()?;

        match secret {
            None if !self.dev_mode => Err(ConfigValidationError::MissingJwtSecret),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                Err(ConfigValidationError::JwtSecretTooShort)
            }
            _ => Ok(()),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required when dev_mode is false. Set CHATRELAY__AUTH__JWT_SECRET or auth.jwt_secret in config."
    )]
    MissingJwtSecret,

    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,

    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),

    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}

/// Development user configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
#[allow(clippy::field_reassign_with_default)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(!config.dev_mode);
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.validate(), Err(ConfigValidationError::MissingJwtSecret));
    }

    #[test]
    fn test_dev_mode_needs_no_secret() {
        let mut config = AuthConfig::default();
        config.dev_mode = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some("short".to_string());
        assert_eq!(config.validate(), Err(ConfigValidationError::JwtSecretTooShort));

        config.jwt_secret = Some("x".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_secret_resolution() {
        let mut config = AuthConfig::default();
        config.jwt_secret = Some("env:CHATRELAY_TEST_SECRET_THAT_IS_NOT_SET".to_string());
        assert_eq!(
            config.resolve_jwt_secret(),
            Err(ConfigValidationError::EnvVarNotFound(
                "CHATRELAY_TEST_SECRET_THAT_IS_NOT_SET".to_string()
            ))
        );

        config.jwt_secret = Some("literal-secret".to_string());
        assert_eq!(
            config.resolve_jwt_secret(),
            Ok(Some("literal-secret".to_string()))
        );
    }
}
