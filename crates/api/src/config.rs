//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MART_SESSION_SECRET` - Session cookie signing key (min 64 chars, high entropy)
//! - `IDENTITY_PROVIDER_URL` - Base URL of the identity provider's admin API
//! - `IDENTITY_PROVIDER_API_KEY` - Service credential for the identity provider
//! - `EMBEDDING_SERVICE_URL` - Base URL of the text embedding service
//!
//! ## Optional
//! - `MART_HOST` - Bind address (default: 127.0.0.1)
//! - `MART_PORT` - Listen port (default: 5050)
//! - `MART_ENV` - `development` or `production` (default: production)
//! - `CORS_ORIGIN` - Comma-separated list of allowed browser origins
//! - `PHONE_COUNTRY_CODE` - Prefix for local phone numbers (default: +234)
//! - `OTP_TTL_SECONDS` - One-time code lifetime (default: 300)
//! - `ASSET_BACKEND` - `cloudinary` or `local` (default: cloudinary)
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
//! - `ASSET_LOCAL_PATH`, `ASSET_PUBLIC_URL` - Used when `ASSET_BACKEND=local`
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM`
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// `tower-sessions` signing keys must carry at least 64 bytes.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
///
/// Controls cookie attributes: production sessions are `Secure` with
/// `SameSite=None` so a separately hosted frontend can send them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub environment: Environment,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Browser origins allowed to make credentialed requests
    pub cors_origins: Vec<String>,
    /// Dialing prefix prepended to locally formatted phone numbers
    pub phone_country_code: String,
    pub otp_ttl: Duration,
    pub identity: IdentityConfig,
    pub embedding: EmbeddingConfig,
    pub assets: AssetConfig,
    /// SMTP delivery; OTP emails are only logged when absent
    pub email: Option<EmailConfig>,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
    pub log_format: LogFormat,
}

/// External identity provider configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct IdentityConfig {
    pub base_url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: Url,
}

/// Where uploaded images are stored.
#[derive(Debug, Clone)]
pub enum AssetConfig {
    Cloudinary(CloudinaryConfig),
    Local {
        /// Directory files are written to
        root: PathBuf,
        /// Public URL prefix the directory is served under
        public_url: Url,
    },
}

/// Cloudinary upload API credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MART_DATABASE_URL")?;
        let host = parse_env("MART_HOST", "127.0.0.1")?;
        let port = parse_env("MART_PORT", "5050")?;
        let environment = match get_env_or_default("MART_ENV", "production").as_str() {
            "development" | "dev" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "MART_ENV".to_string(),
                    format!("expected development or production, got {other}"),
                ));
            }
        };
        let session_secret = get_validated_secret("MART_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "MART_SESSION_SECRET")?;

        let cors_origins = parse_origins(&get_env_or_default("CORS_ORIGIN", ""));
        let phone_country_code = get_env_or_default("PHONE_COUNTRY_CODE", "+234");
        let otp_ttl = Duration::from_secs(parse_env("OTP_TTL_SECONDS", "300")?);

        let identity = IdentityConfig {
            base_url: parse_url("IDENTITY_PROVIDER_URL")?,
            api_key: get_validated_secret("IDENTITY_PROVIDER_API_KEY")?,
        };
        let embedding = EmbeddingConfig {
            base_url: parse_url("EMBEDDING_SERVICE_URL")?,
        };
        let assets = AssetConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let log_format = match get_env_or_default("LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            database_url,
            host,
            port,
            environment,
            session_secret,
            cors_origins,
            phone_country_code,
            otp_ttl,
            identity,
            embedding,
            assets,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AssetConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("ASSET_BACKEND", "cloudinary").as_str() {
            "cloudinary" => Ok(Self::Cloudinary(CloudinaryConfig {
                cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
                api_key: get_required_env("CLOUDINARY_API_KEY")?,
                api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            })),
            "local" => Ok(Self::Local {
                root: PathBuf::from(get_env_or_default("ASSET_LOCAL_PATH", "uploads")),
                public_url: parse_url("ASSET_PUBLIC_URL")?,
            }),
            other => Err(ConfigError::InvalidEnvVar(
                "ASSET_BACKEND".to_string(),
                format!("expected cloudinary or local, got {other}"),
            )),
        }
    }
}

impl EmailConfig {
    /// Returns `None` when `SMTP_HOST` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_env_or_default("EMAIL_FROM", "Lasu Mart <no-reply@lasumart.com>"),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(key)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(70), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_session_secret_needs_signing_key_length() {
        let short = SecretString::from("k".repeat(63));
        assert!(validate_session_secret(&short, "TEST_SESSION").is_err());

        let ok = SecretString::from("k".repeat(64));
        assert!(validate_session_secret(&ok, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://lasumart.com/ , http://localhost:5173,,"),
            vec!["https://lasumart.com", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_identity_config_debug_redacts_key() {
        let config = IdentityConfig {
            base_url: Url::parse("https://identity.internal/").unwrap(),
            api_key: SecretString::from("sk_live_very_private"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("identity.internal"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_live_very_private"));
    }

    #[test]
    fn test_cloudinary_config_debug_redacts_secret() {
        let config = CloudinaryConfig {
            cloud_name: "lasu".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from("cloudinary_private_value"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("lasu"));
        assert!(!debug_output.contains("cloudinary_private_value"));
    }
}
