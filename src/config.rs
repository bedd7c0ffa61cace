use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub google: GoogleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
}

fn default_access_ttl() -> i64 { 5 * 60 }
fn default_refresh_ttl() -> i64 { 24 * 60 * 60 }

/// Transactional mail API; an empty endpoint disables delivery
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

fn default_from_address() -> String { "no-reply@kelibe.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: String,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            tokeninfo_url: default_tokeninfo_url(),
        }
    }
}

fn default_tokeninfo_url() -> String { "https://oauth2.googleapis.com/tokeninfo".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with KELIBE__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., KELIBE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("KELIBE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_overrides(settings)?;

        settings.try_deserialize::<Settings>()?.checked()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("KELIBE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Settings>()?.checked()
    }

    /// Reject settings the server must not start with
    fn checked(self) -> Result<Self, ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".to_string()));
        }
        Ok(self)
    }
}

/// Well-known variables that take precedence over everything else
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(client_id) = env::var("GOOGLE_OAUTH2_CLIENT_ID") {
        builder = builder.set_override("google.client_id", client_id)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_default_token_lifetimes() {
        assert_eq!(default_access_ttl(), 300);
        assert_eq!(default_refresh_ttl(), 86_400);
    }

    fn write_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("kelibe-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", contents).unwrap();
        path
    }

    const SERVER_AND_DATABASE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 9000

        [database]
        url = "postgres://localhost/kelibe_test"
    "#;

    #[test]
    fn test_load_from_file_fills_defaults() {
        let path = write_config(&format!(
            "{}\n[auth]\njwt_secret = \"s3cret\"\n",
            SERVER_AND_DATABASE
        ));

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.auth.access_ttl_secs, 300);
        assert!(settings.mail.endpoint.is_empty());
        assert_eq!(settings.google.tokeninfo_url, "https://oauth2.googleapis.com/tokeninfo");
    }

    #[test]
    fn test_missing_jwt_secret_is_rejected() {
        if std::env::var("KELIBE__AUTH__JWT_SECRET").is_ok() {
            return;
        }
        let path = write_config(&format!("{}\n[auth]\naccess_ttl_secs = 60\n", SERVER_AND_DATABASE));

        let result = Settings::load_from(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_blank_jwt_secret_is_rejected() {
        if std::env::var("KELIBE__AUTH__JWT_SECRET").is_ok() {
            return;
        }
        let path = write_config(&format!("{}\n[auth]\njwt_secret = \"  \"\n", SERVER_AND_DATABASE));

        let err = Settings::load_from(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_shipped_defaults_carry_no_jwt_secret() {
        let defaults = std::fs::read_to_string(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml"),
        )
        .unwrap();

        assert!(defaults
            .lines()
            .all(|line| !line.trim_start().starts_with("jwt_secret")));
    }
}
