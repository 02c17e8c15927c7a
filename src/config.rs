use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub mail: MailConfig,

    pub pagination: PaginationConfig,

    pub observability: ObservabilityConfig,

    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `DATABASE_URL` overrides this
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/techinder.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session lifetime without activity.
    pub session_inactivity_minutes: i64,

    /// Session lifetime when "remember me" is ticked at login.
    pub remember_me_days: i64,

    /// Base of absolute links in outgoing mail
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            secure_cookies: true,
            session_inactivity_minutes: 60,
            remember_me_days: 30,
            public_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Signs password reset tokens. `SECRET_KEY` overrides this.
    pub secret_key: String,

    /// Lifetime of a password reset token
    pub reset_token_expires_secs: i64,

    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: "some-key".to_string(),
            reset_token_expires_secs: 600,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Without a server, outgoing mail is only logged.
    pub server: Option<String>,

    pub port: u16,

    pub use_tls: bool,

    pub username: Option<String>,

    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// First entry is used as the sender of outgoing mail
    pub admins: Vec<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: 25,
            use_tls: false,
            username: None,
            password: None,
            admins: vec!["admin@techinder.local".to_string()],
        }
    }
}

impl MailConfig {
    #[must_use]
    pub fn sender(&self) -> &str {
        self.admins
            .first()
            .map_or("admin@techinder.local", String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub projects_per_page: u64,

    pub messages_per_page: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            projects_per_page: 10,
            messages_per_page: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit logs as JSON lines instead of the human readable format
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Report case catalogue, one `N.Type=Description` per line
    pub cases_path: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            cases_path: "report.content".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies the environment variables the deployment scripts set.
    /// `lookup` is `std::env::var` outside of tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.general.database_path = url;
        }

        if let Some(key) = lookup("SECRET_KEY") {
            self.security.secret_key = key;
        }

        if let Some(server) = lookup("MAIL_SERVER") {
            self.mail.server = Some(server);
        }

        if let Some(port) = lookup("MAIL_PORT").and_then(|p| p.parse().ok()) {
            self.mail.port = port;
        }

        // Presence alone switches TLS on.
        if lookup("MAIL_USE_TLS").is_some() {
            self.mail.use_tls = true;
        }

        if let Some(username) = lookup("MAIL_USERNAME") {
            self.mail.username = Some(username);
        }

        if let Some(password) = lookup("MAIL_PASSWORD") {
            self.mail.password = Some(password);
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("techinder").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".techinder").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.secret_key.is_empty() {
            anyhow::bail!("Secret key cannot be empty");
        }

        if self.pagination.projects_per_page == 0 || self.pagination.messages_per_page == 0 {
            anyhow::bail!("Page sizes must be > 0");
        }

        if self.mail.server.is_some() && self.mail.port == 0 {
            anyhow::bail!("Mail port must be > 0 when a mail server is set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pagination.projects_per_page, 10);
        assert_eq!(config.mail.port, 25);
        assert!(config.mail.server.is_none());
        assert_eq!(config.security.reset_token_expires_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[pagination]"));
        assert!(toml_str.contains("[mail]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [pagination]
            projects_per_page = 25
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.pagination.projects_per_page, 25);

        assert_eq!(config.pagination.messages_per_page, 50);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:"),
            ("SECRET_KEY", "from-env"),
            ("MAIL_SERVER", "smtp.example.com"),
            ("MAIL_PORT", "587"),
            ("MAIL_USE_TLS", ""),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.general.database_path, "sqlite::memory:");
        assert_eq!(config.security.secret_key, "from-env");
        assert_eq!(config.mail.server.as_deref(), Some("smtp.example.com"));
        assert_eq!(config.mail.port, 587);
        assert!(config.mail.use_tls);
        assert!(config.mail.username.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.pagination.projects_per_page = 0;
        assert!(config.validate().is_err());
    }
}
