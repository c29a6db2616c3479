use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Where uploaded recipe images live and how they are exposed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root_dir: String,
    /// Public path the media directory is served under (default: /media)
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Upper bound for an upload request body in bytes (default: 10 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_url_prefix() -> String {
    "/media".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Superuser to seed on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialSuperuserConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Auth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token lifetime in days. Tokens never expire when unset.
    pub token_ttl_days: Option<i64>,
    /// How often expired tokens are purged in seconds (default: 3600)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    pub initial_superuser: Option<InitialSuperuserConfig>,
}

fn default_sweep_interval() -> u64 {
    3600
}

/// Longest accepted token lifetime, roughly a century
pub const MAX_TOKEN_TTL_DAYS: i64 = 36_500;

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: None,
            sweep_interval_secs: default_sweep_interval(),
            initial_superuser: None,
        }
    }
}

/// Server configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String, // "0.0.0.0:8080"
    pub db: DbConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Reject values that would break request handling later on
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(days) = self.auth.token_ttl_days {
            anyhow::ensure!(
                (1..=MAX_TOKEN_TTL_DAYS).contains(&days),
                "auth.token_ttl_days must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_DAYS,
                days
            );
        }
        anyhow::ensure!(
            self.auth.sweep_interval_secs > 0,
            "auth.sweep_interval_secs must be positive"
        );
        Ok(())
    }
}

/// Load server config from a YAML file with PANTRY__ env var overrides.
pub fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    use anyhow::Context;
    let config: ServerConfig = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("PANTRY")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from: {}", path))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from: {}", path))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in: {}", path))?;
    Ok(config)
}
