use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    bind_address: Option<String>,
    media_dir: Option<String>,
    log_dir: Option<String>,
    max_upload_bytes: Option<usize>,
    db_max_connections: Option<u32>,
    bcrypt_cost: Option<u32>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl PartialServerConfig {
    fn from_file(config_path: Option<&str>) -> Result<Self, String> {
        let Some(path_str) = config_path else {
            return Ok(Self::default());
        };
        let path = Path::new(path_str);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        Self::from_toml(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Fields set in `self` win over `fallback`.
    fn merge(self, fallback: PartialServerConfig) -> Result<ServerConfig, String> {
        let bcrypt_cost = self
            .bcrypt_cost
            .or(fallback.bcrypt_cost)
            .unwrap_or_else(default_bcrypt_cost);
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(format!("BCRYPT_COST must be between 4 and 31, got {bcrypt_cost}"));
        }

        Ok(ServerConfig {
            database_url: self
                .database_url
                .or(fallback.database_url)
                .ok_or("DATABASE_URL is required")?,
            bind_address: self
                .bind_address
                .or(fallback.bind_address)
                .unwrap_or_else(default_bind_address),
            media_dir: self
                .media_dir
                .or(fallback.media_dir)
                .unwrap_or_else(default_media_dir),
            log_dir: self
                .log_dir
                .or(fallback.log_dir)
                .unwrap_or_else(default_log_dir),
            max_upload_bytes: self
                .max_upload_bytes
                .or(fallback.max_upload_bytes)
                .unwrap_or_else(default_max_upload_bytes),
            db_max_connections: self
                .db_max_connections
                .or(fallback.db_max_connections)
                .unwrap_or_else(default_db_max_connections),
            bcrypt_cost,
        })
    }
}

impl ServerConfig {
    /// Loads the optional TOML file, then lets environment variables override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config = PartialServerConfig::from_file(config_path)?;
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        env_config.merge(file_config)
    }

    /// Configuration with defaults for everything except the database.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        ServerConfig {
            database_url: database_url.into(),
            bind_address: default_bind_address(),
            media_dir: default_media_dir(),
            log_dir: default_log_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            db_max_connections: default_db_max_connections(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<PartialServerConfig, envy::Error> {
        envy::from_iter(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_defaults_apply() {
        let env = from_vars(&[("DATABASE_URL", "sqlite::memory:"), ("PATH", "/usr/bin")]).unwrap();
        let config = env.merge(PartialServerConfig::default()).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8000");
        assert_eq!(config.media_dir, "media");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = PartialServerConfig::from_toml(
            r#"
            database_url = "postgres://file/db"
            media_dir = "/srv/media"
            bcrypt_cost = 10
            "#,
        )
        .unwrap();
        let env = from_vars(&[
            ("DATABASE_URL", "postgres://env/db"),
            ("BCRYPT_COST", "6"),
        ])
        .unwrap();

        let config = env.merge(file).unwrap();
        assert_eq!(config.database_url, "postgres://env/db");
        assert_eq!(config.media_dir, "/srv/media");
        assert_eq!(config.bcrypt_cost, 6);
    }

    #[test]
    fn test_database_url_is_required() {
        let err = PartialServerConfig::default()
            .merge(PartialServerConfig::default())
            .unwrap_err();
        assert!(err.contains("DATABASE_URL"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(from_vars(&[("MAX_UPLOAD_BYTES", "lots")]).is_err());

        let env = from_vars(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BCRYPT_COST", "2"),
        ])
        .unwrap();
        assert!(env.merge(PartialServerConfig::default()).is_err());
    }
}
