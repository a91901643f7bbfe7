use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub upload_path: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_allow_any_origin: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {:?}: {}", raw, e))?,
            Err(_) => ServerConfig::default().port,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "memory://".to_string()),

            upload_path: env::var("UPLOAD_PATH")
                .unwrap_or_else(|_| "uploads".to_string()),

            server: ServerConfig {
                port,
                cors_allow_any_origin: env::var("CORS_ALLOW_ANY_ORIGIN")
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allow_any_origin: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-wide, so every case lives in one test.
    #[test]
    fn test_from_env() {
        for key in ["DATABASE_URL", "UPLOAD_PATH", "PORT", "CORS_ALLOW_ANY_ORIGIN"] {
            env::remove_var(key);
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "memory://");
        assert_eq!(config.upload_path, "uploads");
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.cors_allow_any_origin);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");

        env::set_var("DATABASE_URL", "file://ledger.db");
        env::set_var("PORT", "9090");
        env::set_var("CORS_ALLOW_ANY_ORIGIN", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "file://ledger.db");
        assert_eq!(config.server.port, 9090);
        assert!(config.server.cors_allow_any_origin);

        env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());

        for key in ["DATABASE_URL", "PORT", "CORS_ALLOW_ANY_ORIGIN"] {
            env::remove_var(key);
        }
    }
}
