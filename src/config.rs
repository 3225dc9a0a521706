use crate::errors::{AppError, AppResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: PathBuf,
    pub history_default_limit: usize,
    pub history_max_limit: usize,
    pub batch_max_items: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 8000,
            database_path: PathBuf::from("data/calculations.db"),
            history_default_limit: 10,
            history_max_limit: 500,
            batch_max_items: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("SERVER_PORT: {e}")))?;

        let history_default_limit = env_var_or("HISTORY_DEFAULT_LIMIT", "10")
            .parse::<usize>()
            .map_err(|e| AppError::Config(format!("HISTORY_DEFAULT_LIMIT: {e}")))?;

        let history_max_limit = env_var_or("HISTORY_MAX_LIMIT", "500")
            .parse::<usize>()
            .map_err(|e| AppError::Config(format!("HISTORY_MAX_LIMIT: {e}")))?;

        let batch_max_items = env_var_or("BATCH_MAX_ITEMS", "100")
            .parse::<usize>()
            .map_err(|e| AppError::Config(format!("BATCH_MAX_ITEMS: {e}")))?;

        if batch_max_items == 0 {
            return Err(AppError::Config("BATCH_MAX_ITEMS: must be at least 1".into()));
        }

        Ok(Self {
            server_host: env_var_or("SERVER_HOST", "0.0.0.0"),
            server_port,
            database_path: PathBuf::from(env_var_or("DATABASE_PATH", "data/calculations.db")),
            history_default_limit: history_default_limit.min(history_max_limit),
            history_max_limit,
            batch_max_items,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
