use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Scheduler cadences, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Due-notification delivery cycle (default: 60)
    pub cycle_secs: u64,
    /// Medication reminder sweep (default: 300)
    pub reminder_secs: u64,
    /// Low-stock / depleted sweep (default: 3600)
    pub low_stock_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            cycle_secs: 60,
            reminder_secs: 300,
            low_stock_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: std::env::var("APP_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            worker: WorkerConfig {
                cycle_secs: std::env::var("WORKER_CYCLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
                reminder_secs: std::env::var("WORKER_REMINDER_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
                low_stock_secs: std::env::var("WORKER_LOW_STOCK_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            },
        })
    }
}
