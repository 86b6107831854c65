use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub recommendation: RecommendationConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// Context cache lifetimes and sizes. User snapshots churn faster than city snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub user_context_ttl_secs: u64,
    pub city_context_ttl_secs: u64,
    pub user_context_max_entries: usize,
    pub city_context_max_entries: usize,
}

impl CacheConfig {
    pub fn user_context_ttl(&self) -> Duration {
        Duration::from_secs(self.user_context_ttl_secs)
    }

    pub fn city_context_ttl(&self) -> Duration {
        Duration::from_secs(self.city_context_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_context_ttl_secs: 5 * 60,
            city_context_ttl_secs: 60 * 60,
            user_context_max_entries: 10_000,
            city_context_max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub max_results: usize,
    pub batch_size: i64,
    pub retention_days: i64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            batch_size: 100,
            retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub enabled: bool,
    pub cleanup_interval_secs: u64,
    pub generation_interval_secs: u64,
    /// Wait before the first generation batch after startup
    pub generation_initial_delay_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_interval_secs: 24 * 60 * 60,
            generation_interval_secs: 6 * 60 * 60,
            generation_initial_delay_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let cache_defaults = CacheConfig::default();
        let rec_defaults = RecommendationConfig::default();
        let job_defaults = JobsConfig::default();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("APP_PORT")
                    .unwrap_or_else(|_| "8090".to_string())
                    .parse()?,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                run_migrations: env_flag("DATABASE_RUN_MIGRATIONS", true),
            },
            cache: CacheConfig {
                user_context_ttl_secs: env_or("BRIDGE_USER_CONTEXT_TTL_SECS", cache_defaults.user_context_ttl_secs)?,
                city_context_ttl_secs: env_or("BRIDGE_CITY_CONTEXT_TTL_SECS", cache_defaults.city_context_ttl_secs)?,
                user_context_max_entries: env_or(
                    "BRIDGE_USER_CONTEXT_MAX_ENTRIES",
                    cache_defaults.user_context_max_entries,
                )?,
                city_context_max_entries: env_or(
                    "BRIDGE_CITY_CONTEXT_MAX_ENTRIES",
                    cache_defaults.city_context_max_entries,
                )?,
            },
            recommendation: RecommendationConfig {
                max_results: env_or("BRIDGE_MAX_RECOMMENDATIONS", rec_defaults.max_results)?,
                batch_size: env_or("BRIDGE_GENERATION_BATCH_SIZE", rec_defaults.batch_size)?,
                retention_days: env_or("BRIDGE_RETENTION_DAYS", rec_defaults.retention_days)?,
            },
            jobs: JobsConfig {
                enabled: env_flag("BRIDGE_JOBS_ENABLED", job_defaults.enabled),
                cleanup_interval_secs: env_or("BRIDGE_CLEANUP_INTERVAL_SECS", job_defaults.cleanup_interval_secs)?,
                generation_interval_secs: env_or(
                    "BRIDGE_GENERATION_INTERVAL_SECS",
                    job_defaults.generation_interval_secs,
                )?,
                generation_initial_delay_secs: env_or(
                    "BRIDGE_GENERATION_INITIAL_DELAY_SECS",
                    job_defaults.generation_initial_delay_secs,
                )?,
            },
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
