use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Number of job workers; jobs are sharded over them by singleton key.
    pub worker_count: usize,
    pub job_max_attempts: u32,
    pub job_retry_base_ms: u64,
    pub job_singleton_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub sweep_lookback_days: i64,
    pub stuck_calculation_minutes: i64,
    pub authorization_expiry_days: i64,
    pub reconciliation_interval_secs: u64,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        let config = Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://@localhost:5432/timebank".to_string()),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            worker_count: parsed("WORKER_COUNT", 4),
            job_max_attempts: parsed("JOB_MAX_ATTEMPTS", 3),
            job_retry_base_ms: parsed("JOB_RETRY_BASE_MS", 500),
            job_singleton_ttl_secs: parsed("JOB_SINGLETON_TTL_SECS", 900),
            sweep_interval_secs: parsed("SWEEP_INTERVAL_SECS", 300),
            sweep_lookback_days: parsed("SWEEP_LOOKBACK_DAYS", 7),
            stuck_calculation_minutes: parsed("STUCK_CALCULATION_MINUTES", 15),
            authorization_expiry_days: parsed("AUTHORIZATION_EXPIRY_DAYS", 30),
            reconciliation_interval_secs: parsed("RECONCILIATION_INTERVAL_SECS", 3600),
        };

        if config.worker_count == 0 {
            anyhow::bail!("WORKER_COUNT must be at least 1");
        }
        if config.job_max_attempts == 0 {
            anyhow::bail!("JOB_MAX_ATTEMPTS must be at least 1");
        }
        Ok(config)
    }

    /// Fixed values for tests: small worker pool, fast retries.
    pub fn test_config() -> Self {
        Config {
            database_url: "postgres://@localhost:5432/timebank_test".to_string(),
            database_max_connections: 2,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            worker_count: 2,
            job_max_attempts: 3,
            job_retry_base_ms: 1,
            job_singleton_ttl_secs: 60,
            sweep_interval_secs: 1,
            sweep_lookback_days: 7,
            stuck_calculation_minutes: 15,
            authorization_expiry_days: 30,
            reconciliation_interval_secs: 1,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
