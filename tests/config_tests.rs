use std::env;

use pretty_assertions::assert_eq;
use serial_test::serial;
use timebank::config::Config;

mod common;

const KEYS: [&str; 10] = [
    "DATABASE_URL",
    "DATABASE_MAX_CONNECTIONS",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "WORKER_COUNT",
    "JOB_MAX_ATTEMPTS",
    "SWEEP_INTERVAL_SECS",
    "SWEEP_LOOKBACK_DAYS",
    "AUTHORIZATION_EXPIRY_DAYS",
];

fn snapshot() -> Vec<(&'static str, Option<String>)> {
    KEYS.iter().map(|key| (*key, env::var(key).ok())).collect()
}

fn restore(original: Vec<(&'static str, Option<String>)>) {
    unsafe {
        for (key, value) in original {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_from_env_with_defaults() {
    common::setup_test_env();
    let original = snapshot();
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.database_url, "postgres://@localhost:5432/timebank");
    assert_eq!(config.database_max_connections, 10);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.environment, "development");
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.job_max_attempts, 3);
    assert_eq!(config.sweep_interval_secs, 300);
    assert_eq!(config.sweep_lookback_days, 7);
    assert_eq!(config.authorization_expiry_days, 30);
    assert!(config.is_development());

    restore(original);
}

#[test]
#[serial]
fn test_config_from_env_with_custom_values() {
    common::setup_test_env();
    let original = snapshot();
    unsafe {
        env::set_var("DATABASE_URL", "postgres://bank@db:5432/bank");
        env::set_var("DATABASE_MAX_CONNECTIONS", "25");
        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3000");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("WORKER_COUNT", "8");
        env::set_var("JOB_MAX_ATTEMPTS", "5");
        env::set_var("SWEEP_INTERVAL_SECS", "60");
        env::set_var("SWEEP_LOOKBACK_DAYS", "14");
        env::set_var("AUTHORIZATION_EXPIRY_DAYS", "10");
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.database_url, "postgres://bank@db:5432/bank");
    assert_eq!(config.database_max_connections, 25);
    assert_eq!(config.server_address(), "0.0.0.0:3000");
    assert!(config.is_production());
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.job_max_attempts, 5);
    assert_eq!(config.sweep_interval_secs, 60);
    assert_eq!(config.sweep_lookback_days, 14);
    assert_eq!(config.authorization_expiry_days, 10);

    restore(original);
}

#[test]
#[serial]
fn test_unparsable_values_fall_back_to_defaults() {
    common::setup_test_env();
    let original = snapshot();
    unsafe {
        env::set_var("PORT", "not-a-port");
        env::set_var("WORKER_COUNT", "-2");
        env::remove_var("JOB_MAX_ATTEMPTS");
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.worker_count, 4);

    restore(original);
}

#[test]
#[serial]
fn test_zero_workers_is_rejected() {
    common::setup_test_env();
    let original = snapshot();
    unsafe {
        env::set_var("WORKER_COUNT", "0");
        env::remove_var("JOB_MAX_ATTEMPTS");
    }

    let result = Config::from_env_only();
    assert!(result.is_err());

    restore(original);
}
