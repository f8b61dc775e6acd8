use std::path::PathBuf;

use crate::app_config::{AppConfig, BrowserSettings, Environment, HttpSettings};
use crate::ConfigError;

/// Desktop Chrome UA sent by both backends unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_flag = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_bool(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no/on/off".to_string(),
            )
        })
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    };

    let env = parse_environment(&or_default("PRODCRAWL_ENV", "development"))?;
    let bind_addr = parse_addr("PRODCRAWL_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("PRODCRAWL_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("PRODCRAWL_OUTPUT_DIR", "output"));
    let rulesets_path = optional_path("PRODCRAWL_RULESETS_PATH");
    let http_target = or_default("PRODCRAWL_HTTP_TARGET", "toysrus");
    let browser_target = or_default("PRODCRAWL_BROWSER_TARGET", "amazon");
    let user_agent = or_default("PRODCRAWL_USER_AGENT", DEFAULT_USER_AGENT);

    let http = HttpSettings {
        user_agent: user_agent.clone(),
        timeout_secs: parse_u64("PRODCRAWL_HTTP_TIMEOUT_SECS", "30")?,
        max_retries: parse_u32("PRODCRAWL_HTTP_MAX_RETRIES", "2")?,
        retry_backoff_base_secs: parse_u64("PRODCRAWL_HTTP_RETRY_BACKOFF_BASE_SECS", "1")?,
    };

    let browser = BrowserSettings {
        headless: parse_flag("PRODCRAWL_BROWSER_HEADLESS", "true")?,
        stealth: parse_flag("PRODCRAWL_BROWSER_STEALTH", "true")?,
        user_agent,
        timeout_secs: parse_u64("PRODCRAWL_BROWSER_TIMEOUT_SECS", "60")?,
        settle_ms: parse_u64("PRODCRAWL_BROWSER_SETTLE_MS", "500")?,
        interstitial_settle_ms: parse_u64("PRODCRAWL_INTERSTITIAL_SETTLE_MS", "1000")?,
        executable: optional_path("PRODCRAWL_BROWSER_EXECUTABLE"),
    };

    let batch_max_sessions = parse_usize("PRODCRAWL_BATCH_MAX_SESSIONS", "1")?;
    if batch_max_sessions == 0 {
        return Err(invalid(
            "PRODCRAWL_BATCH_MAX_SESSIONS",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        output_dir,
        rulesets_path,
        http_target,
        browser_target,
        http,
        browser,
        batch_max_sessions,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRODCRAWL_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
