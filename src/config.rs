//! Environment-driven configuration

use anyhow::{anyhow, Result};

/// Service settings, read once at startup and passed through router state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Wall-clock budget for one external program invocation.
    pub trial_timeout_ms: u64,
    pub max_list_size: u32,
    pub max_test_count: u32,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            trial_timeout_ms: parse_var("TRIAL_TIMEOUT_MS", 10_000)?,
            max_list_size: parse_var("MAX_LIST_SIZE", 1_000)?,
            max_test_count: parse_var("MAX_TEST_COUNT", 1_000)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 8 * 1024 * 1024)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} must be a number, got `{}`", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_falls_back_to_default() {
        let value: u64 = parse_var("PUSHSWAP_TOOLS_TEST_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn set_var_overrides_default() {
        std::env::set_var("PUSHSWAP_TOOLS_TEST_TIMEOUT", "2500");
        let value: u64 = parse_var("PUSHSWAP_TOOLS_TEST_TIMEOUT", 42).unwrap();
        assert_eq!(value, 2500);
    }

    #[test]
    fn garbage_var_is_an_error() {
        std::env::set_var("PUSHSWAP_TOOLS_TEST_GARBAGE", "soon");
        let result: Result<u64> = parse_var("PUSHSWAP_TOOLS_TEST_GARBAGE", 42);
        assert!(result.is_err());
    }
}
