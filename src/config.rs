use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::geo::PositionOptions;
use crate::geo::distance::DEFAULT_COMPLIANCE_RADIUS_M;

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Geo check-in
    pub compliance_radius_m: f64,
    pub location_timeout_ms: u64,

    /// Password given to every seeded account; unset keeps them login-disabled.
    pub seed_password: Option<String>,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let log_level = match env::var("LOG_LEVEL") {
            Ok(raw) => tracing::Level::from_str(raw.trim())
                .map_err(|e| anyhow::anyhow!("LOG_LEVEL has an invalid value {raw:?}: {e}"))?,
            Err(_) => tracing::Level::DEBUG,
        };

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            compliance_radius_m: or_default("COMPLIANCE_RADIUS_M", DEFAULT_COMPLIANCE_RADIUS_M)?,
            location_timeout_ms: or_default("LOCATION_TIMEOUT_MS", 10_000)?,

            seed_password: env::var("SEED_PASSWORD").ok().filter(|p| !p.is_empty()),
            log_level,
        };
        config.validate_geo()?;
        Ok(config)
    }

    /// Rejects a radius or timeout that would make every check-in fail.
    fn validate_geo(&self) -> Result<()> {
        if !self.compliance_radius_m.is_finite() || self.compliance_radius_m <= 0.0 {
            anyhow::bail!(
                "COMPLIANCE_RADIUS_M must be a positive number of meters, got {}",
                self.compliance_radius_m
            );
        }
        if self.location_timeout_ms == 0 {
            anyhow::bail!("LOCATION_TIMEOUT_MS must be greater than zero");
        }
        Ok(())
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            timeout: Duration::from_millis(self.location_timeout_ms),
            ..PositionOptions::default()
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_register_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            compliance_radius_m: DEFAULT_COMPLIANCE_RADIUS_M,
            location_timeout_ms: 10_000,
            seed_password: None,
            log_level: tracing::Level::DEBUG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_geo_settings() {
        assert!(Config::for_tests().validate_geo().is_ok());
    }

    #[test]
    fn rejects_unusable_radius() {
        for radius in [0.0, -250.0, f64::NAN, f64::INFINITY] {
            let config = Config {
                compliance_radius_m: radius,
                ..Config::for_tests()
            };
            let err = config.validate_geo().unwrap_err();
            assert!(err.to_string().contains("COMPLIANCE_RADIUS_M"), "{radius}");
        }
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = Config {
            location_timeout_ms: 0,
            ..Config::for_tests()
        };
        let err = config.validate_geo().unwrap_err();
        assert!(err.to_string().contains("LOCATION_TIMEOUT_MS"));
    }
}
