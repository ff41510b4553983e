use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";

/// `X-Forwarded-For` is client-supplied; only trust it behind a known proxy.
const DEFAULT_TRUST_PROXY: bool = false;

/// 10MB request body cap.
const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GenieConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub anthropic: AnthropicConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "test" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("Unknown ENVIRONMENT '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Exact origins, or `scheme://*.domain` patterns matching any subdomain.
    pub allowed_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
    pub trust_forwarded_for: bool,
    pub purge_interval_seconds: u64,
}

impl GenieConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        Ok(GenieConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("securegenie-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            anthropic: AnthropicConfig {
                api_key: get_env("ANTHROPIC_API_KEY", None, is_prod)?,
                api_url: get_env("ANTHROPIC_API_URL", Some(DEFAULT_ANTHROPIC_API_URL), false)?,
                model: get_env("ANTHROPIC_MODEL", Some(DEFAULT_ANTHROPIC_MODEL), false)?,
                timeout_seconds: parse_env("ANTHROPIC_TIMEOUT_SECONDS", 120)?,
            },
            security: SecurityConfig {
                allowed_origins: parse_origins(&get_env(
                    "FRONTEND_URL",
                    Some(DEFAULT_ALLOWED_ORIGINS),
                    is_prod,
                )?),
                body_limit_bytes: parse_env("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES)?,
            },
            rate_limit: RateLimitConfig {
                max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", 10)?,
                window_seconds: parse_env("RATE_LIMIT_WINDOW_SECONDS", 3600)?,
                trust_forwarded_for: parse_env("RATE_LIMIT_TRUST_PROXY", DEFAULT_TRUST_PROXY)?,
                purge_interval_seconds: parse_env("RATE_LIMIT_PURGE_SECONDS", 60)?,
            },
        })
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `origin` is allowed by `pattern`. A `*.` host prefix in the
/// pattern matches one or more subdomain labels, never the bare domain.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    let Some((scheme, host)) = pattern.split_once("://") else {
        return pattern == origin;
    };
    let Some(suffix) = host.strip_prefix("*.") else {
        return pattern == origin;
    };
    let Some(origin_host) = origin
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
    else {
        return false;
    };

    origin_host
        .strip_suffix(suffix)
        .and_then(|sub| sub.strip_suffix('.'))
        .is_some_and(|sub| !sub.is_empty() && !sub.contains('/'))
}

fn get_env(key: &str, default: Option<&str>, required: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if required {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
