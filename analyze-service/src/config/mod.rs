use crate::services::providers::gemini::GEMINI_API_BASE;
use crate::services::prompt::DEFAULT_MAX_INPUT_CHARS;
use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    /// OTLP collector; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
    pub gemini: GeminiSettings,
    pub rate_limit: RateLimitConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` keeps the service up but every analyze call answers 500.
    pub api_key: Option<SecretString>,
    pub model: String,
    /// When set, requests go to this completion endpoint with bearer auth
    /// instead of the native `generateContent` API.
    pub endpoint: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client IP within `window_seconds`.
    pub requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Characters of serialized caller input embedded in the prompt.
    pub prompt_max_input_chars: usize,
    /// Characters of an upstream error body relayed as `detail`.
    pub upstream_detail_max_chars: usize,
    pub body_limit_bytes: usize,
}

impl AnalyzeConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let environment = match lookup("ENVIRONMENT").as_deref() {
            Some("prod") | Some("production") => Environment::Prod,
            _ => Environment::Dev,
        };
        let is_prod = environment == Environment::Prod;

        let api_key = lookup("GEMINI_API_KEY").map(SecretString::new);
        if api_key.is_none() && is_prod {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GEMINI_API_KEY is required in production but not set"
            )));
        }

        Ok(AnalyzeConfig {
            common,
            environment,
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "analyze-service".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            otlp_endpoint: lookup("OTLP_ENDPOINT"),
            gemini: GeminiSettings {
                api_key,
                model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
                endpoint: lookup("GEMINI_ENDPOINT"),
                api_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| GEMINI_API_BASE.to_string()),
                timeout_seconds: parse_var(&lookup, "GEMINI_TIMEOUT_SECONDS", 60)?,
                max_output_tokens: parse_var(&lookup, "GEMINI_MAX_OUTPUT_TOKENS", 400)?,
            },
            rate_limit: RateLimitConfig {
                requests: parse_var(&lookup, "RATE_LIMIT_REQUESTS", 10)?,
                window_seconds: parse_var(&lookup, "RATE_LIMIT_WINDOW_SECONDS", 60)?,
            },
            limits: LimitsConfig {
                prompt_max_input_chars: parse_var(
                    &lookup,
                    "PROMPT_MAX_INPUT_CHARS",
                    DEFAULT_MAX_INPUT_CHARS,
                )?,
                upstream_detail_max_chars: parse_var(&lookup, "UPSTREAM_DETAIL_MAX_CHARS", 1000)?,
                body_limit_bytes: parse_var(&lookup, "BODY_LIMIT_BYTES", 1024 * 1024)?,
            },
        })
    }

    pub fn is_configured(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}
