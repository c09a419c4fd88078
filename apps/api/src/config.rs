use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::llm_client::ProviderKind;

const DEFAULT_LOCAL_MODEL: &str = "MBZUAI/LaMini-GPT-124M";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables.
/// Provider credentials are optional: a missing key surfaces per request, not at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub model_name: String,
    pub local_model_dir: PathBuf,
    pub hf_api_token: Option<String>,
    pub hf_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub max_length: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    /// `None` means any origin.
    pub cors_allowed_origins: Option<Vec<String>>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider = optional_env("PROVIDER")
            .map(|p| p.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or(ProviderKind::Local);

        let model_name = optional_env("MODEL_NAME")
            .unwrap_or_else(|| default_model_for(provider).to_string());

        let temperature = check_temperature(parse_env("TEMPERATURE", 0.7)?)?;
        let max_length = check_max_length(parse_env("MAX_LENGTH", 800)?)?;

        Ok(Config {
            provider,
            model_name,
            local_model_dir: optional_env("LOCAL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models/LaMini-GPT-124M")),
            hf_api_token: optional_env("HF_API_TOKEN"),
            hf_api_url: optional_env("HF_API_URL")
                .unwrap_or_else(|| "https://api-inference.huggingface.co/models".to_string()),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_length,
            temperature,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 120)?,
            cors_allowed_origins: optional_env("CORS_ALLOWED_ORIGINS")
                .and_then(|raw| parse_origins(&raw)),
            port: parse_env("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn default_model_for(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::Local | ProviderKind::Hosted => DEFAULT_LOCAL_MODEL,
        ProviderKind::Chat => DEFAULT_CHAT_MODEL,
    }
}

/// Reads a variable, treating empty values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_value(key, optional_env(key), default)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

fn check_temperature(temperature: f32) -> Result<f32> {
    if temperature.is_nan() || temperature <= 0.0 {
        bail!("TEMPERATURE must be greater than zero");
    }
    Ok(temperature)
}

fn check_max_length(max_length: u32) -> Result<u32> {
    if max_length == 0 {
        bail!("MAX_LENGTH must be at least 1");
    }
    Ok(max_length)
}

/// `*` (or an empty list) allows any origin.
fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_origin_allows_any() {
        assert_eq!(parse_origins("*"), None);
        assert_eq!(parse_origins("https://a.example, *"), None);
        assert_eq!(parse_origins(" , "), None);
    }

    #[test]
    fn test_origin_list_is_trimmed() {
        assert_eq!(
            parse_origins("https://app.jurisflow.io , http://localhost:3000"),
            Some(vec![
                "https://app.jurisflow.io".to_string(),
                "http://localhost:3000".to_string()
            ])
        );
    }

    #[test]
    fn test_unparsable_number_names_the_key() {
        let err = parse_value::<u32>("MAX_LENGTH", Some("abc".to_string()), 800).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MAX_LENGTH"), "message was: {msg}");
        assert!(msg.contains("abc"), "message was: {msg}");

        assert!(parse_value::<u16>("PORT", Some("70000".to_string()), 8000).is_err());
        assert!(parse_value::<f32>("TEMPERATURE", Some("warm".to_string()), 0.7).is_err());
    }

    #[test]
    fn test_unset_value_uses_default() {
        assert_eq!(parse_value::<u16>("PORT", None, 8000).unwrap(), 8000);
        assert_eq!(
            parse_value::<u32>("MAX_LENGTH", Some("256".to_string()), 800).unwrap(),
            256
        );
    }

    #[test]
    fn test_non_positive_temperature_is_rejected() {
        assert!(check_temperature(0.0).is_err());
        assert!(check_temperature(-0.5).is_err());
        assert!(check_temperature(f32::NAN).is_err());
        assert_eq!(check_temperature(0.7).unwrap(), 0.7);
    }

    #[test]
    fn test_zero_max_length_is_rejected() {
        let err = check_max_length(0).unwrap_err();
        assert!(err.to_string().contains("MAX_LENGTH"));
        assert_eq!(check_max_length(1).unwrap(), 1);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = "gemini".parse::<ProviderKind>().unwrap_err();
        assert!(err.to_string().contains("Unknown PROVIDER 'gemini'"));
    }

    #[test]
    fn test_chat_provider_defaults_to_chat_model() {
        assert_eq!(default_model_for(ProviderKind::Chat), "gpt-4o-mini");
        assert_eq!(default_model_for(ProviderKind::Local), DEFAULT_LOCAL_MODEL);
    }
}
