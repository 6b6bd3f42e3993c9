use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;

/// Process-wide configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_name: String,
    /// One of `gemma3`, `qwen3`, `mock`.
    pub llm_provider: String,
    /// Model identifier override; the provider's default model when unset.
    pub llm_model_name: Option<String>,
    /// Base URL of the local inference server used by model-backed providers.
    pub llm_base_url: String,
    /// Generations a local provider runs at once.
    pub llm_max_concurrency: usize,
    pub mock_stream_delay: Duration,
    pub host: String,
    pub port: u16,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "AnotherMe Chat Server".to_string(),
            llm_provider: "gemma3".to_string(),
            llm_model_name: None,
            llm_base_url: "http://127.0.0.1:8080".to_string(),
            llm_max_concurrency: 1,
            mock_stream_delay: Duration::from_millis(50),
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_max_concurrency: usize =
            parse_var(&non_empty, "LLM_MAX_CONCURRENCY")?.unwrap_or(defaults.llm_max_concurrency);
        if llm_max_concurrency == 0 {
            return Err(Error::config("LLM_MAX_CONCURRENCY must be at least 1"));
        }

        Ok(Self {
            app_name: non_empty("APP_NAME").unwrap_or(defaults.app_name),
            llm_provider: non_empty("LLM_PROVIDER")
                .map(|p| p.trim().to_lowercase())
                .unwrap_or(defaults.llm_provider),
            llm_model_name: non_empty("LLM_MODEL_NAME"),
            llm_base_url: non_empty("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_max_concurrency,
            mock_stream_delay: parse_var::<u64, _>(&non_empty, "MOCK_STREAM_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.mock_stream_delay),
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_var(&non_empty, "PORT")?.unwrap_or(defaults.port),
            log_filter: non_empty("LOG_FILTER").unwrap_or(defaults.log_filter),
        })
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| Error::config(format!("{key} has an invalid value: {raw}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.llm_provider, "gemma3");
        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_reads_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("LLM_PROVIDER", " Mock "),
            ("LLM_MODEL_NAME", "mock"),
            ("MOCK_STREAM_DELAY_MS", "0"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(settings.llm_provider, "mock");
        assert_eq!(settings.llm_model_name.as_deref(), Some("mock"));
        assert_eq!(settings.mock_stream_delay, Duration::ZERO);
        assert_eq!(settings.port, 9000);
    }

    #[test]
    fn test_blank_model_name_is_unset() {
        let settings = Settings::from_lookup(lookup(&[("LLM_MODEL_NAME", "  ")])).unwrap();
        assert_eq!(settings.llm_model_name, None);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        assert!(matches!(
            Settings::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(Error::Config(_))
        ));
        assert!(Settings::from_lookup(lookup(&[("LLM_MAX_CONCURRENCY", "0")])).is_err());
    }
}
