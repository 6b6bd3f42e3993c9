use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{LocalModelProvider, MockProvider, ModelFamily};
use crate::providers::mock::MOCK_MODEL;
use crate::{Error, LLMProvider, Settings};

const QWEN3_MODELS: &[&str] = &[
    "Qwen/Qwen3-4B-Instruct-2507",
    "Qwen/Qwen3-30B-A3B-Instruct-2507",
];

const GEMMA3_MODELS: &[&str] = &["google/gemma-3-4b-it", "google/gemma-3-27b-it"];

const MOCK_MODELS: &[&str] = &[MOCK_MODEL];

/// Supported generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemma3,
    Qwen3,
    Mock,
}

impl ProviderType {
    pub const ALL: [ProviderType; 3] =
        [ProviderType::Gemma3, ProviderType::Qwen3, ProviderType::Mock];

    /// Name used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderType::Gemma3 => "gemma3",
            ProviderType::Qwen3 => "qwen3",
            ProviderType::Mock => "mock",
        }
    }

    /// Model identifiers this provider can serve.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderType::Gemma3 => GEMMA3_MODELS,
            ProviderType::Qwen3 => QWEN3_MODELS,
            ProviderType::Mock => MOCK_MODELS,
        }
    }

    /// Model used when no override is configured.
    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }

    /// Find the provider that serves `model`.
    pub fn from_model(model: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.models().contains(&model))
            .ok_or_else(|| Error::unknown_model(model))
    }

    fn family(&self) -> Option<ModelFamily> {
        match self {
            ProviderType::Gemma3 => Some(ModelFamily::Gemma3),
            ProviderType::Qwen3 => Some(ModelFamily::Qwen3),
            ProviderType::Mock => None,
        }
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|provider| provider.name() == name)
            .ok_or_else(|| Error::unknown_provider(s))
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for creating providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider to construct.
    pub provider_type: ProviderType,
    /// Model override; the provider's default model when `None`.
    pub model: Option<String>,
    /// Base URL of the local inference server.
    pub base_url: String,
    /// Concurrent generations admitted by a local provider.
    pub max_concurrency: usize,
    /// Inter-character delay of the mock provider's stream.
    pub stream_delay: Duration,
}

impl ProviderConfig {
    /// Configuration for `provider_type` with default settings.
    pub fn new(provider_type: ProviderType) -> Self {
        let defaults = Settings::default();
        Self {
            provider_type,
            model: None,
            base_url: defaults.llm_base_url,
            max_concurrency: defaults.llm_max_concurrency,
            stream_delay: defaults.mock_stream_delay,
        }
    }

    /// Configuration for the mock provider.
    pub fn mock() -> Self {
        Self::new(ProviderType::Mock)
    }

    /// Configuration for whichever provider serves `model`.
    pub fn for_model(model: &str) -> Result<Self, Error> {
        let provider_type = ProviderType::from_model(model)?;
        Ok(Self::new(provider_type).with_model(model))
    }

    /// Accept either a provider name or a catalogued model identifier.
    pub fn resolve(name_or_model: &str) -> Result<Self, Error> {
        match name_or_model.parse::<ProviderType>() {
            Ok(provider_type) => Ok(Self::new(provider_type)),
            Err(unknown) => Self::for_model(name_or_model).map_err(|_| unknown),
        }
    }

    /// Build the configuration from process settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        let provider_type: ProviderType = settings.llm_provider.parse()?;
        let config = Self {
            provider_type,
            model: settings.llm_model_name.clone(),
            base_url: settings.llm_base_url.clone(),
            max_concurrency: settings.llm_max_concurrency,
            stream_delay: settings.mock_stream_delay,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject a model override that the catalog assigns to another provider.
    ///
    /// Uncatalogued overrides are accepted; the inference server decides
    /// whether it serves them.
    pub fn validate(&self) -> Result<(), Error> {
        let Some(model) = self.model.as_deref() else {
            return Ok(());
        };
        match ProviderType::from_model(model) {
            Ok(owner) if owner != self.provider_type => Err(Error::config(format!(
                "model {model} is served by the {owner} provider, not {}",
                self.provider_type
            ))),
            _ => Ok(()),
        }
    }

    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_settings(&Settings::from_env()?)
    }

    /// Serve `model` instead of the provider's default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Inference server used by model-backed providers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generations a model-backed provider runs at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Delay between streamed characters of the mock provider.
    pub fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = delay;
        self
    }

    /// The model identifier that will be served.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_model())
    }
}

/// Factory for creating providers.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider from configuration.
    ///
    /// Model-backed providers connect to their inference server here; failures
    /// are returned as [`Error::BackendInit`] without retrying.
    pub async fn create(config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, Error> {
        config.validate()?;
        let model = config.model().to_string();
        tracing::info!(provider = %config.provider_type, model = %model, "creating LLM provider");

        match config.provider_type.family() {
            Some(family) => {
                let provider = LocalModelProvider::connect(
                    family,
                    model,
                    &config.base_url,
                    config.max_concurrency,
                )
                .await?;
                Ok(Arc::new(provider))
            }
            None => {
                let provider = MockProvider::new()
                    .with_model(model)
                    .with_stream_delay(config.stream_delay);
                Ok(Arc::new(provider))
            }
        }
    }

    /// Create a provider from a provider name or a catalogued model identifier.
    pub async fn resolve(name_or_model: &str) -> Result<Arc<dyn LLMProvider>, Error> {
        Self::create(&ProviderConfig::resolve(name_or_model)?).await
    }

    /// Create a provider from environment variables.
    pub async fn from_env() -> Result<Arc<dyn LLMProvider>, Error> {
        let config = ProviderConfig::from_env()?;
        Self::create(&config).await
    }
}
