//! Process-wide holder of the active provider.
//!
//! The provider is built once at startup, before the server accepts traffic,
//! and is read-only afterwards.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{ChatService, Error, LLMProvider, ProviderConfig, ProviderFactory, Settings};

/// A single provider slot that is filled at most once.
pub struct ProviderRegistry {
    slot: OnceCell<Arc<dyn LLMProvider>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry; usable in a `static`.
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::const_new(),
        }
    }

    /// Fill the slot using `init`, unless it is already filled.
    ///
    /// Concurrent callers wait for the one running initializer and observe its
    /// provider. A failed initialization leaves the slot empty.
    pub async fn initialize_with<F, Fut>(&self, init: F) -> Result<Arc<dyn LLMProvider>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn LLMProvider>, Error>>,
    {
        self.slot.get_or_try_init(init).await.cloned()
    }

    /// Fill the slot with a provider built from `config`.
    pub async fn initialize(&self, config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, Error> {
        self.initialize_with(|| ProviderFactory::create(config)).await
    }

    /// The initialized provider.
    pub fn current(&self) -> Result<Arc<dyn LLMProvider>, Error> {
        self.slot.get().cloned().ok_or(Error::NotInitialized)
    }

    /// Whether a provider has been stored.
    pub fn is_initialized(&self) -> bool {
        self.slot.initialized()
    }
}

static REGISTRY: ProviderRegistry = ProviderRegistry::new();

/// Build the configured provider into the process-wide registry.
///
/// Call once at startup; later calls return the existing provider.
pub async fn initialize_llm_provider(settings: &Settings) -> Result<Arc<dyn LLMProvider>, Error> {
    if let Ok(provider) = REGISTRY.current() {
        return Ok(provider);
    }

    let config = ProviderConfig::from_settings(settings)?;
    tracing::info!(
        provider = %config.provider_type,
        model = config.model(),
        "loading LLM provider"
    );

    let provider = REGISTRY.initialize(&config).await?;
    tracing::info!(provider = provider.name(), model = provider.model(), "LLM provider ready");
    Ok(provider)
}

/// The process-wide provider; fails before [`initialize_llm_provider`] has succeeded.
pub fn llm_provider() -> Result<Arc<dyn LLMProvider>, Error> {
    REGISTRY.current()
}

/// A chat service over the process-wide provider.
pub fn chat_service() -> Result<ChatService, Error> {
    Ok(ChatService::new(llm_provider()?))
}
