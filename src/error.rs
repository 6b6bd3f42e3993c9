use thiserror::Error;

/// Errors that can occur in the chat gateway.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown LLM provider: {name}. Supported providers: gemma3, qwen3, mock")]
    UnknownProvider { name: String },

    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    #[error("LLM provider is not initialized. Call initialize_llm_provider() first.")]
    NotInitialized,

    #[error("Failed to initialize {provider} backend: {message}")]
    BackendInit { provider: String, message: String },

    #[error("Backend error: {provider} - {message}")]
    Backend { provider: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Error::UnknownProvider { name: name.into() }
    }

    pub fn unknown_model(model: impl Into<String>) -> Self {
        Error::UnknownModel {
            model: model.into(),
        }
    }

    pub fn backend_init(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendInit {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::UnknownProvider { .. } | Error::UnknownModel { .. } => 404,
            Error::Backend { .. } | Error::Http(_) | Error::Streaming(_) => 502,
            Error::NotInitialized
            | Error::BackendInit { .. }
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Io(_) => 500,
        }
    }

    /// OpenAI-style error `type` tag.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_request_error",
            Error::UnknownProvider { .. } | Error::UnknownModel { .. } => "not_found_error",
            Error::Backend { .. } | Error::Http(_) => "upstream_error",
            Error::Streaming(_) => "streaming_error",
            _ => "internal_error",
        }
    }

    /// Whether the error was caused by the caller rather than the gateway.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
