//! An OpenAI-compatible chat completion gateway.
//!
//! Requests are answered by a single process-wide generation provider (a local
//! Qwen3 or Gemma3 model, or a mock), either as one complete response or as a
//! stream of `chat.completion.chunk` objects.

pub mod error;
pub mod types;
pub mod provider;
pub mod providers;
pub mod response;
pub mod sse_stream;
pub mod accumulator;
pub mod factory;
pub mod registry;
pub mod service;
pub mod server;
pub mod telemetry;

// Re-export core types for easy usage
pub use error::Error;
pub use types::*;
pub use provider::LLMProvider;
pub use providers::*;
pub use response::GenerationStream;
pub use accumulator::GenerationAccumulator;
pub use factory::{ProviderConfig, ProviderFactory, ProviderType};
pub use registry::{initialize_llm_provider, ProviderRegistry};
pub use service::{ChatService, ChunkStream};
