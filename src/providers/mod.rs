//! Provider implementations for different generation backends.

pub mod local;
pub mod mock;

// Re-export commonly used provider types
pub use local::{LocalModelProvider, ModelFamily};
pub use mock::MockProvider;
