pub mod metrics;
pub mod normalizer;
pub mod prompt;
pub mod providers;

pub use normalizer::{normalize, Normalized};
pub use prompt::PromptBuilder;
pub use providers::{ProviderError, UpstreamClient};
