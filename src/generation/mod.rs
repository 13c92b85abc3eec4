//! Text generation collaborator.
//!
//! Handlers talk to the language model only through `TextGenerator`; the
//! production implementation is `OpenAiClient`.

pub mod handlers;
pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use crate::error::GenerationError;

pub use openai::OpenAiClient;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Runs one completion with a fixed system instruction and returns the
    /// generated text.
    async fn generate(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}
