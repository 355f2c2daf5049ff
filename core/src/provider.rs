use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::ProviderResult;

/// A natural-language model that turns a prompt into a single text completion.
///
/// Nothing beyond "send text, receive text" is assumed of the provider.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

#[async_trait]
impl<P: ExtractionProvider + ?Sized> ExtractionProvider for Arc<P> {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        (**self).generate(prompt).await
    }
}

/// Type alias for Arc-wrapped provider trait objects
pub type ExtractionProviderRef = Arc<dyn ExtractionProvider>;
