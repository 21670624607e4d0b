mod gemini;

pub use gemini::GeminiTextGenerator;

/// Free-form text generation used to personalise reminder messages
#[async_trait::async_trait]
pub trait ITextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
