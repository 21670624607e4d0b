use super::ITextGenerator;
use crate::{
    config::GeminiConfig,
    services::channels::{ensure_success, network_error},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

const PROVIDER: &str = "Gemini";

pub struct GeminiTextGenerator {
    client: Client,
    config: GeminiConfig,
}

impl GeminiTextGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[async_trait::async_trait]
impl ITextGenerator for GeminiTextGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let res = self
            .client
            .post(&url)
            .query(&[("key", &self.config.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;
        let res = ensure_success(PROVIDER, res).await?;

        let res = res.json::<GenerateContentResponse>().await.map_err(|e| {
            error!(
                "[Unexpected Response] Gemini API POST error. Error message: {:?}",
                e
            );
            anyhow::Error::new(e)
        })?;

        let text = res
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Gemini API returned no text");
        }
        Ok(text.to_string())
    }
}
