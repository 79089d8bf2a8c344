// Summarization stage contract and Ollama-style client
//
// The fully assembled transcript is sent once, whole, to an external LLM
// service with a fixed prompt asking for structured meeting minutes. The raw
// response text becomes the minutes artifact verbatim. Every failure mode is
// soft: the pipeline substitutes a diagnostic placeholder and the job still
// completes, because the transcript is the primary deliverable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;

use super::StageError;

/// Minutes artifact content used when the summarization call fails
pub const MINUTES_UNAVAILABLE_PLACEHOLDER: &str =
    "Error: could not generate minutes from the LLM. \
     Please check the summarization service and try again.";

/// Build the fixed minutes-generation prompt around a transcript
pub fn build_minutes_prompt(transcript_text: &str) -> String {
    format!(
        "You are an assistant that writes clear, concise minutes of meetings.\n\n\
         Here is the full conversation transcript:\n\n\
         {}\n\n\
         Please generate structured minutes with sections:\n\
         1. Attendees\n\
         2. Date & Time (if mentioned)\n\
         3. Agenda\n\
         4. Key Discussion Points\n\
         5. Decisions Taken\n\
         6. Action Items (with owner and due date if available)\n",
        transcript_text
    )
}

/// Summarization service boundary
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate minutes text from the assembled transcript. The API key
    /// comes from the job descriptor and is never persisted.
    async fn summarize(&self, transcript_text: &str, api_key: &str)
        -> Result<String, StageError>;
}

/// Ollama-style generate request (non-streaming)
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Ollama-style generate response
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for an Ollama-style `/api/generate` endpoint
pub struct OllamaSummarizer {
    config: SummarizerConfig,
    client: Client,
}

impl OllamaSummarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(
        &self,
        transcript_text: &str,
        api_key: &str,
    ) -> Result<String, StageError> {
        let url = format!("{}/api/generate", self.config.base_url);

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_minutes_prompt(transcript_text),
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&request);
        if !api_key.is_empty() {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StageError::Summarization(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::Summarization(format!(
                "Service returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| StageError::Summarization(format!("Invalid response: {}", e)))?;

        if generated.response.is_empty() {
            return Err(StageError::Summarization(
                "Service returned an empty response".to_string(),
            ));
        }

        Ok(generated.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_transcript_and_sections() {
        let prompt = build_minutes_prompt("[en][0.00:5.00] Speaker 1: Hello");

        assert!(prompt.contains("[en][0.00:5.00] Speaker 1: Hello"));
        assert!(prompt.contains("1. Attendees"));
        assert!(prompt.contains("6. Action Items"));
    }
}
