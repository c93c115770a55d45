//! Structured meeting summaries from the finished transcript.
//!
//! Summaries are best-effort: callers treat every failure in here as soft
//! and persist the session with a null summary instead of surfacing an
//! error to the user.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The structured result the summary model is asked to produce.
/// All three fields are required by the response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    /// Concise prose summary of the meeting
    pub summary: String,
    /// Key points discussed
    pub key_points: Vec<String>,
    /// Concrete action items
    pub action_items: Vec<String>,
}

/// Summarization backend seam; swapped for stubs in tests.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<SummaryResult>;
}

/// Gemini `generateContent` summarizer with a strict JSON response schema.
pub struct GeminiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiSummarizer {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
        }
    }

    fn prompt(transcript: &str) -> String {
        format!(
            "You are an expert executive assistant. Summarize the following meeting transcript.\n\
             The transcript may be in English, Hindi, or a mix of languages.\n\
             \n\
             Transcript:\n\
             \"{}\"\n\
             \n\
             Output JSON with a concise summary paragraph, the key points, and the action items \
             (keep the summary in the primary language of the transcript, or English if preferred \
             for business).",
            transcript
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[async_trait::async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<SummaryResult> {
        let api_key = Config::gemini_api_key()?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": Self::prompt(transcript) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "summary": { "type": "STRING" },
                        "keyPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "actionItems": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["summary", "keyPoints", "actionItems"]
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("summary request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("summary request returned {}: {}", status, error_text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("summary response was not valid JSON")?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("summary response contained no text"))?;

        serde_json::from_str(&text).context("summary text did not match the requested schema")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_result_uses_camel_case_keys() {
        let result = SummaryResult {
            summary: "Weekly sync.".to_string(),
            key_points: vec!["Budget approved".to_string()],
            action_items: vec!["Send invite".to_string()],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"], "Weekly sync.");
        assert_eq!(json["keyPoints"][0], "Budget approved");
        assert_eq!(json["actionItems"][0], "Send invite");
    }

    #[test]
    fn summary_result_parses_model_output() {
        let text = r#"{"summary":"S","keyPoints":["a","b"],"actionItems":[]}"#;
        let parsed: SummaryResult = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.key_points.len(), 2);
        assert!(parsed.action_items.is_empty());
    }

    #[test]
    fn prompt_embeds_the_transcript() {
        let prompt = GeminiSummarizer::prompt("hello world");
        assert!(prompt.contains("\"hello world\""));
        assert!(prompt.contains("executive assistant"));
    }
}
