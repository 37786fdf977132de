use crate::config::SummarizerKind;
use crate::types::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Minimum content length worth summarizing; shorter text passes through.
const MIN_SUMMARIZABLE_LEN: usize = 100;
const TRUNCATE_WORDS: usize = 25;

/// Derives the stored summary for a news post. The variant is selected at
/// configuration time; summaries are computed once at creation and never
/// recomputed.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> String;
}

/// Word-boundary truncation, the baseline variant.
pub struct TruncationSummarizer;

pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut out = words[..max_words].join(" ");
    out.push('…');
    out
}

#[async_trait]
impl Summarizer for TruncationSummarizer {
    async fn summarize(&self, text: &str) -> String {
        if text.len() < MIN_SUMMARIZABLE_LEN {
            return text.to_string();
        }
        truncate_words(text, TRUNCATE_WORDS)
    }
}

/// LLM-backed summarization against an OpenAI-style completion endpoint.
/// Any transport or shape error falls open to truncation so one bad call
/// never drops a news entry.
pub struct LlmSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

impl LlmSummarizer {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn request_summary(&self, text: &str) -> Option<String> {
        // Cap the prompt; upstream articles can be arbitrarily long.
        let excerpt: String = text.chars().take(1024).collect();
        let body = json!({
            "messages": [
                {"role": "system", "content": "Summarize the article in at most three sentences."},
                {"role": "user", "content": excerpt}
            ],
            "max_tokens": 120
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?;

        let parsed: CompletionResponse = response.json().await.ok()?;
        let summary = parsed.choices.into_iter().next()?.message.content;
        let summary = summary.trim();
        if summary.is_empty() {
            None
        } else {
            Some(summary.to_string())
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str) -> String {
        if text.len() < MIN_SUMMARIZABLE_LEN {
            return text.to_string();
        }
        match self.request_summary(text).await {
            Some(summary) => {
                debug!("LLM summary produced ({} chars)", summary.len());
                summary
            }
            None => {
                warn!("LLM summarization failed, falling back to truncation");
                truncate_words(text, TRUNCATE_WORDS)
            }
        }
    }
}

pub fn from_config(kind: &SummarizerKind) -> Result<Box<dyn Summarizer>> {
    Ok(match kind {
        SummarizerKind::Truncation => Box::new(TruncationSummarizer),
        SummarizerKind::Llm { endpoint, api_key } => {
            Box::new(LlmSummarizer::new(endpoint.clone(), api_key.clone())?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_text_passes_through() {
        let text = "Short career note.";
        assert_eq!(TruncationSummarizer.summarize(text).await, text);
    }

    #[tokio::test]
    async fn long_text_is_truncated_at_word_boundary() {
        let text = "word ".repeat(60);
        let summary = TruncationSummarizer.summarize(&text).await;
        assert_eq!(summary.split_whitespace().count(), TRUNCATE_WORDS);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn truncate_keeps_short_input_intact() {
        assert_eq!(truncate_words("one two three", 25), "one two three");
    }

    #[test]
    fn from_config_builds_both_variants() {
        assert!(from_config(&SummarizerKind::Truncation).is_ok());
        assert!(from_config(&SummarizerKind::Llm {
            endpoint: "https://llm.example/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
        })
        .is_ok());
    }
}
