//! Streaming chat session for the follow-up consult
//!
//! A chat session is opened against one diagnosis and seeded with a
//! system instruction summarizing it. Each send posts the conversation so
//! far to the streaming generateContent endpoint and forwards the reply
//! as text fragments, in arrival order, over a channel. The stream is
//! finite and non-restartable; a send either completes or fails once.

mod transcript;

pub(crate) use transcript::{ChatMessage, Role, Transcript};

use crate::analysis::wire::{self, Content, GenerateContentRequest, GenerateContentResponse};
use crate::analysis::Diagnosis;
use anyhow::Context as _;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// Events emitted by an active reply stream
#[derive(Debug, Clone)]
pub(crate) enum ChatStreamEvent {
    /// Next piece of the reply, in arrival order
    Fragment(String),
    /// The stream finished; `reply` is the full concatenated text
    Completed { reply: String },
    /// The stream died before completing
    Failed(String),
}

/// A stateful conversation grounded in one diagnosis
pub(crate) struct ChatSession {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    system_instruction: String,
    turns: Vec<Content>,
}

impl ChatSession {
    /// Open a chat session for a diagnosis
    ///
    /// `endpoint` is `(base_url, model, api_key)` as produced by
    /// `GeminiClient::endpoint`.
    pub(crate) fn open(
        endpoint: (String, String, String),
        diagnosis: &Diagnosis,
    ) -> anyhow::Result<Self> {
        let (base_url, model, api_key) = endpoint;

        // No overall timeout: reply streams are open-ended by design
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for ChatSession")?;

        let system_instruction = format!(
            "You are a dermatology assistant. The user just received an analysis for {} \
             (Severity: {}). Description: {}. \
             Your goal is to answer their follow-up questions about this specific condition, \
             skincare ingredients, and routines. Keep answers helpful, evidence-based, and \
             always maintain a professional tone. Reiterate the disclaimer if they ask for \
             definitive medical diagnoses.",
            diagnosis.condition, diagnosis.severity, diagnosis.description
        );

        Ok(Self {
            base_url,
            model,
            api_key,
            client,
            system_instruction,
            turns: Vec::new(),
        })
    }

    /// Send one user message
    ///
    /// The message joins the conversation context immediately; reply
    /// fragments arrive on the returned channel. The caller must feed
    /// `Completed.reply` back through [`ChatSession::record_reply`] so
    /// later sends carry the full conversation.
    pub(crate) fn send(&mut self, text: String) -> mpsc::UnboundedReceiver<ChatStreamEvent> {
        self.turns.push(Content::text("user", text));

        let request = GenerateContentRequest {
            contents: self.turns.clone(),
            system_instruction: Some(Content::text("system", self.system_instruction.clone())),
            generation_config: None,
        };

        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        tokio::spawn(run_stream(client, url, request, event_tx));
        event_rx
    }

    /// Record a completed assistant reply as conversation context
    pub(crate) fn record_reply(&mut self, reply: String) {
        self.turns.push(Content::text("model", reply));
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}

/// Drive one reply stream to completion or failure
async fn run_stream(
    client: reqwest::Client,
    url: String,
    request: GenerateContentRequest,
    event_tx: mpsc::UnboundedSender<ChatStreamEvent>,
) {
    let response = match client.post(&url).json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Chat request failed: {}", e);
            let _ = event_tx.send(ChatStreamEvent::Failed(e.to_string()));
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(status, "Chat request rejected: {}", message);
        let _ = event_tx.send(ChatStreamEvent::Failed(format!(
            "Server error ({status})"
        )));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut parser = SseParser::default();
    let mut reply = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Chat stream died mid-response: {}", e);
                let _ = event_tx.send(ChatStreamEvent::Failed(e.to_string()));
                return;
            }
        };

        for fragment in parser.push(&bytes) {
            reply.push_str(&fragment);
            if event_tx.send(ChatStreamEvent::Fragment(fragment)).is_err() {
                // Receiver is gone; nothing left to stream to
                return;
            }
        }
    }

    debug!(reply_len = reply.len(), "Chat stream complete");
    let _ = event_tx.send(ChatStreamEvent::Completed { reply });
}

/// Incremental parser for an SSE byte stream
///
/// Network chunks need not align with event boundaries, so bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
struct SseParser {
    buffer: String,
}

impl SseParser {
    /// Feed one network chunk; returns the text fragments it completed
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut fragments = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim_end_matches('\r').to_string();
            self.buffer.drain(..=newline);
            if let Some(fragment) = parse_sse_line(&line) {
                fragments.push(fragment);
            }
        }
        fragments
    }
}

/// Extract the reply text carried by one SSE line, if any
///
/// Non-data lines (comments, keep-alives, blank separators) and
/// payloads without candidate text are skipped.
fn parse_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let response: GenerateContentResponse = serde_json::from_str(data).ok()?;
    wire::extract_text(&response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse_data(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\n"
        )
    }

    #[test]
    fn test_parse_sse_line_extracts_fragment() {
        let line = sse_data("Hello");
        assert_eq!(parse_sse_line(line.trim_end()).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_sse_line_skips_noise() {
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("data:").is_none());
        assert!(parse_sse_line("data: [DONE]").is_none());
        assert!(parse_sse_line("event: ping").is_none());
    }

    #[test]
    fn test_parser_handles_fragment_split_across_chunks() {
        let mut parser = SseParser::default();
        let event = sse_data("Salicylic acid");
        let (head, tail) = event.split_at(event.len() / 2);

        assert!(parser.push(head.as_bytes()).is_empty());
        let fragments = parser.push(tail.as_bytes());
        assert_eq!(fragments, vec!["Salicylic acid".to_string()]);
    }

    #[test]
    fn test_parser_yields_fragments_in_order() {
        let mut parser = SseParser::default();
        let chunk = format!("{}{}", sse_data("one "), sse_data("two"));
        let fragments = parser.push(chunk.as_bytes());
        assert_eq!(fragments, vec!["one ".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_session_records_turns() {
        let diagnosis = sample_diagnosis();
        let session = ChatSession::open(
            (
                "https://example.invalid/models".to_string(),
                "test-model".to_string(),
                "key".to_string(),
            ),
            &diagnosis,
        )
        .expect("open");

        assert!(session.system_instruction.contains("Rosacea"));
        assert!(session.system_instruction.contains("Mild"));
        assert!(session.turns.is_empty());
    }

    fn sample_diagnosis() -> Diagnosis {
        serde_json::from_value(serde_json::json!({
            "condition": "Rosacea",
            "confidence": 0.8,
            "description": "Diffuse redness.",
            "severity": "Mild",
            "recommendations": [],
            "suggestedIngredients": [],
            "disclaimer": "Not medical advice.",
            "detections": []
        }))
        .expect("diagnosis")
    }
}
