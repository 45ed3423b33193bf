use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

/// One decoded item of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatChunk {
    /// A content fragment
    Delta(String),
    /// The producer's explicit end-of-stream marker
    Finished,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// A hosted chat-completion API that streams its answer.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<ChatStream>;
}

/// Chat backend for the configured LLM provider.
pub struct LlmChat {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmChat {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatBackend for LlmChat {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<ChatStream> {
        stream_chat(&self.client, &self.config, messages).await
    }
}

/// Stream chat completions from Ollama or OpenAI.
pub async fn stream_chat(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    match config.provider.as_str() {
        "ollama" => stream_ollama(client, config, messages).await,
        "openai" => stream_openai(client, config, messages).await,
        other => anyhow::bail!("Unsupported LLM provider for chat: {other}"),
    }
}

#[derive(Serialize, Deserialize)]
struct StreamMessage {
    role: String,
    content: String,
}

fn to_stream_messages(messages: Vec<ChatMessage>) -> Vec<StreamMessage> {
    messages
        .into_iter()
        .map(|m| StreamMessage {
            role: m.role,
            content: m.content,
        })
        .collect()
}

// ─── Ollama streaming ────────────────────────────────────

#[derive(Serialize)]
struct OllamaStreamRequest {
    model: String,
    messages: Vec<StreamMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaStreamChunk {
    message: StreamMessage,
    done: bool,
}

async fn stream_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaStreamRequest {
        model: config.chat_model.clone(),
        messages: to_stream_messages(messages),
        stream: true,
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .json(&req)
        .send()
        .await
        .context("Failed to connect to Ollama for chat streaming")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_ollama_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

/// Parse a single Ollama streaming line. Returns:
/// - Some(Ok(Delta)) for content, Some(Ok(Finished)) for `done: true`
/// - Some(Err(e)) for parse errors
/// - None to skip empty lines and empty deltas
fn parse_ollama_line(line: &str) -> Option<Result<ChatChunk>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<OllamaStreamChunk>(line) {
        Ok(chunk) => {
            if chunk.done {
                return Some(Ok(ChatChunk::Finished));
            }
            let content = chunk.message.content;
            if content.is_empty() {
                return None;
            }
            Some(Ok(ChatChunk::Delta(content)))
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse Ollama chunk: {e}"))),
    }
}

// ─── OpenAI streaming ────────────────────────────────────

#[derive(Serialize)]
struct OpenAiStreamRequest {
    model: String,
    messages: Vec<StreamMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}

async fn stream_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    let url = format!("{}/v1/chat/completions", config.base_url);

    let req = OpenAiStreamRequest {
        model: config.chat_model.clone(),
        messages: to_stream_messages(messages),
        stream: true,
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .header(
            "Authorization",
            format!("Bearer {}", config.api_key.as_deref().unwrap_or("")),
        )
        .json(&req)
        .send()
        .await
        .context("Failed to connect to OpenAI for chat streaming")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_openai_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

/// Parse a single OpenAI SSE line. Returns:
/// - Some(Ok(Delta)) for content, Some(Ok(Finished)) for `[DONE]` or a finish reason
/// - Some(Err(e)) for parse errors
/// - None to skip empty lines, non-data lines and role-only chunks
fn parse_openai_line(line: &str) -> Option<Result<ChatChunk>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(ChatChunk::Finished));
    }

    match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => {
            let choice = chunk.choices.into_iter().next()?;
            let content = choice.delta.content.unwrap_or_default();
            if !content.is_empty() {
                return Some(Ok(ChatChunk::Delta(content)));
            }
            if choice.finish_reason.is_some() {
                return Some(Ok(ChatChunk::Finished));
            }
            None
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse OpenAI chunk: {e}"))),
    }
}

// ─── Line buffering ──────────────────────────────────────

/// Convert a byte stream into a stream of complete lines.
fn stream_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), Vec::<u8>::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                // Split on raw bytes so multi-byte characters spanning reads stay intact
                if let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
                    let rest = buffer.split_off(newline_pos + 1);
                    let line = String::from_utf8_lossy(&buffer[..newline_pos]).into_owned();
                    buffer = rest;
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        // Stream ended, emit remaining buffer if non-empty
                        let remaining = String::from_utf8_lossy(&buffer).into_owned();
                        buffer.clear();
                        if !remaining.trim().is_empty() {
                            return Some((Ok(remaining), (stream, buffer)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Ollama parsing ──────────────────────────────────

    #[test]
    fn test_parse_ollama_chunk() {
        let line = r#"{"message":{"role":"assistant","content":"Pink bollworm"},"done":false}"#;
        let result = parse_ollama_line(line);
        assert_eq!(
            result.unwrap().unwrap(),
            ChatChunk::Delta("Pink bollworm".into())
        );
    }

    #[test]
    fn test_parse_ollama_done_is_end_marker() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(parse_ollama_line(line).unwrap().unwrap(), ChatChunk::Finished);
    }

    #[test]
    fn test_parse_ollama_empty_content() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":false}"#;
        assert!(parse_ollama_line(line).is_none());
    }

    #[test]
    fn test_parse_ollama_malformed() {
        assert!(parse_ollama_line("not valid json{{{").unwrap().is_err());
    }

    // ─── OpenAI parsing ──────────────────────────────────

    #[test]
    fn test_parse_openai_data_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Thrips"},"finish_reason":null}]}"#;
        assert_eq!(
            parse_openai_line(line).unwrap().unwrap(),
            ChatChunk::Delta("Thrips".into())
        );
    }

    #[test]
    fn test_parse_openai_finish_reason_stop() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_openai_line(line).unwrap().unwrap(), ChatChunk::Finished);
    }

    #[test]
    fn test_parse_openai_done() {
        assert_eq!(
            parse_openai_line("data: [DONE]").unwrap().unwrap(),
            ChatChunk::Finished
        );
    }

    #[test]
    fn test_parse_openai_role_only_chunk() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(parse_openai_line(line).is_none());
    }

    #[test]
    fn test_parse_openai_no_choices() {
        assert!(parse_openai_line(r#"data: {"choices":[]}"#).is_none());
    }

    #[test]
    fn test_parse_openai_malformed() {
        assert!(parse_openai_line("data: {broken json").unwrap().is_err());
    }

    #[test]
    fn test_parse_openai_non_data_line() {
        assert!(parse_openai_line("event: message").is_none());
        assert!(parse_openai_line("   ").is_none());
    }

    // ─── Line buffering ──────────────────────────────────

    #[tokio::test]
    async fn test_stream_lines_joins_split_reads() {
        let parts: Vec<reqwest::Result<bytes::Bytes>> = vec![
            Ok(bytes::Bytes::from_static(b"data: one\nda")),
            Ok(bytes::Bytes::from_static(b"ta: two\n\n")),
            Ok(bytes::Bytes::from_static(b"data: tail")),
        ];
        let lines: Vec<String> = stream_lines(futures_util::stream::iter(parts))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["data: one", "data: two", "data: tail"]);
    }

    #[tokio::test]
    async fn test_stream_lines_keeps_split_utf8() {
        let word = "कपास\n".as_bytes();
        let parts: Vec<reqwest::Result<bytes::Bytes>> = vec![
            Ok(bytes::Bytes::copy_from_slice(&word[..2])),
            Ok(bytes::Bytes::copy_from_slice(&word[2..])),
        ];
        let lines: Vec<String> = stream_lines(futures_util::stream::iter(parts))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["कपास"]);
    }
}
