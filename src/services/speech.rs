use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::services::translate::{detect_or_default, Translator};

/// Turns text into MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>>;
}

/// Narrate `text` in its detected language (English when detection fails).
pub async fn narrate(
    speech: &dyn SpeechSynthesizer,
    translator: &dyn Translator,
    text: &str,
) -> Result<Vec<u8>> {
    let language = detect_or_default(translator, text).await;
    tracing::info!("Synthesizing {} chars of speech in {language}", text.len());
    speech.synthesize(text, &language).await
}

/// Used when no speech key is configured.
pub struct DisabledSpeech;

#[async_trait]
impl SpeechSynthesizer for DisabledSpeech {
    async fn synthesize(&self, _text: &str, _language_code: &str) -> Result<Vec<u8>> {
        Err(PipelineError::SpeechNotConfigured.into())
    }
}

// ─── Google Cloud Text-to-Speech ─────────────────────────

pub struct GoogleSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleSpeech {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

fn build_request<'a>(text: &'a str, language_code: &'a str) -> SynthesizeRequest<'a> {
    SynthesizeRequest {
        input: SynthesisInput { text },
        voice: VoiceSelection {
            language_code,
            ssml_gender: "NEUTRAL",
        },
        audio_config: AudioConfig {
            audio_encoding: "MP3",
        },
    }
}

fn decode_audio(body: &str) -> Result<Vec<u8>> {
    let resp: SynthesizeResponse =
        serde_json::from_str(body).context("Failed to parse speech response")?;
    base64::engine::general_purpose::STANDARD
        .decode(resp.audio_content.as_bytes())
        .context("Speech response audio was not valid base64")
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text:synthesize", self.base_url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(text, language_code))
            .send()
            .await
            .context("Failed to call Google Text-to-Speech API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Google Text-to-Speech API returned {status}: {body}");
        }

        let body = resp
            .text()
            .await
            .context("Failed to read Google Text-to-Speech response")?;
        decode_audio(&body)
    }
}
