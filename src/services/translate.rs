use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Language assumed when detection is unavailable or fails.
pub const DEFAULT_LANGUAGE: &str = "en";

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` into `target` (ISO-639-1 codes).
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Detect the language of `text`.
    async fn detect_language(&self, text: &str) -> Result<String>;
}

/// Translate, skipping the service when the languages already match.
pub async fn translate_text(
    translator: &dyn Translator,
    text: &str,
    source: &str,
    target: &str,
) -> Result<String> {
    if source.eq_ignore_ascii_case(target) || text.trim().is_empty() {
        return Ok(text.to_string());
    }
    translator.translate(text, source, target).await
}

/// Detect the language of `text`, falling back to [`DEFAULT_LANGUAGE`].
pub async fn detect_or_default(translator: &dyn Translator, text: &str) -> String {
    match translator.detect_language(text).await {
        Ok(lang) if !lang.is_empty() && lang != "und" => lang,
        Ok(lang) => {
            tracing::warn!("Language detection was inconclusive ({lang:?}), using {DEFAULT_LANGUAGE}");
            DEFAULT_LANGUAGE.to_string()
        }
        Err(e) => {
            tracing::warn!("Language detection failed, using {DEFAULT_LANGUAGE}: {e}");
            DEFAULT_LANGUAGE.to_string()
        }
    }
}

/// Used when no translation key is configured: text passes through unchanged.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        Ok(text.to_string())
    }

    async fn detect_language(&self, _text: &str) -> Result<String> {
        Ok(DEFAULT_LANGUAGE.to_string())
    }
}

// ─── Google Cloud Translation v2 ─────────────────────────

pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .context("Failed to call Google Translation API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Google Translation API returned {status}: {body}");
        }

        resp.text()
            .await
            .context("Failed to read Google Translation response")
    }
}

#[derive(Serialize)]
struct TranslateBody<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Serialize)]
struct DetectBody<'a> {
    q: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct TranslationsData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Deserialize)]
struct DetectionsData {
    detections: Vec<Vec<Detection>>,
}

#[derive(Deserialize)]
struct Detection {
    language: String,
    #[serde(default)]
    confidence: f32,
}

fn parse_translation(body: &str) -> Result<String> {
    let env: Envelope<TranslationsData> =
        serde_json::from_str(body).context("Failed to parse translation response")?;
    env.data
        .translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .context("Translation response had no translations")
}

/// Pick the most confident detection for the first input.
fn parse_detection(body: &str) -> Result<String> {
    let env: Envelope<DetectionsData> =
        serde_json::from_str(body).context("Failed to parse detection response")?;
    env.data
        .detections
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|d| d.language)
        .context("Detection response had no detections")
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let body = self
            .post(
                "/language/translate/v2",
                &TranslateBody {
                    q: text,
                    source,
                    target,
                    format: "text",
                },
            )
            .await?;
        parse_translation(&body)
    }

    async fn detect_language(&self, text: &str) -> Result<String> {
        let body = self
            .post("/language/translate/v2/detect", &DetectBody { q: text })
            .await?;
        parse_detection(&body)
    }
}
