//! Google Translate v2 (legacy generation) over REST.
//!
//! The v2 API authenticates with an API key in the query string and wraps
//! every payload in a `data` envelope:
//!
//! ```text
//! POST {base}?key=K          {"q":[text],"target":"fr","format":"text"}
//!   -> {"data":{"translations":[{"translatedText":..,"detectedSourceLanguage":..}]}}
//! POST {base}/detect?key=K   {"q":[text]}
//!   -> {"data":{"detections":[[{"language":..,"confidence":..,"isReliable":..}]]}}
//! ```
//!
//! `isReliable` is ignored; reliability is derived from confidence.

use crate::backend::LegacyBackend;
use crate::error::{ErrorKind, GatewayError, GatewayResult};
use crate::model::{parse_language_tag, Detection, LanguageTag, Translation};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const TRANSLATE_OPERATION: &str = "Google Translate v2 translate";
const DETECT_OPERATION: &str = "Google Translate v2 detect";

#[derive(Debug, Deserialize)]
struct TranslateEnvelope {
    #[serde(default)]
    data: TranslationsData,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationsData {
    #[serde(default)]
    translations: Vec<V2Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Translation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectEnvelope {
    #[serde(default)]
    data: DetectionsData,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionsData {
    #[serde(default)]
    detections: Vec<Vec<V2Detection>>,
}

#[derive(Debug, Deserialize)]
struct V2Detection {
    language: String,
    #[serde(default)]
    confidence: f64,
}

/// Legacy backend client.
#[derive(Clone)]
pub struct GoogleTranslateV2 {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleTranslateV2 {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://translation.googleapis.com/language/translate/v2";

    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B, R>(&self, url: &str, body: &B, operation: &str) -> GatewayResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(url, "{}", operation);

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::backend_call(operation, e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(GatewayError::backend_call(
                operation,
                format!("{}: {}", status, body),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| {
                GatewayError::backend_call(
                    operation,
                    format!("unreadable response: {}", e.without_url()),
                )
            })
    }
}

impl std::fmt::Debug for GoogleTranslateV2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslateV2")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl LegacyBackend for GoogleTranslateV2 {
    async fn translate(
        &self,
        text: &str,
        target_language: &LanguageTag,
    ) -> GatewayResult<Translation> {
        let body = json!({
            "q": [text],
            "target": target_language.to_string(),
            "format": "text",
        });

        let envelope: TranslateEnvelope = self
            .post(&self.base_url, &body, TRANSLATE_OPERATION)
            .await?;

        let first = envelope
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::empty_result(TRANSLATE_OPERATION))?;

        let detected_language = match first
            .detected_source_language
            .as_deref()
            .filter(|raw| !raw.is_empty())
        {
            Some(raw) => Some(parse_language_tag("detected language", raw)?),
            None => None,
        };

        Ok(Translation {
            translated_text: first.translated_text,
            original_text: text.to_string(),
            detected_language,
            target_language: target_language.clone(),
        })
    }

    async fn detect(&self, text: &str) -> GatewayResult<Vec<Detection>> {
        let url = format!("{}/detect", self.base_url);
        let body = json!({ "q": [text] });

        let envelope: DetectEnvelope = self.post(&url, &body, DETECT_OPERATION).await?;

        let first = envelope
            .data
            .detections
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::empty_result(DETECT_OPERATION))?;

        if first.is_empty() {
            return Err(GatewayError::new(
                ErrorKind::BackendEmptyDetection,
                format!("{} returned an empty detection list", DETECT_OPERATION),
            ));
        }

        first
            .into_iter()
            .map(|d| {
                let language = parse_language_tag("detected language", &d.language)?;
                Ok(Detection::new(language, d.confidence))
            })
            .collect()
    }

    fn backend_name(&self) -> &str {
        "Google Translate v2"
    }
}
