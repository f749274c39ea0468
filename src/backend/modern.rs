//! Google Translate v3 (modern generation) over REST.
//!
//! All calls are scoped to a parent resource such as
//! `projects/my-project/locations/us-central1`:
//!
//! ```text
//! POST   {base}/{parent}:translateText
//! POST   {base}/{parent}:detectLanguage
//! POST   {base}/{parent}/glossaries
//! GET    {base}/{parent}/glossaries?pageToken=..
//! DELETE {base}/{parent}/glossaries/{id}
//! ```
//!
//! Glossaries are addressed by their short id on this side; full resource
//! names only appear on the wire.

use crate::backend::{ModernBackend, ModernTranslateRequest};
use crate::error::{GatewayError, GatewayResult};
use crate::model::{DetectionRaw, Glossary, NewGlossary, TranslationWithGlossary};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TRANSLATE_OPERATION: &str = "Google Translate v3 translate";
const DETECT_OPERATION: &str = "Google Translate v3 detect";
const CREATE_GLOSSARY_OPERATION: &str = "Google Translate v3 create glossary";
const LIST_GLOSSARIES_OPERATION: &str = "Google Translate v3 list glossaries";
const DELETE_GLOSSARY_OPERATION: &str = "Google Translate v3 delete glossary";

const MIME_TYPE: &str = "text/plain";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateTextRequest<'a> {
    contents: [&'a str; 1],
    target_language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_language_code: Option<&'a str>,
    mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    glossary_config: Option<GlossaryConfig>,
}

#[derive(Debug, Serialize)]
struct GlossaryConfig {
    glossary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateTextResponse {
    #[serde(default)]
    translations: Vec<V3Translation>,
    #[serde(default)]
    glossary_translations: Vec<V3Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V3Translation {
    #[serde(default)]
    translated_text: String,
    #[serde(default)]
    detected_language_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectLanguageRequest<'a> {
    content: &'a str,
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DetectLanguageResponse {
    #[serde(default)]
    languages: Vec<V3DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V3DetectedLanguage {
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V3Glossary {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_config: Option<InputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language_pair: Option<LanguagePair>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig {
    #[serde(default)]
    gcs_source: Option<GcsSource>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcsSource {
    #[serde(default)]
    input_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanguagePair {
    source_language_code: String,
    target_language_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListGlossariesResponse {
    #[serde(default)]
    glossaries: Vec<V3Glossary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Modern backend client.
#[derive(Clone)]
pub struct GoogleTranslateV3 {
    client: reqwest::Client,
    parent: String,
    base_url: String,
    access_token: Option<String>,
}

impl GoogleTranslateV3 {
    pub const DEFAULT_BASE_URL: &'static str = "https://translation.googleapis.com/v3";

    pub fn new(client: reqwest::Client, parent: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            parent: parent.into().trim_matches('/').to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every call.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty());
        self
    }

    /// `tech-terms` -> `{parent}/glossaries/tech-terms`; full names pass through.
    fn glossary_name(&self, id: &str) -> String {
        if id.contains('/') {
            id.to_string()
        } else {
            format!("{}/glossaries/{}", self.parent, id)
        }
    }

    fn parent_url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.parent, suffix)
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> GatewayResult<reqwest::Response> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
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

        Ok(response)
    }

    async fn execute_json<R: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> GatewayResult<R> {
        self.execute(request, operation)
            .await?
            .json::<R>()
            .await
            .map_err(|e| {
                GatewayError::backend_call(
                    operation,
                    format!("unreadable response: {}", e.without_url()),
                )
            })
    }

    async fn fetch_glossary_page(&self, page_token: Option<&str>) -> GatewayResult<ListGlossariesResponse> {
        let mut request = self.client.get(self.parent_url("/glossaries"));
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        debug!(page_token, "{}", LIST_GLOSSARIES_OPERATION);
        self.execute_json(request, LIST_GLOSSARIES_OPERATION).await
    }
}

fn short_glossary_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

impl From<V3Glossary> for Glossary {
    fn from(glossary: V3Glossary) -> Self {
        let source_uri = glossary
            .input_config
            .and_then(|c| c.gcs_source)
            .map(|s| s.input_uri)
            .unwrap_or_default();

        Glossary {
            id: short_glossary_id(&glossary.name).to_string(),
            source_uri,
        }
    }
}

impl std::fmt::Debug for GoogleTranslateV3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslateV3")
            .field("parent", &self.parent)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl ModernBackend for GoogleTranslateV3 {
    async fn translate(
        &self,
        request: ModernTranslateRequest<'_>,
    ) -> GatewayResult<TranslationWithGlossary> {
        let body = TranslateTextRequest {
            contents: [request.text],
            target_language_code: request.target_language,
            source_language_code: request.source_language,
            mime_type: MIME_TYPE,
            glossary_config: request.glossary_id.map(|id| GlossaryConfig {
                glossary: self.glossary_name(id),
            }),
        };

        debug!(
            target_language = request.target_language,
            source_language = request.source_language,
            glossary_id = request.glossary_id,
            "{}",
            TRANSLATE_OPERATION
        );

        let response: TranslateTextResponse = self
            .execute_json(
                self.client.post(self.parent_url(":translateText")).json(&body),
                TRANSLATE_OPERATION,
            )
            .await?;

        let first = response
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::empty_result(TRANSLATE_OPERATION))?;

        let glossary_translated_text = response
            .glossary_translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .filter(|text| !text.is_empty());

        Ok(TranslationWithGlossary {
            translated_text: first.translated_text,
            original_text: request.text.to_string(),
            detected_language: first.detected_language_code.filter(|code| !code.is_empty()),
            target_language: request.target_language.to_string(),
            glossary_translated_text,
        })
    }

    async fn detect(&self, text: &str) -> GatewayResult<Vec<DetectionRaw>> {
        let body = DetectLanguageRequest {
            content: text,
            mime_type: MIME_TYPE,
        };

        debug!("{}", DETECT_OPERATION);

        let response: DetectLanguageResponse = self
            .execute_json(
                self.client.post(self.parent_url(":detectLanguage")).json(&body),
                DETECT_OPERATION,
            )
            .await?;

        if response.languages.is_empty() {
            return Err(GatewayError::empty_result(DETECT_OPERATION));
        }

        Ok(response
            .languages
            .into_iter()
            .map(|l| DetectionRaw {
                language: l.language_code,
                confidence: l.confidence,
            })
            .collect())
    }

    async fn create_glossary(&self, glossary: &NewGlossary) -> GatewayResult<()> {
        let body = V3Glossary {
            name: self.glossary_name(&glossary.id),
            input_config: Some(InputConfig {
                gcs_source: Some(GcsSource {
                    input_uri: glossary.source_uri.clone(),
                }),
            }),
            language_pair: Some(LanguagePair {
                source_language_code: glossary.source_language.clone(),
                target_language_code: glossary.target_language.clone(),
            }),
        };

        debug!(id = %glossary.id, source_uri = %glossary.source_uri, "{}", CREATE_GLOSSARY_OPERATION);

        self.execute(
            self.client.post(self.parent_url("/glossaries")).json(&body),
            CREATE_GLOSSARY_OPERATION,
        )
        .await?;

        Ok(())
    }

    fn list_glossaries(&self) -> BoxStream<'_, GatewayResult<Glossary>> {
        // None: listing finished. Some(None): first page. Some(Some(t)): page `t`.
        stream::try_unfold(Some(None::<String>), move |cursor| async move {
            let Some(page_token) = cursor else {
                return Ok::<_, GatewayError>(None);
            };

            let page = self.fetch_glossary_page(page_token.as_deref()).await?;
            let next = page
                .next_page_token
                .filter(|token| !token.is_empty())
                .map(Some);

            let items = page
                .glossaries
                .into_iter()
                .map(|g| Ok::<_, GatewayError>(Glossary::from(g)))
                .collect::<Vec<_>>();

            Ok(Some((stream::iter(items), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn delete_glossary(&self, id: &str) -> GatewayResult<()> {
        let url = format!("{}/{}", self.base_url, self.glossary_name(id));

        debug!(id, "{}", DELETE_GLOSSARY_OPERATION);

        self.execute(self.client.delete(url), DELETE_GLOSSARY_OPERATION)
            .await?;

        Ok(())
    }

    fn backend_name(&self) -> &str {
        "Google Translate v3"
    }
}
