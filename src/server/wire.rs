//! JSON bodies of the HTTP surface and the helpers that read and write them.

use crate::error::{ErrorKind, GatewayError, GatewayResult};
use crate::model::{Detection, DetectionRaw, Glossary, Translation, TranslationWithGlossary};
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ==================== Requests ====================
//
// Every field defaults to empty so that an absent field reaches validation
// as "empty" instead of failing the decode.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TranslateRequestBody {
    pub text: String,
    pub target_locale: String,
    /// Unified route only: serve from the modern backend
    pub v3: bool,
    /// Modern route only
    pub source_locale: String,
    /// Modern route only
    pub glossary: Option<GlossaryRef>,
}

impl TranslateRequestBody {
    /// The glossary id, if one was supplied and is non-empty.
    pub fn glossary_id(&self) -> Option<&str> {
        self.glossary
            .as_ref()
            .map(|g| g.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn source_locale(&self) -> Option<&str> {
        Some(self.source_locale.as_str()).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GlossaryRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetectRequestBody {
    pub text: String,
    pub v3: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateGlossaryBody {
    pub id: String,
    pub gcs_source: String,
    pub source_locale: String,
    pub target_locale: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteGlossaryBody {
    pub id: String,
}

// ==================== Responses ====================

#[derive(Debug, Serialize)]
pub struct OriginalContent {
    pub text: String,
    pub detected_locale: String,
}

#[derive(Debug, Serialize)]
pub struct TranslatedContent {
    pub text: String,
    pub locale: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponseBody {
    pub original: OriginalContent,
    pub translated: TranslatedContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glossary_translated: Option<TranslatedContent>,
}

impl From<Translation> for TranslateResponseBody {
    fn from(translation: Translation) -> Self {
        Self {
            original: OriginalContent {
                text: translation.original_text,
                detected_locale: translation
                    .detected_language
                    .map(|tag| tag.to_string())
                    .unwrap_or_default(),
            },
            translated: TranslatedContent {
                text: translation.translated_text,
                locale: translation.target_language.to_string(),
            },
            glossary_translated: None,
        }
    }
}

impl From<TranslationWithGlossary> for TranslateResponseBody {
    fn from(translation: TranslationWithGlossary) -> Self {
        let glossary_translated = translation
            .glossary_translated_text
            .map(|text| TranslatedContent {
                text,
                locale: translation.target_language.clone(),
            });

        Self {
            original: OriginalContent {
                text: translation.original_text,
                detected_locale: translation.detected_language.unwrap_or_default(),
            },
            translated: TranslatedContent {
                text: translation.translated_text,
                locale: translation.target_language,
            },
            glossary_translated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetectedLocale {
    pub locale: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct DetectResponseBody {
    pub results: Vec<DetectedLocale>,
}

impl From<Vec<Detection>> for DetectResponseBody {
    fn from(detections: Vec<Detection>) -> Self {
        Self {
            results: detections
                .iter()
                .map(|d| DetectedLocale {
                    locale: d.language().to_string(),
                    confidence: d.confidence(),
                })
                .collect(),
        }
    }
}

/// Modern detections are rendered exactly as reported.
impl From<Vec<DetectionRaw>> for DetectResponseBody {
    fn from(detections: Vec<DetectionRaw>) -> Self {
        Self {
            results: detections
                .into_iter()
                .map(|d| DetectedLocale {
                    locale: d.language,
                    confidence: d.confidence,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GlossaryBody {
    pub id: String,
    pub gcs_source: String,
}

#[derive(Debug, Serialize)]
pub struct ListGlossariesResponseBody {
    pub glossaries: Vec<GlossaryBody>,
}

impl From<Vec<Glossary>> for ListGlossariesResponseBody {
    fn from(glossaries: Vec<Glossary>) -> Self {
        Self {
            glossaries: glossaries
                .into_iter()
                .map(|g| GlossaryBody {
                    id: g.id,
                    gcs_source: g.source_uri,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadinessBody {
    pub ready: bool,
}

/// Serialises as `{}`.
#[derive(Debug, Serialize)]
pub struct EmptyBody {}

// ==================== Extractor / encoder ====================

/// JSON request body that rejects with a [`GatewayError`] of kind
/// `DecodeRequestBody`, whatever the `Content-Type` header says.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            GatewayError::new(ErrorKind::DecodeRequestBody, "request body could not be read")
                .with_cause(e)
        })?;

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|e| {
            GatewayError::new(ErrorKind::DecodeRequestBody, "request body is not valid JSON")
                .with_cause(e)
        })
    }
}

/// Serialise `body` up front so an encoding failure is reported as an
/// error response instead of a truncated success.
pub fn encode<T: Serialize>(status: StatusCode, body: &T) -> GatewayResult<Response> {
    let bytes = serde_json::to_vec(body).map_err(|e| {
        GatewayError::new(ErrorKind::EncodeResponse, "response body could not be encoded")
            .with_cause(e)
    })?;

    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        bytes,
    )
        .into_response())
}
