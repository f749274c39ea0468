//! Route handlers. Each one validates its body, calls a backend and renders
//! the canonical record; any failure is returned as a [`GatewayError`].

use crate::backend::{collect_glossaries, ModernTranslateRequest};
use crate::error::{GatewayError, GatewayResult};
use crate::model::{parse_language_tag, LanguageTag, NewGlossary};
use crate::server::wire::{
    encode, CreateGlossaryBody, DeleteGlossaryBody, DetectRequestBody, DetectResponseBody,
    EmptyBody, JsonBody, ListGlossariesResponseBody, ReadinessBody, TranslateRequestBody,
    TranslateResponseBody,
};
use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

fn require<'a>(field: &str, value: &'a str) -> GatewayResult<&'a str> {
    if value.is_empty() {
        Err(GatewayError::missing_field(field))
    } else {
        Ok(value)
    }
}

fn parse_target_locale(raw: &str) -> GatewayResult<LanguageTag> {
    let raw = require("target_locale", raw)?;
    parse_language_tag("target_locale", raw).map_err(|e| {
        GatewayError::invalid_field("target_locale", e.cause.unwrap_or(e.message))
    })
}

// ==================== Translate / detect ====================

pub async fn legacy_translate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TranslateRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;
    let target = parse_target_locale(&body.target_locale)?;

    let translation = state.compat.translate_selectable(text, &target, false).await?;
    encode(StatusCode::CREATED, &TranslateResponseBody::from(translation))
}

pub async fn legacy_detect(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DetectRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;

    let detections = state.compat.detect_selectable(text, false).await?;
    encode(StatusCode::CREATED, &DetectResponseBody::from(detections))
}

/// The target and source codes go upstream as plain strings.
pub async fn modern_translate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TranslateRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;
    let target = require("target_locale", &body.target_locale)?;

    let request = ModernTranslateRequest::new(text, target)
        .with_source_language(body.source_locale())
        .with_glossary(body.glossary_id());

    let translation = state.compat.modern().translate(request).await?;
    encode(StatusCode::CREATED, &TranslateResponseBody::from(translation))
}

pub async fn modern_detect(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DetectRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;

    let detections = state.compat.modern().detect(text).await?;
    encode(StatusCode::CREATED, &DetectResponseBody::from(detections))
}

pub async fn unified_translate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TranslateRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;
    let target = parse_target_locale(&body.target_locale)?;

    let translation = state
        .compat
        .translate_selectable(text, &target, body.v3)
        .await?;
    encode(StatusCode::CREATED, &TranslateResponseBody::from(translation))
}

pub async fn unified_detect(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DetectRequestBody>,
) -> GatewayResult<Response> {
    let text = require("text", &body.text)?;

    let detections = state.compat.detect_selectable(text, body.v3).await?;
    encode(StatusCode::CREATED, &DetectResponseBody::from(detections))
}

// ==================== Glossaries ====================

pub async fn list_glossaries(State(state): State<AppState>) -> GatewayResult<Response> {
    let glossaries = collect_glossaries(state.compat.modern().as_ref()).await?;
    encode(StatusCode::OK, &ListGlossariesResponseBody::from(glossaries))
}

pub async fn create_glossary(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateGlossaryBody>,
) -> GatewayResult<Response> {
    let glossary = NewGlossary {
        id: require("id", &body.id)?.to_string(),
        source_uri: require("gcs_source", &body.gcs_source)?.to_string(),
        source_language: require("source_locale", &body.source_locale)?.to_string(),
        target_language: require("target_locale", &body.target_locale)?.to_string(),
    };

    state.compat.modern().create_glossary(&glossary).await?;
    info!(id = %glossary.id, source_uri = %glossary.source_uri, "Glossary created");

    encode(StatusCode::CREATED, &EmptyBody {})
}

pub async fn delete_glossary(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<DeleteGlossaryBody>,
) -> GatewayResult<Response> {
    let id = require("id", &body.id)?;

    state.compat.modern().delete_glossary(id).await?;
    info!(id, "Glossary deleted");

    encode(StatusCode::OK, &EmptyBody {})
}

// ==================== Probes ====================

pub async fn readiness(State(state): State<AppState>) -> Response {
    let ready = state.lifecycle.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessBody { ready })).into_response()
}

pub async fn liveness() -> Response {
    (StatusCode::OK, Json(EmptyBody {})).into_response()
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(EmptyBody {})).into_response()
}
