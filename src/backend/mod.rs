//! Upstream translation backends.
//!
//! Two generations of the translation API sit behind two traits so the
//! compatibility layer and the routes never depend on a concrete client:
//!
//! - [`LegacyBackend`]: plain translate/detect with structured tags
//! - [`ModernBackend`]: source hints, glossaries and raw detection output
//!
//! `legacy` and `modern` talk to Google Translate v2 and v3 over REST;
//! `mock` keeps everything in memory for tests and credential-free runs.
//!
//! Adapters never retry. Every failure comes back as a
//! [`GatewayError`](crate::error::GatewayError) with kind and context.

pub mod legacy;
pub mod mock;
pub mod modern;

use crate::error::{GatewayError, GatewayResult};
use crate::model::{
    Detection, DetectionRaw, Glossary, LanguageTag, NewGlossary, Translation,
    TranslationWithGlossary,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;

pub use legacy::GoogleTranslateV2;
pub use mock::{MockLegacyBackend, MockModernBackend};
pub use modern::GoogleTranslateV3;

/// Parameters of a modern translate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModernTranslateRequest<'a> {
    pub text: &'a str,
    pub target_language: &'a str,
    /// Explicit source hint; the backend detects when `None`
    pub source_language: Option<&'a str>,
    /// Glossary to apply; none applied when `None`
    pub glossary_id: Option<&'a str>,
}

impl<'a> ModernTranslateRequest<'a> {
    pub fn new(text: &'a str, target_language: &'a str) -> Self {
        Self {
            text,
            target_language,
            source_language: None,
            glossary_id: None,
        }
    }

    pub fn with_source_language(mut self, source_language: Option<&'a str>) -> Self {
        self.source_language = source_language;
        self
    }

    pub fn with_glossary(mut self, glossary_id: Option<&'a str>) -> Self {
        self.glossary_id = glossary_id;
        self
    }
}

#[async_trait]
pub trait LegacyBackend: Send + Sync {
    /// Translate `text` into `target_language`.
    ///
    /// Fails with `BackendCallFailed` when the call errors and
    /// `BackendEmptyResult` when it succeeds without any translation.
    async fn translate(&self, text: &str, target_language: &LanguageTag)
        -> GatewayResult<Translation>;

    /// Detect the language of `text`.
    ///
    /// Adds `BackendEmptyDetection` for an envelope whose inner list is empty.
    async fn detect(&self, text: &str) -> GatewayResult<Vec<Detection>>;

    /// Used in logs.
    fn backend_name(&self) -> &str;
}

#[async_trait]
pub trait ModernBackend: Send + Sync {
    async fn translate(
        &self,
        request: ModernTranslateRequest<'_>,
    ) -> GatewayResult<TranslationWithGlossary>;

    /// Detections as reported, without derived reliability.
    async fn detect(&self, text: &str) -> GatewayResult<Vec<DetectionRaw>>;

    async fn create_glossary(&self, glossary: &NewGlossary) -> GatewayResult<()>;

    /// A fresh, finite listing. Each call starts a new upstream listing;
    /// a failed page ends the stream with that error.
    fn list_glossaries(&self) -> BoxStream<'_, GatewayResult<Glossary>>;

    async fn delete_glossary(&self, id: &str) -> GatewayResult<()>;

    fn backend_name(&self) -> &str;
}

/// Drain a glossary listing. A failure anywhere discards what was already
/// produced; there is no partial result.
pub async fn collect_glossaries(
    backend: &dyn ModernBackend,
) -> Result<Vec<Glossary>, GatewayError> {
    backend.list_glossaries().try_collect().await
}
