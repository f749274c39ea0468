//! One translate/detect surface over both backend generations.
//!
//! Callers pick the generation per request. The legacy path is a straight
//! delegation. The modern path re-projects the modern backend's plain-string
//! language codes into [`LanguageTag`]s, so both paths end in the same
//! [`Translation`] / [`Detection`] records.

use crate::backend::{LegacyBackend, ModernBackend, ModernTranslateRequest};
use crate::error::GatewayResult;
use crate::model::{parse_language_tag, Detection, LanguageTag, Translation};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct CompatibilityWrapper {
    legacy: Arc<dyn LegacyBackend>,
    modern: Arc<dyn ModernBackend>,
}

impl CompatibilityWrapper {
    pub fn new(legacy: Arc<dyn LegacyBackend>, modern: Arc<dyn ModernBackend>) -> Self {
        Self { legacy, modern }
    }

    pub fn modern(&self) -> &Arc<dyn ModernBackend> {
        &self.modern
    }

    /// Translate through the legacy backend, or through the modern one when
    /// `use_modern` is set. The legacy path never touches the modern backend.
    ///
    /// On the modern path a language code that is not a valid tag fails with
    /// `LanguageTagConversionFailed`. An unreported source language stays
    /// `None`.
    pub async fn translate_selectable(
        &self,
        text: &str,
        target_language: &LanguageTag,
        use_modern: bool,
    ) -> GatewayResult<Translation> {
        if !use_modern {
            debug!(backend = self.legacy.backend_name(), "translate");
            return self.legacy.translate(text, target_language).await;
        }

        debug!(backend = self.modern.backend_name(), "translate");

        let target = target_language.to_string();
        let translation = self
            .modern
            .translate(ModernTranslateRequest::new(text, &target))
            .await?;

        let detected_language = match translation.detected_language.as_deref() {
            None | Some("") => None,
            Some(code) => Some(parse_language_tag("detected language", code)?),
        };
        let target_language = parse_language_tag("target language", &translation.target_language)?;

        Ok(Translation {
            translated_text: translation.translated_text,
            original_text: translation.original_text,
            detected_language,
            target_language,
        })
    }

    /// Detect through either generation.
    ///
    /// On the modern path every reported language must parse as a tag; the
    /// first one that does not fails the whole call and no partial list is
    /// returned. Reliability is derived from
    /// [`RELIABILITY_THRESHOLD`](crate::model::RELIABILITY_THRESHOLD).
    pub async fn detect_selectable(
        &self,
        text: &str,
        use_modern: bool,
    ) -> GatewayResult<Vec<Detection>> {
        if !use_modern {
            debug!(backend = self.legacy.backend_name(), "detect");
            return self.legacy.detect(text).await;
        }

        debug!(backend = self.modern.backend_name(), "detect");

        self.modern
            .detect(text)
            .await?
            .into_iter()
            .map(|raw| {
                parse_language_tag("detected language", &raw.language)
                    .map(|language| Detection::new(language, raw.confidence))
            })
            .collect()
    }
}

impl std::fmt::Debug for CompatibilityWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityWrapper")
            .field("legacy", &self.legacy.backend_name())
            .field("modern", &self.modern.backend_name())
            .finish()
    }
}
