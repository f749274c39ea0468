//! Canonical records returned by the backends, whichever generation served
//! the call. All of them are plain values built per request.

use crate::error::{GatewayError, GatewayResult};
use icu_locale::Locale;

/// Structured language identifier (BCP-47). Displays in canonical casing,
/// e.g. `zh-hant-tw` parses and prints as `zh-Hant-TW`.
pub type LanguageTag = Locale;

/// Detections strictly above this confidence are reliable. Applied to both
/// generations, since only the legacy one reports a flag of its own.
pub const RELIABILITY_THRESHOLD: f64 = 0.8;

pub fn is_reliable(confidence: f64) -> bool {
    confidence > RELIABILITY_THRESHOLD
}

/// Parse a backend-supplied language code. `what` names the value in the
/// error message ("detected language", "target language", ...).
pub fn parse_language_tag(what: &str, raw: &str) -> GatewayResult<LanguageTag> {
    raw.replace('_', "-")
        .parse::<Locale>()
        .map_err(|e| GatewayError::tag_conversion(what, raw, format!("{:?}", e)))
}

/// A translation expressed with structured language tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub translated_text: String,
    pub original_text: String,
    /// `None` only when the backend did not report a source language
    pub detected_language: Option<LanguageTag>,
    pub target_language: LanguageTag,
}

/// A translation as reported by the modern backend: language codes are the
/// backend's own strings, plus the glossary-matched text when one applied.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationWithGlossary {
    pub translated_text: String,
    pub original_text: String,
    pub detected_language: Option<String>,
    pub target_language: String,
    pub glossary_translated_text: Option<String>,
}

/// A detected language with reliability derived from [`RELIABILITY_THRESHOLD`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    language: LanguageTag,
    confidence: f64,
    is_reliable: bool,
}

impl Detection {
    /// Confidence is clamped into `[0.0, 1.0]`; NaN counts as `0.0`.
    pub fn new(language: LanguageTag, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            language,
            confidence,
            is_reliable: is_reliable(confidence),
        }
    }

    pub fn language(&self) -> &LanguageTag {
        &self.language
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_reliable(&self) -> bool {
        self.is_reliable
    }
}

/// A detection exactly as the modern backend reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRaw {
    pub language: String,
    pub confidence: f64,
}

/// A stored glossary and the storage location it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glossary {
    pub id: String,
    pub source_uri: String,
}

/// Everything needed to build a glossary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGlossary {
    pub id: String,
    pub source_uri: String,
    pub source_language: String,
    pub target_language: String,
}
