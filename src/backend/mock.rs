//! In-memory backends.
//!
//! Deterministic stand-ins for both generations, used by the test suites and
//! by `USE_MOCK_BACKENDS=true` runs that have no Google credentials.
//!
//! ```ignore
//! let legacy = MockLegacyBackend::new();
//! let t = legacy.translate("hello", &"fr".parse()?).await?;
//! assert_eq!(t.translated_text, "hello_fr");
//! ```

use crate::backend::{LegacyBackend, ModernBackend, ModernTranslateRequest};
use crate::error::{ErrorKind, GatewayError, GatewayResult};
use crate::model::{
    parse_language_tag, Detection, DetectionRaw, Glossary, LanguageTag, NewGlossary, Translation,
    TranslationWithGlossary,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const DEFAULT_DETECTED_LANGUAGE: &str = "en";
const DEFAULT_CONFIDENCE: f64 = 0.95;

fn default_detections() -> Vec<(String, f64)> {
    vec![(DEFAULT_DETECTED_LANGUAGE.to_string(), DEFAULT_CONFIDENCE)]
}

/// Legacy generation stand-in.
///
/// Translations append the target tag (`"hello"` -> `"hello_fr"`).
#[derive(Debug)]
pub struct MockLegacyBackend {
    detected_language: Option<String>,
    detections: Vec<(String, f64)>,
    failure: Option<GatewayError>,
    translate_calls: AtomicUsize,
    detect_calls: AtomicUsize,
}

impl Default for MockLegacyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLegacyBackend {
    pub fn new() -> Self {
        Self {
            detected_language: Some(DEFAULT_DETECTED_LANGUAGE.to_string()),
            detections: default_detections(),
            failure: None,
            translate_calls: AtomicUsize::new(0),
            detect_calls: AtomicUsize::new(0),
        }
    }

    /// Source language reported by translate; `None` reports nothing.
    pub fn with_detected_language(mut self, language: Option<&str>) -> Self {
        self.detected_language = language.map(str::to_string);
        self
    }

    /// Detections returned by detect, as `(code, confidence)` pairs.
    pub fn with_detections(mut self, detections: &[(&str, f64)]) -> Self {
        self.detections = detections
            .iter()
            .map(|(code, confidence)| (code.to_string(), *confidence))
            .collect();
        self
    }

    /// Every call fails with `error`.
    pub fn failing_with(mut self, error: GatewayError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> GatewayResult<()> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LegacyBackend for MockLegacyBackend {
    async fn translate(
        &self,
        text: &str,
        target_language: &LanguageTag,
    ) -> GatewayResult<Translation> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let detected_language = self
            .detected_language
            .as_deref()
            .map(|code| parse_language_tag("detected language", code))
            .transpose()?;

        Ok(Translation {
            translated_text: format!("{}_{}", text, target_language),
            original_text: text.to_string(),
            detected_language,
            target_language: target_language.clone(),
        })
    }

    async fn detect(&self, _text: &str) -> GatewayResult<Vec<Detection>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        if self.detections.is_empty() {
            return Err(GatewayError::new(
                ErrorKind::BackendEmptyDetection,
                "Mock legacy detect returned an empty detection list",
            ));
        }

        self.detections
            .iter()
            .map(|(code, confidence)| {
                parse_language_tag("detected language", code)
                    .map(|language| Detection::new(language, *confidence))
            })
            .collect()
    }

    fn backend_name(&self) -> &str {
        "Mock legacy backend"
    }
}

/// Modern generation stand-in with an in-memory glossary store.
///
/// Translations append the target code; when a known glossary is applied the
/// glossary text also carries its id (`"hello_fr_tech"`).
#[derive(Debug)]
pub struct MockModernBackend {
    detected_language: Option<String>,
    detections: Vec<DetectionRaw>,
    failure: Option<GatewayError>,
    list_failure_after: Option<usize>,
    glossaries: Mutex<BTreeMap<String, Glossary>>,
    translate_calls: AtomicUsize,
    detect_calls: AtomicUsize,
    glossary_calls: AtomicUsize,
}

impl Default for MockModernBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModernBackend {
    pub fn new() -> Self {
        Self {
            detected_language: Some(DEFAULT_DETECTED_LANGUAGE.to_string()),
            detections: default_detections()
                .into_iter()
                .map(|(language, confidence)| DetectionRaw { language, confidence })
                .collect(),
            failure: None,
            list_failure_after: None,
            glossaries: Mutex::new(BTreeMap::new()),
            translate_calls: AtomicUsize::new(0),
            detect_calls: AtomicUsize::new(0),
            glossary_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_detected_language(mut self, language: Option<&str>) -> Self {
        self.detected_language = language.map(str::to_string);
        self
    }

    pub fn with_detections(mut self, detections: &[(&str, f64)]) -> Self {
        self.detections = detections
            .iter()
            .map(|(language, confidence)| DetectionRaw {
                language: language.to_string(),
                confidence: *confidence,
            })
            .collect();
        self
    }

    /// Pre-populate the glossary store.
    pub fn with_glossaries(self, glossaries: &[(&str, &str)]) -> Self {
        {
            let mut store = self.store();
            for (id, source_uri) in glossaries {
                store.insert(
                    id.to_string(),
                    Glossary {
                        id: id.to_string(),
                        source_uri: source_uri.to_string(),
                    },
                );
            }
        }
        self
    }

    pub fn failing_with(mut self, error: GatewayError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Listings yield `count` glossaries, then fail.
    pub fn failing_list_after(mut self, count: usize) -> Self {
        self.list_failure_after = Some(count);
        self
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn glossary_calls(&self) -> usize {
        self.glossary_calls.load(Ordering::SeqCst)
    }

    /// Current store contents, ordered by id.
    pub fn glossary_ids(&self) -> Vec<String> {
        self.store().keys().cloned().collect()
    }

    fn store(&self) -> MutexGuard<'_, BTreeMap<String, Glossary>> {
        self.glossaries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(&self) -> GatewayResult<()> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModernBackend for MockModernBackend {
    async fn translate(
        &self,
        request: ModernTranslateRequest<'_>,
    ) -> GatewayResult<TranslationWithGlossary> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let translated_text = format!("{}_{}", request.text, request.target_language);

        let glossary_translated_text = match request.glossary_id {
            Some(id) if self.store().contains_key(id) => Some(format!("{}_{}", translated_text, id)),
            Some(id) => {
                return Err(GatewayError::backend_call(
                    "Mock modern translate",
                    format!("glossary {} not found", id),
                ))
            }
            None => None,
        };

        // An explicit source hint wins over detection
        let detected_language = match request.source_language {
            Some(_) => None,
            None => self.detected_language.clone(),
        };

        Ok(TranslationWithGlossary {
            translated_text,
            original_text: request.text.to_string(),
            detected_language,
            target_language: request.target_language.to_string(),
            glossary_translated_text,
        })
    }

    async fn detect(&self, _text: &str) -> GatewayResult<Vec<DetectionRaw>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        if self.detections.is_empty() {
            return Err(GatewayError::empty_result("Mock modern detect"));
        }

        Ok(self.detections.clone())
    }

    async fn create_glossary(&self, glossary: &NewGlossary) -> GatewayResult<()> {
        self.glossary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let mut store = self.store();
        if store.contains_key(&glossary.id) {
            return Err(GatewayError::backend_call(
                "Mock modern create glossary",
                format!("glossary {} already exists", glossary.id),
            ));
        }

        store.insert(
            glossary.id.clone(),
            Glossary {
                id: glossary.id.clone(),
                source_uri: glossary.source_uri.clone(),
            },
        );
        Ok(())
    }

    fn list_glossaries(&self) -> BoxStream<'_, GatewayResult<Glossary>> {
        self.glossary_calls.fetch_add(1, Ordering::SeqCst);

        if let Err(error) = self.check_failure() {
            return stream::once(async move { Err(error) }).boxed();
        }

        let mut items: Vec<GatewayResult<Glossary>> =
            self.store().values().cloned().map(Ok).collect();

        if let Some(count) = self.list_failure_after {
            items.truncate(count);
            items.push(Err(GatewayError::backend_call(
                "Mock modern list glossaries",
                "page fetch failed",
            )));
        }

        stream::iter(items).boxed()
    }

    async fn delete_glossary(&self, id: &str) -> GatewayResult<()> {
        self.glossary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        match self.store().remove(id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::backend_call(
                "Mock modern delete glossary",
                format!("glossary {} not found", id),
            )),
        }
    }

    fn backend_name(&self) -> &str {
        "Mock modern backend"
    }
}
