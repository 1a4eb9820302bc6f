//! View state controller.
//!
//! Owns every piece of mutable application state and is the only writer of
//! it. The presentation layer reads [`ViewState`] snapshots and drives the
//! controller through [`Controller::generate`] and [`Controller::translate`].
//!
//! State lives behind a mutex that is never held across an `.await`, so each
//! state transition is atomic and requests only interleave at the point where
//! they wait on the [`ScriptGenerator`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::genai::{GenError, ScriptGenerator};
use crate::script::{Language, Script};

/// Validation message shown when generate is requested with a blank topic.
pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic for your script.";

/// Message shown for any generation failure. The cause is only logged.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate script. The AI might be having a moment. Please try again.";

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub topic: String,
    pub language: Language,
    /// Language `current_script` was generated in.
    pub script_language: Option<Language>,
    pub current_script: Option<Script>,
    /// Translations of `current_script`, keyed by target language.
    pub translations: HashMap<Language, Script>,
    pub pending_generate: bool,
    pub pending_translate: HashMap<Language, bool>,
    pub last_error: Option<String>,
}

impl ViewState {
    /// Fresh session state with `language` preselected.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    pub fn is_translating(&self, language: Language) -> bool {
        self.pending_translate.get(&language).copied().unwrap_or(false)
    }

    /// True while any request is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending_generate || self.pending_translate.values().any(|p| *p)
    }
}

/// User-facing failures. `Display` is exactly what ends up in `last_error`.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{}", EMPTY_TOPIC_MESSAGE)]
    Validation,

    #[error("{}", GENERATION_FAILED_MESSAGE)]
    Generation(#[source] GenError),

    #[error("Failed to translate to {language}. Please try again.")]
    Translation {
        language: Language,
        #[source]
        source: GenError,
    },
}

/// How a controller operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was written to state.
    Completed,
    /// The client failed and `last_error` was written.
    Failed,
    /// Input was rejected before any request was made.
    Rejected,
    /// Nothing to do (no script yet, or already in the target language).
    Skipped,
    /// A newer request for the same key resolved the state; this response was dropped.
    Superseded,
}

/// Per-key request bookkeeping, kept beside the view state.
#[derive(Debug, Default)]
struct Sequencer {
    generate_seq: u64,
    translate_seq: HashMap<Language, u64>,
}

impl Sequencer {
    /// Orphan every in-flight translation; their responses will no longer
    /// match the latest sequence number for their target.
    fn orphan_translations(&mut self) {
        for counter in self.translate_seq.values_mut() {
            *counter += 1;
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    view: ViewState,
    seq: Sequencer,
}

/// The view state controller.
pub struct Controller {
    generator: Arc<dyn ScriptGenerator>,
    inner: Mutex<Inner>,
}

impl Controller {
    pub fn new(generator: Arc<dyn ScriptGenerator>, language: Language) -> Self {
        Self {
            generator,
            inner: Mutex::new(Inner {
                view: ViewState::new(language),
                seq: Sequencer::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every transition completes under one guard, so poisoned state is still whole.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current state for rendering.
    pub fn state(&self) -> ViewState {
        self.lock().view.clone()
    }

    pub fn set_topic(&self, topic: impl Into<String>) {
        self.lock().view.topic = topic.into();
    }

    pub fn set_language(&self, language: Language) {
        self.lock().view.language = language;
    }

    /// Generate a new script from the current topic and language.
    ///
    /// A blank topic sets the validation message without contacting the
    /// generator. Otherwise the previous script and all its translations are
    /// dropped before the request is made.
    pub async fn generate(&self) -> Outcome {
        let (topic, language, seq) = {
            let mut inner = self.lock();
            let Inner { view, seq } = &mut *inner;

            if view.topic.trim().is_empty() {
                view.last_error = Some(ControllerError::Validation.to_string());
                return Outcome::Rejected;
            }

            view.last_error = None;
            view.current_script = None;
            view.script_language = None;
            view.translations.clear();
            view.pending_translate.clear();
            view.pending_generate = true;

            seq.generate_seq += 1;
            seq.orphan_translations();
            (view.topic.clone(), view.language, seq.generate_seq)
        };

        log::debug!("generate #{} started ({}, {:?})", seq, language, topic);
        let result = self.generator.generate(&topic, language).await;

        let mut inner = self.lock();
        let Inner { view, seq: sequencer } = &mut *inner;

        if sequencer.generate_seq != seq {
            log::debug!(
                "generate #{} superseded by #{}, dropping response",
                seq,
                sequencer.generate_seq
            );
            return Outcome::Superseded;
        }

        view.pending_generate = false;
        match result {
            Ok(script) => {
                view.current_script = Some(script);
                view.script_language = Some(language);
                view.translations.clear();
                Outcome::Completed
            }
            Err(e) => {
                let error = ControllerError::Generation(e);
                log::error!("Script generation failed: {:?}", error);
                view.last_error = Some(error.to_string());
                Outcome::Failed
            }
        }
    }

    /// Translate the current script into `target`.
    ///
    /// Requests for different targets run independently; each owns its own
    /// pending flag and cache slot.
    pub async fn translate(&self, target: Language) -> Outcome {
        let (script, seq) = {
            let mut inner = self.lock();
            let Inner { view, seq } = &mut *inner;

            let Some(script) = view.current_script.clone() else {
                return Outcome::Skipped;
            };
            if view.script_language == Some(target) {
                log::debug!("script is already in {}, nothing to translate", target);
                return Outcome::Skipped;
            }

            view.last_error = None;
            view.pending_translate.insert(target, true);

            let counter = seq.translate_seq.entry(target).or_insert(0);
            *counter += 1;
            (script, *counter)
        };

        log::debug!("translate #{} into {} started", seq, target);
        let result = self.generator.translate(&script, target).await;

        let mut inner = self.lock();
        let Inner { view, seq: sequencer } = &mut *inner;

        if sequencer.translate_seq.get(&target).copied() != Some(seq) {
            log::debug!("translate #{} into {} superseded, dropping response", seq, target);
            return Outcome::Superseded;
        }

        view.pending_translate.insert(target, false);

        match result {
            Ok(translated) => {
                view.translations.insert(target, translated);
                Outcome::Completed
            }
            Err(e) => {
                let error = ControllerError::Translation {
                    language: target,
                    source: e,
                };
                log::error!("Translation failed: {:?}", error);
                view.last_error = Some(error.to_string());
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Dialogue;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl ScriptGenerator for EchoGenerator {
        async fn generate(&self, topic: &str, language: Language) -> Result<Script, GenError> {
            Ok(Script {
                title: format!("{} ({})", topic, language),
                characters: "A, B".to_string(),
                scene_setup: "Somewhere.".to_string(),
                dialogue: vec![Dialogue {
                    character: "A".to_string(),
                    line: "Hello".to_string(),
                }],
                punchline: "Bye".to_string(),
            })
        }

        async fn translate(&self, script: &Script, target: Language) -> Result<Script, GenError> {
            Ok(Script {
                title: format!("{} -> {}", script.title, target),
                ..script.clone()
            })
        }
    }

    fn controller() -> Controller {
        Controller::new(Arc::new(EchoGenerator), Language::Hinglish)
    }

    #[test]
    fn test_initial_state() {
        let state = controller().state();
        assert_eq!(state.language, Language::Hinglish);
        assert!(state.topic.is_empty());
        assert!(state.current_script.is_none());
        assert!(state.translations.is_empty());
        assert!(!state.is_busy());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_controller_error_messages() {
        assert_eq!(
            ControllerError::Validation.to_string(),
            "Please enter a topic for your script."
        );
        assert_eq!(
            ControllerError::Generation(GenError::EmptyTopic).to_string(),
            GENERATION_FAILED_MESSAGE
        );
        assert_eq!(
            ControllerError::Translation {
                language: Language::Bangla,
                source: GenError::EmptyTopic
            }
            .to_string(),
            "Failed to translate to Bangla. Please try again."
        );
    }

    #[test]
    fn test_generation_error_keeps_cause_as_source() {
        use std::error::Error;
        let error = ControllerError::Generation(GenError::ApiError("quota".to_string()));
        assert_eq!(error.source().unwrap().to_string(), "API error: quota");
    }

    #[tokio::test]
    async fn test_generate_then_translate() {
        let controller = controller();
        controller.set_topic("a cat who orders pizza");

        assert_eq!(controller.generate().await, Outcome::Completed);
        let state = controller.state();
        assert_eq!(
            state.current_script.as_ref().unwrap().title,
            "a cat who orders pizza (Hinglish)"
        );
        assert_eq!(state.script_language, Some(Language::Hinglish));

        assert_eq!(controller.translate(Language::Hindi).await, Outcome::Completed);
        let state = controller.state();
        assert_eq!(
            state.translations[&Language::Hindi].title,
            "a cat who orders pizza (Hinglish) -> Hindi"
        );
        assert!(!state.is_translating(Language::Hindi));
    }

    #[tokio::test]
    async fn test_translate_into_script_language_is_skipped() {
        let controller = controller();
        controller.set_topic("traffic");
        controller.generate().await;

        assert_eq!(controller.translate(Language::Hinglish).await, Outcome::Skipped);
        assert!(controller.state().translations.is_empty());
    }

    #[tokio::test]
    async fn test_set_language_applies_to_next_generate() {
        let controller = controller();
        controller.set_topic("monsoon");
        controller.set_language(Language::Bangla);
        controller.generate().await;

        let state = controller.state();
        assert_eq!(state.script_language, Some(Language::Bangla));
        assert!(state.current_script.unwrap().title.ends_with("(Bangla)"));
    }
}
