use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::feedback::{FeedbackError, FeedbackLabel, FeedbackRecord, FeedbackSink};
use crate::script::{Script, ScriptGuard};
use crate::simplify::Simplifier;
use crate::translator::Translator;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    raw_input: Option<String>,
    current_text: Option<String>,
    effort_score: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_input(&self) -> Option<&str> {
        self.raw_input.as_deref()
    }

    pub fn current_text(&self) -> Option<&str> {
        self.current_text.as_deref()
    }

    pub fn effort_score(&self) -> u64 {
        self.effort_score
    }

    pub fn has_translation(&self) -> bool {
        self.current_text.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("please enter text")]
    EmptyInput,
    #[error("input looks like {detected:?} text but {expected:?} was expected")]
    WrongLanguage { expected: Script, detected: Script },
    #[error("nothing has been translated yet")]
    NoTranslation,
    #[error("translation failed: {0:#}")]
    TranslationFailure(anyhow::Error),
    #[error("could not record feedback: {0}")]
    PersistenceFailure(#[from] FeedbackError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyOutcome {
    pub changed: bool,
    pub effort_score: u64,
}

pub struct SessionController {
    translator: Arc<dyn Translator>,
    simplifier: Arc<Simplifier>,
    guard: ScriptGuard,
    feedback: Arc<FeedbackSink>,
}

impl SessionController {
    pub fn new(
        translator: Arc<dyn Translator>,
        simplifier: Arc<Simplifier>,
        guard: ScriptGuard,
        feedback: Arc<FeedbackSink>,
    ) -> Self {
        Self {
            translator,
            simplifier,
            guard,
            feedback,
        }
    }

    pub fn feedback_sink(&self) -> &FeedbackSink {
        &self.feedback
    }

    /// On any error the session is left exactly as it was.
    pub async fn on_translate_requested(
        &self,
        session: &mut Session,
        raw_input: &str,
    ) -> Result<(), SessionError> {
        if raw_input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if let Some((expected, detected)) = self.guard.mismatch(raw_input) {
            warn!(?expected, ?detected, "rejecting input in unexpected script");
            return Err(SessionError::WrongLanguage { expected, detected });
        }

        let translated = self
            .translator
            .translate(raw_input)
            .await
            .map_err(SessionError::TranslationFailure)?;

        info!(
            input_chars = raw_input.chars().count(),
            output_chars = translated.chars().count(),
            "translation ready"
        );
        session.raw_input = Some(raw_input.to_string());
        session.current_text = Some(translated);
        session.effort_score = 0;
        Ok(())
    }

    pub fn on_simplify_requested(
        &self,
        session: &mut Session,
    ) -> Result<SimplifyOutcome, SessionError> {
        let current = session
            .current_text
            .as_deref()
            .ok_or(SessionError::NoTranslation)?;

        let simplified = self.simplifier.simplify(current);
        let changed = simplified != current;
        session.current_text = Some(simplified);
        session.effort_score = session.effort_score.saturating_add(1);

        debug!(changed, effort_score = session.effort_score, "simplify pass");
        Ok(SimplifyOutcome {
            changed,
            effort_score: session.effort_score,
        })
    }

    pub async fn on_feedback_requested(
        &self,
        session: &Session,
        label: FeedbackLabel,
    ) -> Result<FeedbackRecord, SessionError> {
        if !session.has_translation() {
            return Err(SessionError::NoTranslation);
        }
        let record = FeedbackRecord {
            input_text: session.raw_input.clone().unwrap_or_default(),
            label,
            effort_score: session.effort_score,
        };

        self.feedback.append(&record).await?;
        info!(
            label = label.as_str(),
            effort_score = record.effort_score,
            "feedback recorded"
        );
        Ok(record)
    }
}
