mod command;
mod glossary;
mod ollama;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use adaptive_tamil_core::Translator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
pub use glossary::GlossaryTranslator;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::config::{ModelBackend, ModelConfig, TranslateConfig};

#[derive(Debug)]
struct TranslationCache {
    capacity: usize,
    map: HashMap<String, String>,
    order: VecDeque<String>,
}

impl TranslationCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }
        if self.map.contains_key(&key) {
            self.map.insert(key, value);
            return;
        }
        if self.map.len() == self.capacity {
            if let Some(front) = self.order.pop_front() {
                self.map.remove(&front);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
    }
}

pub struct TranslatorRouter {
    model: ModelConfig,
    engine: OnceCell<Arc<dyn Translator>>,
    call_timeout: Option<Duration>,
    cache: RwLock<TranslationCache>,
}

impl TranslatorRouter {
    pub fn new(model: ModelConfig, translate: TranslateConfig) -> Self {
        Self::with_cell(model, translate, OnceCell::new())
    }

    pub fn with_engine(
        engine: Arc<dyn Translator>,
        model: ModelConfig,
        translate: TranslateConfig,
    ) -> Self {
        Self::with_cell(model, translate, OnceCell::from(engine))
    }

    fn with_cell(
        model: ModelConfig,
        translate: TranslateConfig,
        engine: OnceCell<Arc<dyn Translator>>,
    ) -> Self {
        let call_timeout =
            (translate.timeout_ms > 0).then(|| Duration::from_millis(translate.timeout_ms));
        Self {
            model,
            engine,
            call_timeout,
            cache: RwLock::new(TranslationCache::new(translate.cache_capacity)),
        }
    }

    async fn engine(&self) -> Result<&Arc<dyn Translator>> {
        self.engine
            .get_or_try_init(|| async {
                let started = Instant::now();
                let engine = build_engine(&self.model)?;
                info!(
                    backend = ?self.model.backend,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "translation backend ready"
                );
                Ok::<_, anyhow::Error>(engine)
            })
            .await
    }
}

fn build_engine(model: &ModelConfig) -> Result<Arc<dyn Translator>> {
    let engine: Arc<dyn Translator> = match model.backend {
        ModelBackend::Glossary => Arc::new(GlossaryTranslator::new()),
        ModelBackend::Ollama => Arc::new(
            ollama::OllamaTranslator::new(model.clone())
                .context("failed to init ollama backend")?,
        ),
        ModelBackend::Command => Arc::new(
            command::CommandTranslator::new(model.clone())
                .context("failed to init command backend")?,
        ),
    };
    Ok(engine)
}

/// Cuts `text` to at most `max_chars` characters; 0 disables the limit.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[async_trait]
impl Translator for TranslatorRouter {
    async fn translate(&self, text: &str) -> Result<String> {
        let input = truncate_chars(text, self.model.max_input_chars);
        if input.len() < text.len() {
            warn!(
                max_input_chars = self.model.max_input_chars,
                dropped_chars = text[input.len()..].chars().count(),
                "input truncated before translation"
            );
        }

        if let Some(cached) = self.cache.read().await.get(input) {
            return Ok(cached);
        }

        let engine = self.engine().await?;
        let started = Instant::now();
        let output = match self.call_timeout {
            Some(limit) => timeout(limit, engine.translate(input))
                .await
                .map_err(|_| anyhow!("translation exceeded {}ms", limit.as_millis()))??,
            None => engine.translate(input).await?,
        };
        let output = output.trim().to_string();
        if output.is_empty() {
            return Err(anyhow!("translation backend returned empty text"));
        }

        info!(
            backend = ?self.model.backend,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "translated input"
        );
        self.cache
            .write()
            .await
            .insert(input.to_string(), output.clone());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        async fn translate(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<{text}>"))
        }
    }

    struct SlowTranslator;

    #[async_trait]
    impl Translator for SlowTranslator {
        async fn translate(&self, _text: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("வணக்கம்", 3), "வணக");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 0), "hello");
    }

    #[test]
    fn cache_evicts_oldest_entry() {
        let mut cache = TranslationCache::new(2);
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());
        cache.insert("c".to_string(), "3".to_string());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b").as_deref(), Some("2"));
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn memoises_repeated_inputs() {
        let engine = Arc::new(CountingTranslator {
            calls: AtomicUsize::new(0),
        });
        let router = TranslatorRouter::with_engine(
            engine.clone(),
            ModelConfig::default(),
            TranslateConfig::default(),
        );

        assert_eq!(router.translate("Hello").await.unwrap(), "<Hello>");
        assert_eq!(router.translate("Hello").await.unwrap(), "<Hello>");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn truncates_long_input() {
        let model = ModelConfig {
            max_input_chars: 4,
            ..ModelConfig::default()
        };
        let router = TranslatorRouter::with_engine(
            Arc::new(CountingTranslator {
                calls: AtomicUsize::new(0),
            }),
            model,
            TranslateConfig::default(),
        );
        assert_eq!(router.translate("abcdefgh").await.unwrap(), "<abcd>");
    }

    #[tokio::test]
    async fn enforces_configured_timeout() {
        let router = TranslatorRouter::with_engine(
            Arc::new(SlowTranslator),
            ModelConfig::default(),
            TranslateConfig {
                cache_capacity: 0,
                timeout_ms: 20,
            },
        );
        let error = router.translate("Hello").await.unwrap_err();
        assert!(error.to_string().contains("exceeded 20ms"));
    }

    #[tokio::test]
    async fn builds_glossary_backend_lazily() {
        let router = TranslatorRouter::new(ModelConfig::default(), TranslateConfig::default());
        assert!(router.engine.get().is_none());
        let output = router.translate("Hello").await.unwrap();
        assert_eq!(output, "வணக்கம்");
        assert!(router.engine.get().is_some());
    }

    #[tokio::test]
    async fn misconfigured_backend_fails_every_request() {
        let model = ModelConfig {
            backend: ModelBackend::Ollama,
            ..ModelConfig::default()
        };
        let router = TranslatorRouter::new(model, TranslateConfig::default());
        assert!(router.translate("Hello").await.is_err());
        assert!(router.translate("Hello").await.is_err());
        assert!(router.engine.get().is_none());
    }
}
