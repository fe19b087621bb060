use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use adaptive_tamil_core::{Script, ScriptGuard, SimplificationRule, Simplifier};
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub simplify: SimplifyConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl DaemonConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => resolve_config_path(),
        };
        if explicit.is_some() || config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config file {}", config_path.display()))?;
            return Self::parse(&raw)
                .with_context(|| format!("failed to parse TOML from {}", config_path.display()));
        }

        Ok(DaemonConfig::default())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("ADAPTIVE_TAMIL_CONFIG") {
        return Path::new(&path).to_path_buf();
    }

    if let Some(base) = dirs::config_dir() {
        return base.join("adaptive-tamil").join("config.toml");
    }

    Path::new("/tmp/adaptive-tamil.toml").to_path_buf()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

fn default_socket_path() -> PathBuf {
    Path::new("/tmp/adaptive-tamil.sock").to_path_buf()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_backend")]
    pub backend: ModelBackend,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_target_code")]
    pub target_code: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,
    #[serde(default)]
    pub ollama_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub command_path: String,
    #[serde(default)]
    pub command_args: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            target_language: default_target_language(),
            target_code: default_target_code(),
            model_name: default_model_name(),
            max_input_chars: default_max_input_chars(),
            ollama_host: default_ollama_host(),
            ollama_model: String::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            command_path: String::new(),
            command_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    Glossary,
    Ollama,
    Command,
}

fn default_backend() -> ModelBackend {
    ModelBackend::Glossary
}

fn default_target_language() -> String {
    "Tamil".to_string()
}

fn default_target_code() -> String {
    "tam_Taml".to_string()
}

fn default_model_name() -> String {
    "facebook/nllb-200-distilled-600M".to_string()
}

fn default_max_input_chars() -> usize {
    2000
}

fn default_ollama_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.9
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Upper bound for one backend call; 0 waits indefinitely.
    #[serde(default)]
    pub timeout_ms: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            timeout_ms: 0,
        }
    }
}

fn default_cache_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_expected_script")]
    pub expected_script: Script,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enable: false,
            expected_script: default_expected_script(),
        }
    }
}

impl GuardConfig {
    pub fn script_guard(&self) -> ScriptGuard {
        if self.enable {
            ScriptGuard::expecting(self.expected_script)
        } else {
            ScriptGuard::disabled()
        }
    }
}

fn default_expected_script() -> Script {
    Script::Latin
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifyConfig {
    #[serde(default = "default_use_default_rules")]
    pub use_default_rules: bool,
    #[serde(default)]
    pub rules: Vec<SimplificationRule>,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            use_default_rules: default_use_default_rules(),
            rules: Vec::new(),
        }
    }
}

impl SimplifyConfig {
    pub fn build(&self) -> Result<Simplifier> {
        let mut rules = if self.use_default_rules {
            Simplifier::default_rules()
        } else {
            Vec::new()
        };
        rules.extend(self.rules.iter().cloned());
        Simplifier::new(rules).context("invalid [simplify] rules")
    }
}

fn default_use_default_rules() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_feedback_path")]
    pub path: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: default_feedback_path(),
        }
    }
}

fn default_feedback_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(base) => base.join("adaptive-tamil").join("feedback.csv"),
        None => PathBuf::from("feedback.csv"),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_espeak_path")]
    pub espeak_path: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: u32,
    #[serde(default = "default_typst_path")]
    pub typst_path: String,
    #[serde(default = "default_fonts")]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            espeak_path: default_espeak_path(),
            voice: default_voice(),
            speech_rate: default_speech_rate(),
            typst_path: default_typst_path(),
            fonts: default_fonts(),
            font_path: None,
            scratch_dir: None,
        }
    }
}

fn default_espeak_path() -> String {
    "espeak-ng".to_string()
}

fn default_voice() -> String {
    "ta".to_string()
}

fn default_speech_rate() -> u32 {
    150
}

fn default_typst_path() -> String {
    "typst".to_string()
}

fn default_fonts() -> Vec<String> {
    vec![
        "Noto Sans Tamil".to_string(),
        "Latha".to_string(),
        "Lohit Tamil".to_string(),
    ]
}
