use std::io;
use std::process::Stdio;

use adaptive_tamil_core::Translator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ModelConfig;

/// `{model}` and `{target}` in the configured arguments are replaced with
/// `model.model_name` and `model.target_code`.
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.command_path.trim().is_empty() {
            return Err(anyhow!(
                "model.backend is command but model.command_path is empty"
            ));
        }
        let args = config
            .command_args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &config.model_name)
                    .replace("{target}", &config.target_code)
            })
            .collect();
        Ok(Self {
            program: config.command_path,
            args,
        })
    }

    async fn run_command(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to execute {}", self.program))?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut pipe) = stdin {
                pipe.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    pipe.write_all(b"\n").await?;
                }
            }
            Ok::<_, io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.with_context(|| format!("failed to wait for {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr
            ));
        }

        match fed {
            Err(error) if error.kind() != io::ErrorKind::BrokenPipe => {
                return Err(error).context("failed to write source text");
            }
            _ => {}
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("{} stdout is not UTF-8", self.program))?;
        Ok(stdout.trim().to_string())
    }
}

#[async_trait]
impl Translator for CommandTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let translated = self.run_command(text).await?;
        if translated.is_empty() {
            return Err(anyhow!("{} returned an empty translation", self.program));
        }
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: &str, args: &[&str]) -> ModelConfig {
        ModelConfig {
            command_path: path.to_string(),
            command_args: args.iter().map(|arg| arg.to_string()).collect(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn substitutes_placeholders() {
        let translator =
            CommandTranslator::new(config("nllb", &["--model", "{model}", "--tgt={target}"]))
                .unwrap();
        assert_eq!(
            translator.args,
            vec![
                "--model".to_string(),
                "facebook/nllb-200-distilled-600M".to_string(),
                "--tgt=tam_Taml".to_string(),
            ]
        );
    }

    #[test]
    fn requires_a_program() {
        assert!(CommandTranslator::new(config("", &[])).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_translation_from_stdout() {
        let translator = CommandTranslator::new(config("cat", &[])).unwrap();
        assert_eq!(translator.translate("வணக்கம்").await.unwrap(), "வணக்கம்");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_failing_program() {
        let translator = CommandTranslator::new(config("false", &[])).unwrap();
        assert!(translator.translate("Hello").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_large_input_through_the_program() {
        let translator = CommandTranslator::new(config("cat", &[])).unwrap();
        let input = "அ".repeat(256 * 1024);
        let translated = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            translator.translate(&input),
        )
        .await
        .expect("command backend stalled on large input")
        .unwrap();
        assert_eq!(translated, input);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_wins_over_closed_stdin() {
        let translator = CommandTranslator::new(config(
            "sh",
            &["-c", "echo model missing >&2; exit 3"],
        ))
        .unwrap();
        let error = translator
            .translate(&"a".repeat(512 * 1024))
            .await
            .unwrap_err();
        let message = format!("{error:#}");
        assert!(message.contains("model missing"), "{message}");
    }

    #[tokio::test]
    async fn reports_missing_program() {
        let translator =
            CommandTranslator::new(config("/nonexistent/translate-bin", &[])).unwrap();
        let error = translator.translate("Hello").await.unwrap_err();
        assert!(format!("{error:#}").contains("failed to execute"));
    }
}
