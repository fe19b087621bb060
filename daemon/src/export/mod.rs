mod audio;
mod document;

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

pub use audio::AudioExporter;
pub use document::DocumentExporter;

use crate::config::ExportConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Audio,
    Document,
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub handle: Uuid,
    pub kind: ArtifactKind,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("there is no text to export")]
    EmptyText,
    #[error("{program} not found; install it or set export.{setting}")]
    ToolNotFound {
        program: String,
        setting: &'static str,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("renderer produced an invalid file: {0}")]
    InvalidOutput(String),
    #[error("invalid WAV output: {0}")]
    Wav(#[from] hound::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ArtifactExporter: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    async fn export(&self, text: &str) -> Result<Artifact, ExportError>;
}

pub struct Exporters {
    audio: Arc<dyn ArtifactExporter>,
    document: Arc<dyn ArtifactExporter>,
}

impl Exporters {
    pub fn new(audio: Arc<dyn ArtifactExporter>, document: Arc<dyn ArtifactExporter>) -> Self {
        debug_assert_eq!(audio.kind(), ArtifactKind::Audio);
        debug_assert_eq!(document.kind(), ArtifactKind::Document);
        Self { audio, document }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            Arc::new(AudioExporter::new(config.clone())),
            Arc::new(DocumentExporter::new(config.clone())),
        )
    }

    fn exporter(&self, kind: ArtifactKind) -> &Arc<dyn ArtifactExporter> {
        match kind {
            ArtifactKind::Audio => &self.audio,
            ArtifactKind::Document => &self.document,
        }
    }

    pub async fn export(
        &self,
        text: &str,
        kinds: &[ArtifactKind],
    ) -> Vec<(ArtifactKind, Result<Artifact, ExportError>)> {
        let mut unique: Vec<ArtifactKind> = Vec::new();
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        let jobs = unique.into_iter().map(|kind| async move {
            let result = self.exporter(kind).export(text).await;
            match &result {
                Ok(artifact) => info!(
                    ?kind,
                    handle = %artifact.handle,
                    size = artifact.bytes.len(),
                    "artifact exported"
                ),
                Err(error) => warn!(?kind, "artifact export failed: {error}"),
            }
            (kind, result)
        });
        join_all(jobs).await
    }
}

pub(crate) fn scratch_space(base: Option<&Path>) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("adaptive-tamil-");
    match base {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempdir_in(dir)
        }
        None => builder.tempdir(),
    }
}

pub(crate) async fn run_tool(
    program: &str,
    setting: &'static str,
    args: &[OsString],
    stdin: Option<&str>,
) -> Result<(), ExportError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                ExportError::ToolNotFound {
                    program: program.to_string(),
                    setting,
                }
            } else {
                ExportError::Io(error)
            }
        })?;

    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(input.as_bytes()).await?;
            if !input.ends_with('\n') {
                pipe.write_all(b"\n").await?;
            }
        }
        Ok::<_, io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    if !output.status.success() {
        return Err(ExportError::ToolFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    match fed {
        Err(error) if error.kind() != io::ErrorKind::BrokenPipe => Err(error.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) fn tool_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FixedExporter {
        kind: ArtifactKind,
    }

    #[async_trait]
    impl ArtifactExporter for FixedExporter {
        fn kind(&self) -> ArtifactKind {
            self.kind
        }

        async fn export(&self, text: &str) -> Result<Artifact, ExportError> {
            Ok(Artifact {
                handle: Uuid::new_v4(),
                kind: self.kind,
                file_name: "fixed.bin".to_string(),
                mime_type: "application/octet-stream".to_string(),
                bytes: text.as_bytes().to_vec(),
                duration_secs: None,
            })
        }
    }

    struct BrokenExporter;

    #[async_trait]
    impl ArtifactExporter for BrokenExporter {
        fn kind(&self) -> ArtifactKind {
            ArtifactKind::Audio
        }

        async fn export(&self, _text: &str) -> Result<Artifact, ExportError> {
            Err(ExportError::ToolNotFound {
                program: "espeak-ng".to_string(),
                setting: "espeak_path",
            })
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_other() {
        let exporters = Exporters::new(
            Arc::new(BrokenExporter),
            Arc::new(FixedExporter {
                kind: ArtifactKind::Document,
            }),
        );

        let results = exporters
            .export("வணக்கம்", &[ArtifactKind::Audio, ArtifactKind::Document])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ArtifactKind::Audio);
        assert!(matches!(results[0].1, Err(ExportError::ToolNotFound { .. })));
        assert_eq!(results[1].0, ArtifactKind::Document);
        let document = results[1].1.as_ref().unwrap();
        assert_eq!(document.bytes, "வணக்கம்".as_bytes());
    }

    #[tokio::test]
    async fn repeated_kinds_export_once() {
        let exporters = Exporters::new(
            Arc::new(FixedExporter {
                kind: ArtifactKind::Audio,
            }),
            Arc::new(FixedExporter {
                kind: ArtifactKind::Document,
            }),
        );
        let results = exporters
            .export("x", &[ArtifactKind::Document, ArtifactKind::Document])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ArtifactKind::Document);
    }

    #[tokio::test]
    async fn every_export_gets_a_fresh_handle() {
        let exporter = FixedExporter {
            kind: ArtifactKind::Document,
        };
        let first = exporter.export("x").await.unwrap();
        let second = exporter.export("x").await.unwrap();
        assert_ne!(first.handle, second.handle);
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn scratch_space_is_removed_on_drop() {
        let base = tempdir().unwrap();
        let scratch = scratch_space(Some(&base.path().join("scratch"))).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("speech.wav"), b"data").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chatty_tool_does_not_stall_on_large_input() {
        let args = vec![OsString::from("-c"), OsString::from("cat >&2")];
        let input = "வணக்கம் ".repeat(64 * 1024);
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_tool("sh", "espeak_path", &args, Some(&input)),
        )
        .await
        .expect("renderer stalled on large input");
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_is_not_masked_by_closed_stdin() {
        let args = vec![
            OsString::from("-c"),
            OsString::from("echo no voice >&2; exit 2"),
        ];
        let input = "a".repeat(512 * 1024);
        let error = run_tool("sh", "espeak_path", &args, Some(&input))
            .await
            .unwrap_err();
        match error {
            ExportError::ToolFailed { stderr, .. } => assert_eq!(stderr, "no voice"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_tool_is_reported_by_setting() {
        let error = run_tool("/nonexistent/renderer", "typst_path", &[], None)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("export.typst_path"));
    }
}
