use std::ffi::OsString;
use std::io::Cursor;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::{run_tool, scratch_space, Artifact, ArtifactExporter, ArtifactKind, ExportError};
use crate::config::ExportConfig;

pub const AUDIO_FILE_NAME: &str = "Tamil_Audio.wav";

pub struct AudioExporter {
    config: ExportConfig,
}

impl AudioExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    fn espeak_args(&self, wav_path: &std::path::Path) -> Vec<OsString> {
        vec![
            "-v".into(),
            self.config.voice.clone().into(),
            "-s".into(),
            self.config.speech_rate.to_string().into(),
            // UTF-8 input
            "-b".into(),
            "1".into(),
            "-w".into(),
            wav_path.as_os_str().to_owned(),
            "--stdin".into(),
        ]
    }
}

fn wav_duration_secs(bytes: &[u8]) -> Result<f64, ExportError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(ExportError::InvalidOutput(
            "WAV header reports a zero sample rate".to_string(),
        ));
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

#[async_trait]
impl ArtifactExporter for AudioExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Audio
    }

    async fn export(&self, text: &str) -> Result<Artifact, ExportError> {
        if text.trim().is_empty() {
            return Err(ExportError::EmptyText);
        }

        let scratch = scratch_space(self.config.scratch_dir.as_deref())?;
        let wav_path = scratch.path().join("speech.wav");
        run_tool(
            &self.config.espeak_path,
            "espeak_path",
            &self.espeak_args(&wav_path),
            Some(text),
        )
        .await?;

        let bytes = fs::read(&wav_path).await?;
        let duration_secs = wav_duration_secs(&bytes)?;

        Ok(Artifact {
            handle: Uuid::new_v4(),
            kind: ArtifactKind::Audio,
            file_name: AUDIO_FILE_NAME.to_string(),
            mime_type: "audio/wav".to_string(),
            bytes,
            duration_secs: Some(duration_secs),
        })
    }
}
