use std::ffi::OsString;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::{run_tool, scratch_space, Artifact, ArtifactExporter, ArtifactKind, ExportError};
use crate::config::ExportConfig;

pub const DOCUMENT_FILE_NAME: &str = "Tamil_Translation.pdf";

const BODY_FILE: &str = "body.txt";
const SOURCE_FILE: &str = "document.typ";
const OUTPUT_FILE: &str = "document.pdf";

/// The text is kept in a separate file and read verbatim by the template, so no
/// markup in the translation is ever interpreted. The configured font families are
/// tried in order, which lets the renderer embed a font covering Tamil glyphs.
pub struct DocumentExporter {
    config: ExportConfig,
}

impl DocumentExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    fn template(&self) -> String {
        let fonts = self
            .config
            .fonts
            .iter()
            .map(|font| typst_string(font))
            .collect::<Vec<_>>()
            .join(", ");
        let font_arg = if fonts.is_empty() {
            String::new()
        } else {
            format!("font: ({fonts},), ")
        };
        format!(
            "#set document(title: \"Tamil Translation\")\n\
             #set page(paper: \"a4\", margin: 2cm)\n\
             #set text({font_arg}lang: \"ta\", size: 12pt)\n\
             #for para in read(\"{BODY_FILE}\").split(\"\\n\") [\n\
             \x20 #para \\\n\
             ]\n"
        )
    }

    fn compile_args(&self, source: &std::path::Path, output: &std::path::Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["compile".into()];
        if let Some(font_path) = &self.config.font_path {
            args.push("--font-path".into());
            args.push(font_path.as_os_str().to_owned());
        }
        args.push(source.as_os_str().to_owned());
        args.push(output.as_os_str().to_owned());
        args
    }
}

fn typst_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

#[async_trait]
impl ArtifactExporter for DocumentExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Document
    }

    async fn export(&self, text: &str) -> Result<Artifact, ExportError> {
        if text.trim().is_empty() {
            return Err(ExportError::EmptyText);
        }

        let scratch = scratch_space(self.config.scratch_dir.as_deref())?;
        let source = scratch.path().join(SOURCE_FILE);
        let output = scratch.path().join(OUTPUT_FILE);
        fs::write(scratch.path().join(BODY_FILE), text).await?;
        fs::write(&source, self.template()).await?;

        run_tool(
            &self.config.typst_path,
            "typst_path",
            &self.compile_args(&source, &output),
            None,
        )
        .await?;

        let bytes = fs::read(&output).await?;
        if !bytes.starts_with(b"%PDF") {
            return Err(ExportError::InvalidOutput(
                "missing %PDF header".to_string(),
            ));
        }

        Ok(Artifact {
            handle: Uuid::new_v4(),
            kind: ArtifactKind::Document,
            file_name: DOCUMENT_FILE_NAME.to_string(),
            mime_type: "application/pdf".to_string(),
            bytes,
            duration_secs: None,
        })
    }
}
