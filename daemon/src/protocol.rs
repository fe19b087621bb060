use adaptive_tamil_core::{FeedbackLabel, FeedbackSummary, SessionError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::export::{Artifact, ArtifactKind, ExportError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    Ping,
    Translate(TranslateRequest),
    Simplify,
    Feedback(FeedbackRequest),
    Export(ExportRequest),
    State,
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub label: FeedbackLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_export_kinds")]
    pub kinds: Vec<ArtifactKind>,
}

fn default_export_kinds() -> Vec<ArtifactKind> {
    vec![ArtifactKind::Audio, ArtifactKind::Document]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    Pong,
    Translation(TranslationView),
    FeedbackRecorded(FeedbackView),
    Exports(ExportsView),
    State(StateView),
    Stats(FeedbackSummary),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationView {
    pub text: String,
    pub effort_score: u64,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackView {
    pub label: FeedbackLabel,
    pub effort_score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateView {
    pub input: Option<String>,
    pub text: Option<String>,
    pub effort_score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportsView {
    pub artifacts: Vec<ArtifactOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub result: ArtifactResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactResult {
    Ready(ArtifactPayload),
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPayload {
    pub handle: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub data: String,
}

impl ArtifactOutcome {
    pub fn from_result(kind: ArtifactKind, result: Result<Artifact, ExportError>) -> Self {
        let result = match result {
            Ok(artifact) => ArtifactResult::Ready(ArtifactPayload {
                handle: artifact.handle,
                size: artifact.bytes.len(),
                data: BASE64.encode(&artifact.bytes),
                file_name: artifact.file_name,
                mime_type: artifact.mime_type,
                duration_secs: artifact.duration_secs,
            }),
            Err(error) => ArtifactResult::Failed {
                message: error.to_string(),
            },
        };
        Self { kind, result }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    EmptyInput,
    WrongLanguage,
    NoTranslation,
    TranslationFailed,
    PersistenceFailed,
    Internal,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&SessionError> for ErrorResponse {
    fn from(error: &SessionError) -> Self {
        let code = match error {
            SessionError::EmptyInput => ErrorCode::EmptyInput,
            SessionError::WrongLanguage { .. } => ErrorCode::WrongLanguage,
            SessionError::NoTranslation => ErrorCode::NoTranslation,
            SessionError::TranslationFailure(_) => ErrorCode::TranslationFailed,
            SessionError::PersistenceFailure(_) => ErrorCode::PersistenceFailed,
        };
        Self::new(code, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_tamil_core::{FeedbackError, Script};

    #[test]
    fn parse_translate_request() {
        let raw = r#"{"id":"abc","type":"translate","text":"வணக்கம் Hello"}"#;
        let request: DaemonRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.id, "abc");
        match request.body {
            RequestBody::Translate(payload) => assert_eq!(payload.text, "வணக்கம் Hello"),
            _ => panic!("expected translate request"),
        }
    }

    #[test]
    fn parse_unit_and_feedback_requests() {
        let simplify: DaemonRequest = serde_json::from_str(r#"{"type":"simplify"}"#).unwrap();
        assert!(matches!(simplify.body, RequestBody::Simplify));
        assert_eq!(simplify.id, "");

        let feedback: DaemonRequest =
            serde_json::from_str(r#"{"id":"7","type":"feedback","label":"not_clear"}"#).unwrap();
        match feedback.body {
            RequestBody::Feedback(payload) => assert_eq!(payload.label, FeedbackLabel::NotClear),
            _ => panic!("expected feedback request"),
        }
    }

    #[test]
    fn export_defaults_to_both_kinds() {
        let request: DaemonRequest = serde_json::from_str(r#"{"type":"export"}"#).unwrap();
        match request.body {
            RequestBody::Export(payload) => assert_eq!(
                payload.kinds,
                vec![ArtifactKind::Audio, ArtifactKind::Document]
            ),
            _ => panic!("expected export request"),
        }
    }

    #[test]
    fn serializes_artifact_outcomes() {
        let ready = ArtifactOutcome::from_result(
            ArtifactKind::Document,
            Ok(Artifact {
                handle: Uuid::nil(),
                kind: ArtifactKind::Document,
                file_name: "Tamil_Translation.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: b"%PDF".to_vec(),
                duration_secs: None,
            }),
        );
        let json = serde_json::to_value(&ready).unwrap();
        assert_eq!(json["kind"], "document");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["data"], "JVBERg==");
        assert_eq!(json["size"], 4);

        let failed =
            ArtifactOutcome::from_result(ArtifactKind::Audio, Err(ExportError::EmptyText));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "there is no text to export");
    }

    #[test]
    fn maps_session_errors_to_codes() {
        let response = ErrorResponse::from(&SessionError::EmptyInput);
        assert_eq!(response.code, ErrorCode::EmptyInput);
        assert_eq!(response.message, "please enter text");

        let cases = [
            (
                SessionError::WrongLanguage {
                    expected: Script::Latin,
                    detected: Script::Tamil,
                },
                ErrorCode::WrongLanguage,
            ),
            (SessionError::NoTranslation, ErrorCode::NoTranslation),
            (
                SessionError::TranslationFailure(anyhow::anyhow!("model offline")),
                ErrorCode::TranslationFailed,
            ),
            (
                SessionError::PersistenceFailure(FeedbackError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                ))),
                ErrorCode::PersistenceFailed,
            ),
        ];
        for (error, code) in cases {
            let response = ErrorResponse::from(&error);
            assert_eq!(response.code, code);
            assert_eq!(response.message, error.to_string());
        }

        let wire = serde_json::to_value(ErrorResponse::from(&SessionError::NoTranslation)).unwrap();
        assert_eq!(wire["code"], "no_translation");
    }
}
