use std::sync::Arc;

use adaptive_tamil_core::{Session, SessionController};
use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::export::Exporters;
use crate::protocol::{
    ArtifactOutcome, DaemonRequest, DaemonResponse, ErrorCode, ErrorResponse, ExportsView,
    FeedbackView, RequestBody, ResponseBody, StateView, TranslationView,
};

pub struct AppState {
    controller: SessionController,
    exporters: Exporters,
}

impl AppState {
    pub fn new(controller: SessionController, exporters: Exporters) -> Self {
        Self {
            controller,
            exporters,
        }
    }
}

pub struct TranslationServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl TranslationServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.prepare_socket_path().await?;
        if self.config.socket_path.exists() {
            fs::remove_file(&self.config.socket_path)
                .await
                .with_context(|| {
                    format!(
                        "failed to cleanup stale socket {}",
                        self.config.socket_path.display()
                    )
                })?;
        }

        let listener = UnixListener::bind(&self.config.socket_path).with_context(|| {
            format!(
                "failed to bind unix socket at {}",
                self.config.socket_path.display()
            )
        })?;
        info!(
            "adaptive tamil daemon listening on {}",
            self.config.socket_path.display()
        );

        loop {
            let (stream, _) = listener.accept().await?;
            let state = self.state.clone();
            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                if let Err(error) = handle_connection(reader, writer, state).await {
                    warn!("connection closed with error: {error:#}");
                }
            });
        }
    }

    pub async fn run_stdio(&self) -> Result<()> {
        info!("adaptive tamil session on stdio");
        handle_connection(tokio::io::stdin(), tokio::io::stdout(), self.state.clone()).await
    }

    async fn prepare_socket_path(&self) -> Result<()> {
        if let Some(parent) = self.config.socket_path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create socket directory {}", parent.display())
            })?;
        }
        Ok(())
    }
}

async fn handle_connection<R, W>(reader: R, mut writer: W, state: Arc<AppState>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::new();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = process_line(&line, &state, &mut session).await;
        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(error) => {
                error!("failed to encode response: {error}");
                serde_json::to_string(&DaemonResponse {
                    id: response.id,
                    body: ResponseBody::Error(ErrorResponse::new(
                        ErrorCode::Internal,
                        "failed to encode response",
                    )),
                })?
            }
        };
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn process_line(line: &str, state: &AppState, session: &mut Session) -> DaemonResponse {
    match serde_json::from_str::<DaemonRequest>(line) {
        Ok(request) => handle_request(request, state, session).await,
        Err(error) => {
            error!("invalid request JSON: {error}");
            DaemonResponse {
                id: String::new(),
                body: ResponseBody::Error(ErrorResponse::new(
                    ErrorCode::InvalidRequest,
                    format!("invalid JSON payload: {error}"),
                )),
            }
        }
    }
}

fn translation_view(session: &Session, changed: bool) -> ResponseBody {
    ResponseBody::Translation(TranslationView {
        text: session.current_text().unwrap_or_default().to_string(),
        effort_score: session.effort_score(),
        changed,
    })
}

async fn handle_request(
    request: DaemonRequest,
    state: &AppState,
    session: &mut Session,
) -> DaemonResponse {
    let id = request.id;
    let controller = &state.controller;
    let body = match request.body {
        RequestBody::Ping => ResponseBody::Pong,
        RequestBody::Translate(payload) => {
            match controller
                .on_translate_requested(session, &payload.text)
                .await
            {
                Ok(()) => translation_view(session, false),
                Err(error) => {
                    warn!("translate request failed: {error}");
                    ResponseBody::Error(ErrorResponse::from(&error))
                }
            }
        }
        RequestBody::Simplify => match controller.on_simplify_requested(session) {
            Ok(outcome) => translation_view(session, outcome.changed),
            Err(error) => ResponseBody::Error(ErrorResponse::from(&error)),
        },
        RequestBody::Feedback(payload) => {
            match controller
                .on_feedback_requested(session, payload.label)
                .await
            {
                Ok(record) => ResponseBody::FeedbackRecorded(FeedbackView {
                    label: record.label,
                    effort_score: record.effort_score,
                }),
                Err(error) => {
                    error!("feedback request failed: {error}");
                    ResponseBody::Error(ErrorResponse::from(&error))
                }
            }
        }
        RequestBody::Export(payload) => match session.current_text() {
            Some(text) => {
                let results = state.exporters.export(text, &payload.kinds).await;
                ResponseBody::Exports(ExportsView {
                    artifacts: results
                        .into_iter()
                        .map(|(kind, result)| ArtifactOutcome::from_result(kind, result))
                        .collect(),
                })
            }
            None => ResponseBody::Error(ErrorResponse::new(
                ErrorCode::NoTranslation,
                "nothing has been translated yet",
            )),
        },
        RequestBody::State => ResponseBody::State(StateView {
            input: session.raw_input().map(str::to_string),
            text: session.current_text().map(str::to_string),
            effort_score: session.effort_score(),
        }),
        RequestBody::Stats => match controller.feedback_sink().summary().await {
            Ok(summary) => ResponseBody::Stats(summary),
            Err(error) => {
                error!("failed to read feedback log: {error}");
                ResponseBody::Error(ErrorResponse::new(
                    ErrorCode::PersistenceFailed,
                    error.to_string(),
                ))
            }
        },
    };
    DaemonResponse { id, body }
}
