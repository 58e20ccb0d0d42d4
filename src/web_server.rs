use std::{convert::Infallible, net::SocketAddr, path::Path, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    serve, Form, Json, Router,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, instrument, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::gemini::GeminiClient;
use crate::provider::{build_parts, ContentGenerator};
use crate::upload::{UploadArtifact, UploadStore};

// Room for multipart boundaries and the text field on top of the file limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// Shared application state. Nothing in here is mutated by requests.
#[derive(Clone)]
pub struct RelayState {
    generator: Arc<dyn ContentGenerator>,
    uploads: Arc<UploadStore>,
}

impl RelayState {
    pub fn new(generator: Arc<dyn ContentGenerator>, uploads: UploadStore) -> Self {
        Self {
            generator,
            uploads: Arc::new(uploads),
        }
    }
}

/// The text/file pair submitted by the chat page.
struct Submission {
    msg: String,
    file: Option<UploadArtifact>,
}

/// Text-only body sent as `application/json` or `application/x-www-form-urlencoded`.
#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    msg: String,
}

impl From<MessageBody> for Submission {
    fn from(body: MessageBody) -> Self {
        Submission {
            msg: body.msg,
            file: None,
        }
    }
}

/// Pick the body format from `Content-Type`. Multipart is the default.
async fn extract_submission(uploads: &UploadStore, request: Request) -> Result<Submission, Response> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<MessageBody>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(body.into())
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<MessageBody>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(body.into())
    } else {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        read_submission(uploads, multipart)
            .await
            .map_err(IntoResponse::into_response)
    }
}

async fn read_submission(
    uploads: &UploadStore,
    mut multipart: Multipart,
) -> Result<Submission, RelayError> {
    let mut msg = None;
    let mut file = None;
    // An error part-way through drops any artifact already stored, which removes it.
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("msg") => msg = Some(field.text().await?),
            Some("file") => {
                if file.is_some() {
                    return Err(RelayError::TooManyFiles);
                }
                file = Some(uploads.ingest(field).await?);
            }
            _ => {}
        }
    }
    Ok(Submission {
        msg: msg.unwrap_or_default(),
        file,
    })
}

async fn generate_reply(
    generator: &dyn ContentGenerator,
    msg: &str,
    file: Option<&UploadArtifact>,
) -> Result<String, RelayError> {
    let parts = match file {
        Some(artifact) => {
            let bytes = artifact.payload().await?;
            build_parts(msg, Some((&*bytes, artifact.mime_type())))
        }
        None => build_parts(msg, None),
    };
    Ok(generator.generate(parts).await?)
}

#[instrument(skip_all)]
async fn get_handler(State(state): State<RelayState>, request: Request) -> Response {
    let Submission { msg, file } = match extract_submission(&state.uploads, request).await {
        Ok(submission) => submission,
        Err(rejection) => return rejection,
    };
    info!(
        msg_len = msg.len(),
        file = file.as_ref().and_then(|f| f.file_name()).unwrap_or("-"),
        "Relaying message to provider"
    );

    let outcome = generate_reply(state.generator.as_ref(), &msg, file.as_ref()).await;

    // Runs on both branches; a failed delete is logged and never replaces the reply.
    if let Some(artifact) = file {
        if let Err(e) = artifact.release() {
            warn!("Failed to remove upload artifact: {}", e);
        }
    }

    match outcome {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Build the relay router: `POST /get` plus static assets from `public_dir`.
///
/// `/get` takes multipart (`msg` + optional `file`), or a text-only `msg` as
/// JSON or a urlencoded form.
pub fn router(state: RelayState, public_dir: impl AsRef<Path>) -> Router {
    let body_limit = match state.uploads.policy().max_bytes {
        Some(max) => DefaultBodyLimit::max(
            usize::try_from(max)
                .unwrap_or(usize::MAX)
                .saturating_add(MULTIPART_OVERHEAD),
        ),
        None => DefaultBodyLimit::disable(),
    };

    let static_files_service = ServeDir::new(public_dir.as_ref()).not_found_service(
        tower::service_fn(|_: Request| async {
            Ok::<_, Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        }),
    );

    Router::new()
        .route("/get", post(get_handler))
        .layer(body_limit)
        .fallback_service(static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}

pub async fn start_web_server(config: RelayConfig) -> Result<()> {
    let uploads = UploadStore::new(
        config.upload_storage,
        &config.upload_dir,
        config.upload_policy.clone(),
    );
    uploads
        .prepare()
        .context("Failed to prepare upload storage")?;

    let generator = Arc::new(GeminiClient::new(
        &config.api_base,
        &config.api_key,
        &config.model,
    ));
    let app = router(RelayState::new(generator, uploads), &config.public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;
    info!("Server running at http://localhost:{}", config.port);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    Ok(())
}
