use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::WebState;
use crate::core::attachments::{is_image_content_type, TurnBuilder};
use crate::core::config::Config;
use crate::core::error::DaemonError;
use crate::core::model_id::ModelIdentifier;
use crate::core::sessions::new_session_id;

/// Request header naming the conversation; echoed on every chat reply.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug)]
pub(crate) enum WebError {
    BadRequest(String),
    Daemon(DaemonError),
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            WebError::Daemon(err @ DaemonError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            WebError::Daemon(err) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to get response from the daemon: {err}"),
            ),
            WebError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!(status = status.as_u16(), %message, "Request failed");

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IndexBody {
    current_model: Option<String>,
    models: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetModelForm {
    #[serde(default)]
    model: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatReply {
    session_id: String,
    model: String,
    prompt: String,
    response: String,
}

struct Upload {
    file_name: String,
    content_type: String,
    data: Bytes,
}

fn load_config(state: &WebState) -> Result<Config, WebError> {
    Config::load_from_path(&state.inner.config_path)
        .map_err(|err| WebError::Internal(err.to_string()))
}

pub(crate) async fn index(State(state): State<WebState>) -> Result<Json<IndexBody>, WebError> {
    let config = load_config(&state)?;
    let models = state
        .inner
        .inventory
        .local_model_names()
        .await
        .map_err(|err| WebError::Internal(format!("Failed to get local models: {err}")))?;

    Ok(Json(IndexBody {
        current_model: config.current_model().map(|model| model.canonical()),
        models,
    }))
}

pub(crate) async fn set_model(
    State(state): State<WebState>,
    Form(form): Form<SetModelForm>,
) -> Result<Json<serde_json::Value>, WebError> {
    if form.model.trim().is_empty() {
        return Err(WebError::BadRequest("Model cannot be empty".to_string()));
    }

    let model = ModelIdentifier::normalize(&form.model);
    info!(%model, "Setting model");
    let previous = Config::update_at(&state.inner.config_path, |config| {
        let previous = config.current_model();
        config.set_model(&model);
        Ok(previous)
    })
    .map_err(|err| WebError::Internal(format!("Failed to write config: {err}")))?;

    // Histories were built against the old model.
    if previous.as_ref() != Some(&model) {
        state.sessions().clear();
    }

    Ok(Json(serde_json::json!({ "current_model": model.canonical() })))
}

fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_session_id)
}

fn bad_form(err: axum::extract::multipart::MultipartError) -> WebError {
    WebError::BadRequest(format!("Failed to parse form: {err}"))
}

async fn read_chat_form(multipart: &mut Multipart) -> Result<(String, Vec<Upload>), WebError> {
    let mut prompt = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => prompt = field.text().await.map_err(bad_form)?,
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_form)?;
                // Browsers submit an empty part for an untouched file input
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                uploads.push(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => debug!(field = %name, "Ignoring form field"),
        }
    }

    Ok((prompt, uploads))
}

fn compose_turn(prompt: &str, uploads: Vec<Upload>) -> TurnBuilder {
    let mut turn = TurnBuilder::new(prompt);
    for upload in uploads {
        if is_image_content_type(&upload.content_type) {
            debug!(file = %upload.file_name, content_type = %upload.content_type, "Received image");
            turn.add_image_bytes(&upload.data);
        } else {
            debug!(file = %upload.file_name, content_type = %upload.content_type, "Received text");
            turn.add_text_part(&String::from_utf8_lossy(&upload.data));
        }
    }
    turn
}

/// Every reply, success or failure, names the session it belongs to.
pub(crate) async fn chat(
    State(state): State<WebState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let session_id = session_id_from(&headers);
    let mut response = match exchange(&state, &session_id, &mut multipart).await {
        Ok(reply) => reply.into_response(),
        Err(err) => err.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

async fn exchange(
    state: &WebState,
    session_id: &str,
    multipart: &mut Multipart,
) -> Result<Json<ChatReply>, WebError> {
    let (prompt, uploads) = read_chat_form(multipart).await?;
    if prompt.trim().is_empty() {
        return Err(WebError::BadRequest("Prompt cannot be empty".to_string()));
    }

    let model = load_config(state)?.current_model().ok_or_else(|| {
        WebError::BadRequest("No model selected. Set one with POST /set-model.".to_string())
    })?;
    info!(%session_id, %model, attachments = uploads.len(), "Handling chat request");

    let pending = compose_turn(&prompt, uploads).build();

    // Held for the whole round trip so turns on one session never interleave.
    let handle = state.sessions().get_or_create(session_id);
    let mut conversation = handle.lock().await;
    let payload = conversation.snapshot_with(&pending);

    let mut progress = ProgressBar::hidden();
    let result = state
        .inner
        .client
        .chat(&model.canonical(), &payload, &mut progress)
        .await;
    let answer = match result {
        Ok(answer) => answer,
        Err(err) => {
            drop(conversation);
            state.sessions().discard_if_unused(session_id, handle);
            return Err(WebError::Daemon(err));
        }
    };
    conversation.record_exchange(pending, answer.clone());

    Ok(Json(ChatReply {
        session_id: session_id.to_string(),
        model: model.canonical(),
        prompt,
        response: answer,
    }))
}
