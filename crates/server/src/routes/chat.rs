use axum::{
    extract::{rejection::FormRejection, Form, State},
    Json,
};
use common::types::Status;
use serde::Serialize;
use service::handlers::ChatInput;

use super::{users::{form_or_default, Fields}, AppState};
use crate::errors::ApiError;

#[derive(Serialize)]
pub struct ChatResponse {
    pub status: Status,
    pub chat_response: String,
}

/// `POST /chat/`
pub async fn chat(
    State(state): State<AppState>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state.handlers.chat(form_or_default::<ChatInput>(form)).await?;
    Ok(Json(ChatResponse { status: Status::Success, chat_response: reply }))
}
