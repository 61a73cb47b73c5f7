//! Registration and per-user data endpoints.
//!
//! Fields arrive form-encoded (query string for `GET /api/`). A repeated field
//! takes its last value. A body that cannot be decoded is treated as if every
//! field were missing, so the client still gets the structured "not provided"
//! error.

use axum::{
    extract::{rejection::{FormRejection, QueryRejection}, Form, Query, State},
    Json,
};
use common::types::StatusBody;
use serde::de::DeserializeOwned;
use serde_json::Value;
use service::handlers::{CredentialsInput, UploadInput};
use tracing::debug;

use super::AppState;
use crate::errors::ApiError;

/// Raw `key=value` pairs in request order.
pub(crate) type Fields = Vec<(String, String)>;

pub(crate) fn form_or_default<T: DeserializeOwned + Default>(form: Result<Form<Fields>, FormRejection>) -> T {
    match form {
        Ok(Form(fields)) => last_value_wins(fields),
        Err(e) => {
            debug!(rejection = %e, "unreadable form body");
            T::default()
        }
    }
}

fn query_or_default<T: DeserializeOwned + Default>(query: Result<Query<Fields>, QueryRejection>) -> T {
    match query {
        Ok(Query(fields)) => last_value_wins(fields),
        Err(e) => {
            debug!(rejection = %e, "unreadable query string");
            T::default()
        }
    }
}

/// Collapse repeated keys to their last value, then decode into `T`.
fn last_value_wins<T: DeserializeOwned + Default>(fields: Fields) -> T {
    let mut unique: Fields = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match unique.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => unique.push((key, value)),
        }
    }
    let decoded = serde_urlencoded::to_string(&unique)
        .map_err(|e| e.to_string())
        .and_then(|encoded| serde_urlencoded::from_str::<T>(&encoded).map_err(|e| e.to_string()));
    decoded.unwrap_or_else(|e| {
        debug!(error = %e, "form fields did not decode");
        T::default()
    })
}

/// `POST /register/`
pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    state.handlers.register(form_or_default::<CredentialsInput>(form)).await?;
    Ok(Json(StatusBody::success()))
}

/// `GET /api/`: the stored record itself, without a status wrapper.
pub async fn get_data(
    State(state): State<AppState>,
    query: Result<Query<Fields>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let record = state.handlers.get_data(query_or_default::<CredentialsInput>(query)).await?;
    Ok(Json(record))
}

/// `POST /api/`
pub async fn set_data(
    State(state): State<AppState>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    state.handlers.set_data(form_or_default::<UploadInput>(form)).await?;
    Ok(Json(StatusBody::success()))
}

/// `POST /delete-user-data/`
pub async fn delete_data(
    State(state): State<AppState>,
    form: Result<Form<Fields>, FormRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    state.handlers.delete_data(form_or_default::<CredentialsInput>(form)).await?;
    Ok(Json(StatusBody::success()))
}
