use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::models::{ErrorResponse, SuccessResponse, WRITE_FAILED_MESSAGE};
use crate::state::AppState;

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz() -> StatusCode {
    StatusCode::OK
}

pub async fn arduino_data(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    match state.sink.push(payload).await {
        Ok(id) => {
            tracing::info!(id = %id, "stored arduino record");
            (
                StatusCode::OK,
                Json(SuccessResponse {
                    status: "success",
                    id,
                }),
            )
                .into_response()
        }
        Err(err) => {
            // Detail stays in the logs; clients only see the fixed message.
            tracing::error!(error = %err, "firebase write error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: WRITE_FAILED_MESSAGE,
                }),
            )
                .into_response()
        }
    }
}
