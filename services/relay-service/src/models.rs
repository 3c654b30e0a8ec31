use serde::Serialize;

pub const WRITE_FAILED_MESSAGE: &str = "Failed to write to Firebase";

#[derive(Serialize)]
pub struct SuccessResponse {
    pub status: &'static str,
    pub id: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}
