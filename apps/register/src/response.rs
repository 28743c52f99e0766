//! # Command Response Envelope
//!
//! Every command returns an [`ApiResponse`]; failures never cross the
//! command boundary as panics or bare errors.
//!
//! ```text
//! Ok(data)  ──► { "success": true,  "data": ... }
//! Err(e)    ──► { "success": false, "error": { "code": ..., "message": ... } }
//! ```

use serde::Serialize;
use tracing::{error, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Wraps a command result, logging failures.
    ///
    /// Client mistakes log at `warn`, store/internal failures at `error`.
    pub fn from_result<E>(command: &'static str, result: Result<T, E>) -> Self
    where
        E: Into<ApiError>,
    {
        match result {
            Ok(data) => ApiResponse::success(data),
            Err(e) => {
                let e = e.into();
                if e.code.is_client_error() {
                    warn!(command, code = ?e.code, message = %e.message, "Command rejected");
                } else {
                    error!(command, code = ?e.code, message = %e.message, "Command failed");
                }
                ApiResponse::failure(e)
            }
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(e)) => Err(e),
            (None, None) => Err(ApiError::internal("Empty response")),
        }
    }
}
