// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP mapping of [`ControlPlaneError`].
//!
//! Every error body is `{error, message, ...}` with the offending field,
//! check, agent or topic spelled out so a caller can act without logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crewplane_core::domain::error::ControlPlaneError;

#[derive(Debug)]
pub struct ApiError(pub ControlPlaneError);

impl From<ControlPlaneError> for ApiError {
    fn from(err: ControlPlaneError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ControlPlaneError::Validation { .. } => StatusCode::BAD_REQUEST,
            ControlPlaneError::NotFound { .. } => StatusCode::NOT_FOUND,
            ControlPlaneError::Permission { .. } => StatusCode::FORBIDDEN,
            ControlPlaneError::Backpressure { .. } => StatusCode::TOO_MANY_REQUESTS,
            ControlPlaneError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ControlPlaneError::QualityGate(_) => StatusCode::BAD_REQUEST,
            ControlPlaneError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.0.kind();
        let message = self.0.to_string();
        let body = match self.0 {
            ControlPlaneError::Validation { field, .. } => {
                json!({"error": kind, "message": message, "field": field})
            }
            ControlPlaneError::NotFound { kind: what, id } => {
                json!({"error": kind, "message": message, "kind": what, "id": id})
            }
            ControlPlaneError::Permission { publisher, topic } => {
                json!({"error": kind, "message": message, "publisher": publisher, "topic": topic})
            }
            ControlPlaneError::Backpressure {
                publisher,
                consecutive_failures,
            } => json!({
                "error": kind,
                "message": message,
                "publisher": publisher,
                "consecutive_failures": consecutive_failures,
            }),
            ControlPlaneError::Unreachable { agent, reason } => {
                json!({"error": kind, "message": message, "agent": agent, "reason": reason})
            }
            ControlPlaneError::QualityGate(report) => json!({
                "error": kind,
                "message": "Quality Gate Failed",
                "validation": report,
            }),
            ControlPlaneError::Repository(e) => {
                error!("Store error while serving request: {}", e);
                json!({"error": kind, "message": "control plane store failure"})
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ControlPlaneError::validation("version", "bad"), StatusCode::BAD_REQUEST),
            (ControlPlaneError::not_found("agent", "x"), StatusCode::NOT_FOUND),
            (
                ControlPlaneError::Permission {
                    publisher: "p".into(),
                    topic: "t".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                ControlPlaneError::Backpressure {
                    publisher: "p".into(),
                    consecutive_failures: 3,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ControlPlaneError::Unreachable {
                    agent: "qa".into(),
                    reason: "timeout".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }
}
