use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::mcp::rpc::{self, ParseError};
use crate::mcp::session::SessionError;

/// Failures of the streamable HTTP endpoints that surface as a transport-level status.
#[derive(Debug, Error)]
pub enum AppError {
    /// The body never became a request; answered with an embedded JSON-RPC error.
    #[error(transparent)]
    Decode(#[from] ParseError),
    #[error("Failed to send message: {0}")]
    Stream(#[from] SessionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Decode(err) => {
                tracing::warn!(error = %err, "rejected undecodable request body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(rpc::Response::parse_failure(&err)),
                )
                    .into_response()
            }
            Self::Stream(_) => {
                let message = self.to_string();
                tracing::warn!(error = %message, "stream message rejected");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::Value;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn decode_errors_embed_json_rpc_error() {
        let err = rpc::decode_str("{").expect_err("malformed");
        let response = AppError::from(err).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["id"], rpc::ERROR_ID);
        assert_eq!(body["error"]["code"], rpc::INTERNAL_ERROR);
        assert!(body["result"].is_null());
    }

    #[tokio::test]
    async fn stream_errors_name_the_client() {
        let response =
            AppError::from(SessionError::NotFound("client_1".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Failed to send message: No active stream found for client: client_1"
        );
    }
}
