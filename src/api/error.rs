use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// ゲートウェイの失敗をラップし、HTTPレスポンスへのマッピングを提供する。
/// 詳細はログに記録し、クライアントには一般的なメッセージのみを返す。
#[derive(Debug)]
pub struct ApiError(Box<dyn std::error::Error + Send + Sync>);

impl From<Box<dyn std::error::Error + Send + Sync>> for ApiError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "gateway error");
        let body = Json(ErrorResponse::new(
            "GATEWAY_ERROR",
            "The requested mutation could not be completed",
        ));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
