//! 统一的请求错误类型与响应转换。

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::http::redirect_found;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// 登录表单凭据不匹配。
    InvalidCredentials,
    /// 会话无效：静默重定向到登录页，不说明原因。
    Unauthorized,
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response()
            }
            ApiError::Unauthorized => redirect_found("/"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName => ApiError::BadRequest("invalid file name".into()),
            StorageError::NotAFile => ApiError::BadRequest("not a file".into()),
            StorageError::Stream(err) if err.is::<MultipartError>() => {
                ApiError::BadRequest("Failed to read file".into())
            }
            StorageError::Stream(err) => {
                error!(error = %err, "upload stream failed");
                ApiError::Internal("storage operation failed".into())
            }
            err if err.is_not_found() => ApiError::NotFound("File not found".into()),
            StorageError::Io(err) => {
                error!(error = %err, "storage operation failed");
                ApiError::Internal("storage operation failed".into())
            }
        }
    }
}
