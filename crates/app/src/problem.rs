use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use oniontodo_core::{usecase::UseCaseError, ErrorKind};

/// Connect protocol error codes used by the todo service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Internal,
}

impl RpcCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::FailedPrecondition => "failed_precondition",
            Self::Internal => "internal",
        }
    }

    /// HTTP status mandated by the Connect protocol for the code.
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidArgument | Self::FailedPrecondition => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorKind> for RpcCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => Self::InvalidArgument,
            ErrorKind::State => Self::FailedPrecondition,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: RpcCode,
    message: String,
}

/// Error response rendered in the Connect unary JSON format.
#[derive(Debug)]
pub struct RpcError {
    code: RpcCode,
    message: String,
}

impl RpcError {
    pub fn new<S: Into<String>>(code: RpcCode, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn code(&self) -> RpcCode {
        self.code
    }
}

impl From<UseCaseError> for RpcError {
    fn from(err: UseCaseError) -> Self {
        let code = RpcCode::from(err.kind());
        if code == RpcCode::Internal {
            error!(stage = "rpc", error = %err, "use case failed");
        }
        Self::new(code, err.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let mut response = Json(ErrorBody {
            code: self.code,
            message: self.message,
        })
        .into_response();
        *response.status_mut() = status;
        response.extensions_mut().insert(self.code);
        response
    }
}
