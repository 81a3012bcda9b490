use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use model_eval_core::{ErrorKind, EvalError, SplitError};
use serde::Serialize;

/// Error body: `{kind, message, split_index?, failures?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<SplitError>>,
}

#[derive(Debug)]
pub enum ApiError {
    Eval(EvalError),
    NotFound(String),
}

impl From<EvalError> for ApiError {
    fn from(err: EvalError) -> Self {
        Self::Eval(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Eval(e) => match e.kind() {
                ErrorKind::InvalidParameters => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::AggregateFailure
                | ErrorKind::Collaborator
                | ErrorKind::HashFetchFailure
                | ErrorKind::SplitExecutionFailure => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::NotFound(message) => ErrorBody {
                kind: "not_found".to_string(),
                message: message.clone(),
                split_index: None,
                failures: None,
            },
            Self::Eval(e) => ErrorBody {
                kind: e.kind().as_str().to_string(),
                message: e.to_string(),
                split_index: e.split_index(),
                failures: match e {
                    EvalError::AggregateFailure { failures } => Some(failures.clone()),
                    _ => None,
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {:?}", status, self);
        }
        (status, Json(self.body())).into_response()
    }
}
