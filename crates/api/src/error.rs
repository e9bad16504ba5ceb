use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use async_graphql::ErrorExtensions;
use infra::EngineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(e) => match e {
                EngineError::NotFound => StatusCode::NOT_FOUND,
                EngineError::Forbidden => StatusCode::FORBIDDEN,
                EngineError::Invalid(_) => StatusCode::BAD_REQUEST,
                e if e.is_conflict() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Db(_) | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Engine(e) => e.code(),
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Db(_) => "DATABASE_ERROR",
            AppError::Anyhow(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody { error: self.to_string(), code: self.code() };
        (status, Json(body)).into_response()
    }
}

/// Surface the machine-readable code as a GraphQL error extension. Resolvers
/// convert with `.map_err(|e| e.extend())` so clients can dispatch on
/// `extensions.code` instead of parsing messages.
impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_conflict_statuses() {
        let err = AppError::Engine(EngineError::SlotTaken);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "SLOT_TAKEN");

        assert_eq!(AppError::Engine(EngineError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Engine(EngineError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Engine(EngineError::Invalid("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Engine(EngineError::Invariant("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Engine(EngineError::InscriptionsClosed).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn graphql_errors_carry_the_code_extension() {
        let err = AppError::Engine(EngineError::SlotTaken).extend();
        assert_eq!(err.message, "partner slot is already taken");
        assert!(err.extensions.is_some());
    }
}
