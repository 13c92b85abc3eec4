use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::{header, StatusCode}};
use serde::Serialize;
use serde_json::json;

/// Message returned to clients for any failure whose detail stays server-side.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Validation error: {}", describe_fields(.0))]
    ValidationError(Vec<FieldError>),

    #[error("Rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: u64 },

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Database error: {source}")]
    DatabaseError {
        context: &'static str,
        #[source]
        source: DatabaseError,
    },

    #[error("Generation error: {source}")]
    GenerationError {
        context: &'static str,
        #[source]
        source: GenerationError,
    },

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::new(field, message)])
    }

    /// Replaces the client-facing message of an upstream failure. Other
    /// variants pass through untouched.
    pub fn context(self, context: &'static str) -> Self {
        match self {
            AppError::DatabaseError { source, .. } => AppError::DatabaseError { context, source },
            AppError::GenerationError { source, .. } => AppError::GenerationError { context, source },
            other => other,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::AuthError(e) => e.public_message().to_string(),
            AppError::ValidationError(fields) => describe_fields(fields),
            AppError::RateLimited { message, .. } => message.clone(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::DatabaseError { context, .. } => context.to_string(),
            AppError::GenerationError { context, .. } => context.to_string(),
            AppError::InternalError(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::DatabaseError {
            context: INTERNAL_ERROR_MESSAGE,
            source: err,
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::GenerationError {
            context: INTERNAL_ERROR_MESSAGE,
            source: err,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        match self {
            AppError::ValidationError(fields) => {
                HttpResponse::build(status).json(json!({ "errors": fields }))
            }
            AppError::RateLimited { message, retry_after_secs } => HttpResponse::build(status)
                .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
                .content_type("text/plain; charset=utf-8")
                .body(message.clone()),
            _ => HttpResponse::build(status).json(json!({ "error": self.public_message() })),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::Revoked => StatusCode::UNAUTHORIZED,
                // Same status for both so the code alone does not reveal which check failed.
                AuthError::DuplicateUser => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::GenerationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization token missing or malformed")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Token has been revoked")]
    Revoked,

    #[error("User already exists")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token missing or malformed",
            AuthError::InvalidToken(_) | AuthError::Revoked => "Invalid or expired token",
            AuthError::DuplicateUser => "User already exists",
            AuthError::InvalidCredentials => "Invalid credentials",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token could not be parsed")]
    Malformed,

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Generation API returned empty content")]
    EmptyContent,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => DatabaseError::Duplicate,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}
