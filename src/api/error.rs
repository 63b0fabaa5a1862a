use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::domain::order::{ErrorKind, OrderError};

use super::response::{ErrorResponse, FieldError};

// ============================================================================
// API Errors - mapping to HTTP responses
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("request validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("invalid query parameter {param}: {reason}")]
    InvalidQuery { param: &'static str, reason: String },
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Order(err) => err.code(),
            ApiError::InvalidBody(_) => "INVALID_REQUEST_BODY",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::InvalidQuery { .. } => "INVALID_QUERY_PARAMETER",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::Order(err) => match err.kind() {
                ErrorKind::NotFound => "Order not found",
                ErrorKind::Validation => "Order violates a business rule",
                ErrorKind::Conflict => "Request conflicts with the current order state",
                ErrorKind::BadRequest => "Invalid request",
                ErrorKind::Internal => "Internal server error",
            },
            ApiError::InvalidBody(_) => "Invalid request body",
            ApiError::Validation(_) => "Validation failed",
            ApiError::InvalidQuery { .. } => "Invalid query parameters",
        }
    }

    fn details(&self) -> Option<Vec<FieldError>> {
        match self {
            ApiError::Validation(errors) => Some(field_errors(errors)),
            ApiError::Order(err) => err.field().map(|field| {
                vec![FieldError {
                    field: field.to_string(),
                    message: err.to_string(),
                }]
            }),
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Order(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidBody(_) | ApiError::Validation(_) | ApiError::InvalidQuery { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // storage details stay in the logs
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            error,
            error_code: self.error_code(),
            message: self.message(),
            details: self.details(),
        })
    }
}

/// Flattens nested validator output into `field.path` entries, sorted by path.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(String::new(), errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(prefix: String, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| FieldError {
                    field: path.clone(),
                    message: describe(e),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let bound = |key: &str| error.params.get(key).map(|v| v.to_string());
    match (error.code.as_ref(), bound("min"), bound("max")) {
        ("length", Some(min), Some(max)) => format!("length must be between {min} and {max}"),
        ("length", Some(min), None) => format!("length must be at least {min}"),
        ("length", None, Some(max)) => format!("length must be at most {max}"),
        ("range", Some(min), _) => format!("must be greater than or equal to {min}"),
        ("url", _, _) => "must be a valid URL".to_string(),
        (code, _, _) => format!("failed {code} validation"),
    }
}
