//! Classification of SDK errors

use apcdeploy_engine::ApiError;
use aws_sdk_appconfig::config::http::HttpResponse;
use aws_sdk_appconfig::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Classify an SDK error for the engine.
///
/// Throttling, server faults, timeouts and dispatch failures are transient.
/// `BadRequestException` carries validator rejections and is surfaced as
/// a validation error with the service message.
pub fn classify<E>(err: SdkError<E, HttpResponse>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ApiError::Transient(DisplayErrorContext(&err).to_string())
        }
        SdkError::ServiceError(context) => {
            let code = context.err().code().map(str::to_string);
            let message = context
                .err()
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            classify_code(code.as_deref(), context.raw().status().as_u16(), message)
        }
        _ => ApiError::Other(DisplayErrorContext(&err).to_string()),
    }
}

/// Classify a service error by code and HTTP status
pub(crate) fn classify_code(code: Option<&str>, status: u16, message: String) -> ApiError {
    match code {
        Some(
            "ThrottlingException"
            | "TooManyRequestsException"
            | "RequestLimitExceeded"
            | "ServiceUnavailableException"
            | "InternalServerException",
        ) => ApiError::Transient(message),
        Some("BadRequestException" | "PayloadTooLargeException") => ApiError::Validation(message),
        Some("ConflictException") => ApiError::Conflict(message),
        Some("ResourceNotFoundException") => ApiError::NotFound(message),
        _ if status == 429 || status >= 500 => ApiError::Transient(message),
        Some(code) => ApiError::Other(format!("{}: {}", code, message)),
        None => ApiError::Other(message),
    }
}
