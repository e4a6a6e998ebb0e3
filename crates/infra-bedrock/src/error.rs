// SDK error classification: every Bedrock failure becomes Transport or Permanent

use aws_sdk_bedrockagent::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use kb_sync_core::port::RemoteError;

/// Service error codes worth retrying.
///
/// `ConflictException` is returned while another ingestion job for the same
/// data source is still running, so it clears on its own.
const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "InternalServerException",
    "ServiceUnavailableException",
    "ConflictException",
    "RequestTimeout",
    "RequestTimeoutException",
];

/// Map an SDK error to the domain error class
pub(crate) fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service_err) => {
            classify_error_code(service_err.err().code(), message)
        }
        // request could not even be built (bad input, missing region)
        SdkError::ConstructionFailure(_) => RemoteError::permanent(message),
        // timeouts, connection failures, unparseable responses
        _ => RemoteError::transport(message),
    }
}

/// Classify a service error by its error code.
///
/// Unknown codes are permanent; a missing code is treated as transient since
/// the service did not tell us the request was wrong.
pub fn classify_error_code(code: Option<&str>, message: impl Into<String>) -> RemoteError {
    match code {
        None => RemoteError::transport(message),
        Some(code) if TRANSIENT_CODES.contains(&code) => RemoteError::transport(message),
        Some(_) => RemoteError::permanent(message),
    }
}
