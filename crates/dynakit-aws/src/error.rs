//! SDK error normalization.

use aws_sdk_dynamodb::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::operation::RequestId;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use dynakit_model::{EngineError, EngineErrorKind};

/// Fold an SDK failure into an [`EngineError`].
///
/// Service errors are classified by their wire code; transport failures and
/// timeouts become [`EngineErrorKind::NetworkError`].
pub(crate) fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> EngineError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let request_id = err.request_id().map(ToOwned::to_owned);
    let error = match err {
        SdkError::ServiceError(context) => {
            let status = http::StatusCode::from_u16(context.raw().status().as_u16()).ok();
            let service = context.into_err();
            let code = service.code().unwrap_or("UnknownError").to_owned();
            let message = service.message().unwrap_or(&code).to_owned();
            let mut error = EngineError::from_code(&code, message);
            if let Some(status) = status {
                error = error.with_status(status);
            }
            error.with_source(service)
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            EngineError::network(DisplayErrorContext(&err).to_string())
        }
        other => EngineError::new(
            EngineErrorKind::UnknownError,
            DisplayErrorContext(&other).to_string(),
        ),
    };
    match request_id {
        Some(request_id) => error.with_request_id(request_id),
        None => error,
    }
}
