//! AWS session construction and SDK error classification
//!
//! Every report builds its service clients from a profile-scoped
//! `SdkConfig`; nothing in this crate holds a process-wide session.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::error::{ReportError, Result};

/// Error codes the provider uses to signal request-frequency throttling.
const RATE_LIMIT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "SlowDown",
];

/// Error codes that mean the profile's credentials are missing, expired, or
/// not authorized. The affected profile/region is skipped, never retried.
const CREDENTIAL_CODES: &[&str] = &[
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "ExpiredToken",
    "ExpiredTokenException",
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "SignatureDoesNotMatch",
];

/// Load an SDK config bound to a named credential profile, optionally pinned
/// to a region.
pub async fn load_profile_config(profile: &str, region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(profile);
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Load an SDK config from the default credential chain for a fixed region.
pub async fn load_default_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Resolve the account id behind an SDK config via STS.
pub async fn account_id(config: &SdkConfig) -> Result<String> {
    let client = aws_sdk_sts::Client::new(config);
    let identity = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| sdk_error("get caller identity", e))?;

    identity
        .account()
        .map(str::to_string)
        .ok_or_else(|| ReportError::Api("caller identity missing account id".into()))
}

/// Map an SDK error to a classified `ReportError`.
///
/// Transport-level failures (dispatch, timeout) become connectivity errors;
/// everything else is classified by the service error code.
pub fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> ReportError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return ReportError::Connectivity(format!("{operation}: {}", DisplayErrorContext(&err)));
    }

    let code = err.code().unwrap_or_default().to_string();
    let detail = format!("{operation}: {}", DisplayErrorContext(&err));

    if RATE_LIMIT_CODES.contains(&code.as_str()) {
        ReportError::RateLimited(detail)
    } else if CREDENTIAL_CODES.contains(&code.as_str()) {
        ReportError::Credentials(detail)
    } else {
        ReportError::Api(detail)
    }
}
