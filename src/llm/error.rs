//! Error taxonomy for model API calls
//!
//! The proxy forwards provider failures verbatim, tagging them with a
//! structured `x-error-code` header. Classification prefers that code, then
//! the HTTP status, and only then falls back to case-insensitive substring
//! sniffing of the provider's error text. The substring rules mirror the
//! provider's known message shapes and may misclassify novel wording; they
//! are the fallback of last resort, not the contract.

use serde::Deserialize;

/// Header carrying the structured error code across the proxy boundary.
pub const ERROR_CODE_HEADER: &str = "x-error-code";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid API key. Please check the credential configured for the proxy. (Invalid API Key)")]
    InvalidApiKey,

    #[error("Permission denied. Ensure the Generative Language API is enabled and the key has the correct permissions. (Permission Denied)")]
    PermissionDenied,

    #[error("You have exceeded your API usage quota. Check your account for details. (Quota Exceeded)")]
    QuotaExceeded,

    #[error("The model is currently busy due to high demand. Please try again in a few moments. (Rate Limit Exceeded)")]
    RateLimited,

    #[error("There was a problem with the request. Please check the document or prompt. (Bad Request)")]
    BadRequest,

    #[error("The AI service encountered an internal error. Please try again later. (Server Error)")]
    ServerError,

    #[error("{0}")]
    Other(String),
}

/// Shape of the provider's JSON error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Stable code string used on the proxy's `x-error-code` header.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidApiKey => "invalid_api_key",
            ApiError::PermissionDenied => "permission_denied",
            ApiError::QuotaExceeded => "quota_exceeded",
            ApiError::RateLimited => "rate_limited",
            ApiError::BadRequest => "bad_request",
            ApiError::ServerError => "server_error",
            ApiError::Other(_) => "unknown",
        }
    }

    pub fn from_code(code: &str) -> Option<ApiError> {
        match code {
            "invalid_api_key" => Some(ApiError::InvalidApiKey),
            "permission_denied" => Some(ApiError::PermissionDenied),
            "quota_exceeded" => Some(ApiError::QuotaExceeded),
            "rate_limited" => Some(ApiError::RateLimited),
            "bad_request" => Some(ApiError::BadRequest),
            "server_error" => Some(ApiError::ServerError),
            _ => None,
        }
    }

    /// Classify from HTTP status plus the raw error body; used by the
    /// proxy to stamp the header and by the client as a fallback.
    pub fn from_status(status: u16, body: &str) -> ApiError {
        let message = flatten_error_body(body);
        match status {
            400 => {
                // The provider reports a bad key as a 400 with a
                // distinctive message rather than a 401.
                if message.to_lowercase().contains("api key not valid") {
                    ApiError::InvalidApiKey
                } else {
                    ApiError::BadRequest
                }
            }
            401 => ApiError::InvalidApiKey,
            403 => ApiError::PermissionDenied,
            429 => {
                if message.to_lowercase().contains("quota") {
                    ApiError::QuotaExceeded
                } else {
                    ApiError::RateLimited
                }
            }
            500..=599 => ApiError::ServerError,
            _ => ApiError::classify_message(&message),
        }
    }

    /// Last-resort classification over free-form error text.
    pub fn classify_message(message: &str) -> ApiError {
        let lower = message.to_lowercase();

        if lower.contains("api key not valid") {
            return ApiError::InvalidApiKey;
        }
        if lower.contains("permission_denied") || lower.contains("does not have permission") {
            return ApiError::PermissionDenied;
        }
        if lower.contains("resource_exhausted") || lower.contains("429") {
            if lower.contains("quota") {
                return ApiError::QuotaExceeded;
            }
            return ApiError::RateLimited;
        }
        if lower.contains("400") || lower.contains("invalid argument") {
            return ApiError::BadRequest;
        }
        if lower.contains("500") || lower.contains("internal error") || lower.contains("rpc failed")
        {
            return ApiError::ServerError;
        }

        ApiError::Other(message.to_string())
    }

    /// Transient failures are worth retrying; configuration and quota
    /// problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::ServerError | ApiError::Other(_) => true,
            ApiError::InvalidApiKey
            | ApiError::PermissionDenied
            | ApiError::QuotaExceeded
            | ApiError::BadRequest => false,
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, ApiError::QuotaExceeded)
    }
}

/// Turn the provider's JSON error body into a single readable line
/// (`<code> <status>: <message>`), or hand back the raw text.
pub fn flatten_error_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.error {
            if let Some(message) = detail.message {
                let code = detail.code.map(|c| c.to_string()).unwrap_or_default();
                let status = detail.status.unwrap_or_default();
                return format!("{} {}: {}", code, status, message)
                    .trim()
                    .to_string();
            }
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_based_classification() {
        assert_eq!(ApiError::from_status(403, ""), ApiError::PermissionDenied);
        assert_eq!(ApiError::from_status(500, ""), ApiError::ServerError);
        assert_eq!(ApiError::from_status(400, "bad prompt"), ApiError::BadRequest);
        assert_eq!(
            ApiError::from_status(400, r#"{"error":{"message":"API key not valid."}}"#),
            ApiError::InvalidApiKey
        );
    }

    #[test]
    fn rate_limit_vs_quota_depends_on_body() {
        assert_eq!(
            ApiError::from_status(429, r#"{"error":{"message":"You exceeded your quota"}}"#),
            ApiError::QuotaExceeded
        );
        assert_eq!(
            ApiError::from_status(429, r#"{"error":{"message":"Resource has been exhausted"}}"#),
            ApiError::RateLimited
        );
    }

    #[test]
    fn message_sniffing_fallback() {
        assert_eq!(
            ApiError::classify_message("RESOURCE_EXHAUSTED: quota exceeded for metric"),
            ApiError::QuotaExceeded
        );
        assert_eq!(
            ApiError::classify_message("grpc: rpc failed with unknown cause"),
            ApiError::ServerError
        );
        assert_eq!(
            ApiError::classify_message("the caller does not have permission"),
            ApiError::PermissionDenied
        );
        assert!(matches!(
            ApiError::classify_message("something novel happened"),
            ApiError::Other(_)
        ));
    }

    #[test]
    fn transient_classes_are_exactly_rate_server_unknown() {
        assert!(ApiError::RateLimited.is_transient());
        assert!(ApiError::ServerError.is_transient());
        assert!(ApiError::Other("?".into()).is_transient());

        assert!(!ApiError::InvalidApiKey.is_transient());
        assert!(!ApiError::QuotaExceeded.is_transient());
        assert!(!ApiError::BadRequest.is_transient());
        assert!(!ApiError::PermissionDenied.is_transient());
    }

    #[test]
    fn header_codes_round_trip() {
        for err in [
            ApiError::InvalidApiKey,
            ApiError::PermissionDenied,
            ApiError::QuotaExceeded,
            ApiError::RateLimited,
            ApiError::BadRequest,
            ApiError::ServerError,
        ] {
            assert_eq!(ApiError::from_code(err.code()), Some(err));
        }
        assert_eq!(ApiError::from_code("unknown"), None);
    }

    #[test]
    fn json_error_body_is_flattened() {
        let body = r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED","message":"Quota exceeded"}}"#;
        assert_eq!(flatten_error_body(body), "429 RESOURCE_EXHAUSTED: Quota exceeded");
        assert_eq!(flatten_error_body("plain text"), "plain text");
    }
}
