use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};

/// MFA service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum MfaServiceError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("code must be exactly 6 digits")]
    InvalidCodeFormat,
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("please wait before requesting a new code")]
    ResendLocked { retry_after_secs: u64 },
    #[error("failed to send code, try again")]
    DeliveryError(#[source] anyhow::Error),
    #[error("failed to create verification code")]
    GenerationError(#[source] anyhow::Error),
    #[error("invalid token")]
    InvalidToken,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl MfaServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidCodeFormat => "INVALID_CODE_FORMAT",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::ResendLocked { .. } => "RESEND_LOCKED",
            Self::DeliveryError(_) => "DELIVERY_ERROR",
            Self::GenerationError(_) => "GENERATION_ERROR",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail | Self::InvalidCodeFormat => StatusCode::BAD_REQUEST,
            Self::InvalidOrExpiredCode | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::ResendLocked { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::DeliveryError(_) => StatusCode::BAD_GATEWAY,
            Self::GenerationError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MfaServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records method/uri/status; only server-side failures
        // need their anyhow chain logged.
        match &self {
            Self::DeliveryError(e) | Self::GenerationError(e) | Self::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), kind = self.kind(), "request failed");
            }
            _ => {}
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        let retry_after = match &self {
            Self::ResendLocked { retry_after_secs } => {
                body["retryAfter"] = (*retry_after_secs).into();
                HeaderValue::from_str(&retry_after_secs.to_string()).ok()
            }
            _ => None,
        };
        let mut resp = (status, axum::Json(body)).into_response();
        if let Some(value) = retry_after {
            resp.headers_mut().insert(RETRY_AFTER, value);
        }
        resp
    }
}
