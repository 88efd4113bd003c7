/// Errors surfaced by the verification flow. None of them are fatal: the flow
/// always lands back on the credentials form or the code form.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("code must be exactly 6 digits")]
    InvalidCodeFormat,
    #[error("invalid email")]
    InvalidEmail,
    #[error("failed to send code")]
    DeliveryError,
    #[error("failed to create verification code")]
    GenerationError,
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("resend available in {retry_after_secs}s")]
    ResendLocked { retry_after_secs: u64 },
    #[error("no verification in progress")]
    NoChallenge,
    #[error("provider session missing after verification")]
    SessionLost,
    #[error("server responded {status}: {message}")]
    Server { status: u16, message: String },
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error("auth provider error: {0}")]
    Provider(String),
    #[error("local storage error")]
    Storage(#[from] anyhow::Error),
}

impl ClientError {
    /// Sentence shown in the notification and the inline banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCodeFormat => "Enter the 6-digit code from your email.".to_owned(),
            Self::InvalidEmail => "Enter a valid email address.".to_owned(),
            Self::DeliveryError => "Failed to send code, try again.".to_owned(),
            Self::GenerationError | Self::Server { .. } => {
                "Could not start verification, try again.".to_owned()
            }
            Self::InvalidOrExpiredCode => "Invalid or expired code.".to_owned(),
            Self::ResendLocked { retry_after_secs } => {
                format!("You can request a new code in {retry_after_secs} seconds.")
            }
            Self::NoChallenge => "Your verification session ended. Sign in again.".to_owned(),
            Self::SessionLost => "Your sign-in expired. Sign in again.".to_owned(),
            Self::Network(_) => {
                "Network error, check your connection and try again.".to_owned()
            }
            Self::Provider(_) => "Sign-in failed. Check your email and password.".to_owned(),
            Self::Storage(_) => "Something went wrong, try again.".to_owned(),
        }
    }
}
