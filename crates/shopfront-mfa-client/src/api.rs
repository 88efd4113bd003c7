use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::code::VerificationCode;
use crate::config::ClientConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub challenge_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The MFA service as seen from the client.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn issue_challenge(&self, email: &str) -> Result<IssuedChallenge, ClientError>;
    async fn verify_code(&self, email: &str, code: &VerificationCode) -> Result<(), ClientError>;
}

pub struct HttpVerificationApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChallengeRequest<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeResponse {
    challenge_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    message: String,
    retry_after: Option<u64>,
}

impl HttpVerificationApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::new(client, config.mfa_url.clone()))
    }

    async fn error_from_response(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        let body = resp.json::<ErrorBody>().await.unwrap_or_default();
        error_from_body(status, body)
    }
}

fn error_from_body(status: StatusCode, body: ErrorBody) -> ClientError {
    match body.kind.as_str() {
        "INVALID_CODE_FORMAT" => ClientError::InvalidCodeFormat,
        "INVALID_EMAIL" => ClientError::InvalidEmail,
        "INVALID_OR_EXPIRED_CODE" => ClientError::InvalidOrExpiredCode,
        "DELIVERY_ERROR" => ClientError::DeliveryError,
        "GENERATION_ERROR" => ClientError::GenerationError,
        "RESEND_LOCKED" => ClientError::ResendLocked {
            retry_after_secs: body.retry_after.unwrap_or_default(),
        },
        _ => ClientError::Server {
            status: status.as_u16(),
            message: body.message,
        },
    }
}

#[async_trait]
impl VerificationApi for HttpVerificationApi {
    async fn issue_challenge(&self, email: &str) -> Result<IssuedChallenge, ClientError> {
        let resp = self
            .client
            .post(format!("{}/mfa/challenge", self.base_url))
            .json(&ChallengeRequest { email })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        let body: ChallengeResponse = resp.json().await?;
        Ok(IssuedChallenge {
            challenge_id: body.challenge_id,
            expires_at: body.expires_at,
        })
    }

    async fn verify_code(&self, email: &str, code: &VerificationCode) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(format!("{}/mfa/verify", self.base_url))
            .json(&VerifyRequest {
                email,
                code: code.as_str(),
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }
}
