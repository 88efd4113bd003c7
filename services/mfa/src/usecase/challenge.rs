use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rand::RngExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::repository::{ChallengeRepository, CodeMailer, ResendGate};
use crate::domain::types::{
    CODE_LEN, RESEND_COOLDOWN_SECS, VerificationChallenge, normalize_email,
};
use crate::error::MfaServiceError;

/// Uniform numeric code, zero-padded (leading zeros are valid codes).
pub fn generate_code() -> String {
    let upper = 10u32.pow(CODE_LEN as u32);
    let n = rand::rng().random_range(0..upper);
    format!("{n:0width$}", width = CODE_LEN)
}

pub struct IssueChallengeInput {
    pub email: String,
}

#[derive(Debug)]
pub struct IssueChallengeOutput {
    pub challenge_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct IssueChallengeUseCase<C, M, G>
where
    C: ChallengeRepository,
    M: CodeMailer,
    G: ResendGate,
{
    pub challenges: C,
    pub mailer: M,
    pub gate: G,
}

impl<C, M, G> IssueChallengeUseCase<C, M, G>
where
    C: ChallengeRepository,
    M: CodeMailer,
    G: ResendGate,
{
    pub async fn execute(
        &self,
        input: IssueChallengeInput,
    ) -> Result<IssueChallengeOutput, MfaServiceError> {
        let email = normalize_email(&input.email).ok_or(MfaServiceError::InvalidEmail)?;

        if let Some(retry_after_secs) = self.gate.try_acquire(&email, RESEND_COOLDOWN_SECS).await? {
            return Err(MfaServiceError::ResendLocked { retry_after_secs });
        }

        match self.issue(&email).await {
            Ok(out) => Ok(out),
            Err(err) => {
                // A failed issue must not cost the shopper a cooldown.
                if let Err(release_err) = self.gate.release(&email).await {
                    warn!(error = %release_err, "failed to release resend cooldown");
                }
                Err(err)
            }
        }
    }

    async fn issue(&self, email: &str) -> Result<IssueChallengeOutput, MfaServiceError> {
        let challenge = VerificationChallenge::new(email.to_owned(), generate_code(), Utc::now());

        self.challenges
            .supersede_and_create(&challenge)
            .await
            .map_err(|e| match e {
                MfaServiceError::Internal(inner) => MfaServiceError::GenerationError(inner),
                other => MfaServiceError::GenerationError(anyhow!("{other}")),
            })?;

        self.mailer
            .send_code(email, &challenge.code, challenge.expires_at)
            .await?;

        info!(challenge_id = %challenge.id, "verification challenge issued");
        Ok(IssueChallengeOutput {
            challenge_id: challenge.id,
            expires_at: challenge.expires_at,
        })
    }
}
