use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shopfront_auth_types::{cookie::MFA_TOKEN_EXP, token::issue_assurance_token};

use crate::domain::repository::ChallengeRepository;
use crate::domain::types::{Rejection, is_valid_code_format, normalize_email};
use crate::error::MfaServiceError;

pub struct VerifyChallengeInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyChallengeOutput {
    pub email: String,
    pub challenge_id: Uuid,
    pub assurance_token: String,
    pub assurance_exp: u64,
}

pub struct VerifyChallengeUseCase<C: ChallengeRepository> {
    pub challenges: C,
    pub jwt_secret: String,
}

impl<C: ChallengeRepository> VerifyChallengeUseCase<C> {
    pub async fn execute(
        &self,
        input: VerifyChallengeInput,
    ) -> Result<VerifyChallengeOutput, MfaServiceError> {
        if !is_valid_code_format(&input.code) {
            return Err(MfaServiceError::InvalidCodeFormat);
        }
        let email = normalize_email(&input.email).ok_or(MfaServiceError::InvalidEmail)?;
        let now = Utc::now();

        let challenge = match self.challenges.find_latest_unconsumed(&email).await? {
            Some(challenge) => challenge,
            None => return Err(reject(Rejection::NoChallenge)),
        };

        if let Err(reason) = challenge.check_usable(now) {
            return Err(reject(reason));
        }
        // The guess is counted before it is compared, so concurrent guesses
        // cannot all read the same attempt count.
        if !self.challenges.reserve_attempt(challenge.id, now).await? {
            return Err(reject(Rejection::AttemptsExhausted));
        }
        if !challenge.matches(&input.code) {
            return Err(reject(Rejection::NoMatch));
        }

        if !self.challenges.consume(challenge.id, now).await? {
            return Err(reject(Rejection::AlreadyConsumed));
        }

        let assurance_exp = (now + Duration::seconds(MFA_TOKEN_EXP as i64)).timestamp() as u64;
        let assurance_token =
            issue_assurance_token(&email, challenge.id, assurance_exp, &self.jwt_secret)
                .map_err(|e| MfaServiceError::Internal(e.into()))?;

        info!(challenge_id = %challenge.id, "verification challenge consumed");
        Ok(VerifyChallengeOutput {
            email,
            challenge_id: challenge.id,
            assurance_token,
            assurance_exp,
        })
    }
}

// Every rejection looks the same from outside; the reason is for operators only.
fn reject(reason: Rejection) -> MfaServiceError {
    debug!(?reason, "verification code rejected");
    MfaServiceError::InvalidOrExpiredCode
}
