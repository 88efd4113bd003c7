use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MfaServiceError;
use crate::state::AppState;
use crate::usecase::challenge::{IssueChallengeInput, IssueChallengeUseCase};

// ── POST /mfa/challenge ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueChallengeRequest {
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueChallengeResponse {
    pub success: bool,
    pub challenge_id: Uuid,
    #[serde(serialize_with = "shopfront_core::serde::to_rfc3339_ms")]
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub async fn issue_challenge(
    State(state): State<AppState>,
    Json(body): Json<IssueChallengeRequest>,
) -> Result<(StatusCode, Json<IssueChallengeResponse>), MfaServiceError> {
    let usecase = IssueChallengeUseCase {
        challenges: state.challenge_repo(),
        mailer: state.mailer(),
        gate: state.resend_gate(),
    };
    let out = usecase
        .execute(IssueChallengeInput { email: body.email })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueChallengeResponse {
            success: true,
            challenge_id: out.challenge_id,
            expires_at: out.expires_at,
        }),
    ))
}
