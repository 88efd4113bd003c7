use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use shopfront_auth_types::{
    cookie::{MFA_ASSURANCE_COOKIE, clear_assurance_cookie, set_assurance_cookie},
    token::validate_assurance_token,
};

use crate::error::MfaServiceError;
use crate::state::AppState;
use crate::usecase::verify::{VerifyChallengeInput, VerifyChallengeUseCase};

// ── POST /mfa/verify ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyRequest>,
) -> Result<impl IntoResponse, MfaServiceError> {
    let usecase = VerifyChallengeUseCase {
        challenges: state.challenge_repo(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let out = usecase
        .execute(VerifyChallengeInput {
            email: body.email,
            code: body.code,
        })
        .await?;

    let jar = set_assurance_cookie(jar, out.assurance_token, state.cookie_domain.clone());
    Ok((StatusCode::OK, jar, Json(VerifyResponse { verified: true })))
}

// ── GET /mfa/session ─────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub email: String,
    pub challenge_id: uuid::Uuid,
    pub expires_at: u64,
}

pub async fn check_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<SessionResponse>, MfaServiceError> {
    let token = jar
        .get(MFA_ASSURANCE_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(MfaServiceError::InvalidToken)?;
    let info = validate_assurance_token(&token, &state.jwt_secret)
        .map_err(|_| MfaServiceError::InvalidToken)?;
    Ok(Json(SessionResponse {
        email: info.email,
        challenge_id: info.challenge_id,
        expires_at: info.expires_at,
    }))
}

// ── DELETE /mfa/session ──────────────────────────────────────────────────────

pub async fn clear_session(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = clear_assurance_cookie(jar, state.cookie_domain.clone());
    (StatusCode::NO_CONTENT, jar)
}
