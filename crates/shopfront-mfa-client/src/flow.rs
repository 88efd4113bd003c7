use std::sync::Arc;

use chrono::Duration;
use tokio::sync::watch;

use crate::api::VerificationApi;
use crate::code::CodeEntry;
use crate::countdown::{
    CHALLENGE_TTL_SECS, Clock, CountdownTick, CountdownTicker, ResendCountdown,
};
use crate::error::ClientError;
use crate::pending::PendingVerificationStore;
use crate::provider::AuthProvider;
use crate::session::{AuthState, SessionReconciler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaPhase {
    NoAttempt,
    ChallengeIssued { email: String },
    Verified,
    SessionEstablished,
    Cancelled,
}

/// One sign-in attempt: password, emailed code, then the session.
///
/// Every failure leaves the flow either back at [`MfaPhase::NoAttempt`]
/// (credentials form) or still at [`MfaPhase::ChallengeIssued`] (code form),
/// with [`MfaFlow::banner`] holding the message to show.
pub struct MfaFlow {
    api: Arc<dyn VerificationApi>,
    provider: Arc<dyn AuthProvider>,
    pending: PendingVerificationStore,
    reconciler: SessionReconciler,
    clock: Arc<dyn Clock>,
    phase: MfaPhase,
    countdown: Option<ResendCountdown>,
    ticker: Option<CountdownTicker>,
    banner: Option<String>,
}

impl MfaFlow {
    pub fn new(
        api: Arc<dyn VerificationApi>,
        provider: Arc<dyn AuthProvider>,
        pending: PendingVerificationStore,
        reconciler: SessionReconciler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            provider,
            pending,
            reconciler,
            clock,
            phase: MfaPhase::NoAttempt,
            countdown: None,
            ticker: None,
            banner: None,
        }
    }

    pub fn phase(&self) -> &MfaPhase {
        &self.phase
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn countdown(&self) -> Option<ResendCountdown> {
        self.countdown
    }

    pub fn ticks(&self) -> Option<watch::Receiver<CountdownTick>> {
        self.ticker.as_ref().map(CountdownTicker::subscribe)
    }

    pub fn can_resend(&self) -> bool {
        self.countdown
            .is_some_and(|c| c.can_resend(self.clock.now()))
    }

    /// Password sign-in followed by a code challenge.
    ///
    /// The pending record is written before the provider sees the password, so the
    /// session it creates is never reconciled as authenticated.
    pub async fn begin(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return self.fail(ClientError::InvalidEmail);
        }
        self.banner = None;

        let now = self.clock.now();
        let provisional = now + Duration::seconds(CHALLENGE_TTL_SECS);
        if let Err(e) = self.pending.store(&email, now, provisional) {
            return self.fail(e);
        }

        if let Err(e) = self.provider.sign_in_with_password(&email, password).await {
            self.abandon().await;
            return self.fail(e);
        }

        let issued = match self.api.issue_challenge(&email).await {
            Ok(issued) => issued,
            Err(e) => {
                self.abandon().await;
                return self.fail(e);
            }
        };
        if let Err(e) = self.pending.store(&email, now, issued.expires_at) {
            self.abandon().await;
            return self.fail(e);
        }
        tracing::info!(challenge_id = %issued.challenge_id, "verification code sent");

        self.start_countdown(ResendCountdown::new(issued.expires_at));
        self.phase = MfaPhase::ChallengeIssued { email };
        Ok(())
    }

    /// Picks up an attempt left pending by a previous run. Returns whether there was one.
    pub fn resume(&mut self) -> Result<bool, ClientError> {
        let Some(record) = self.pending.record()? else {
            return Ok(false);
        };
        self.start_countdown(ResendCountdown::new(record.expires_at));
        self.phase = MfaPhase::ChallengeIssued {
            email: record.email,
        };
        Ok(true)
    }

    pub async fn submit(&mut self, entry: &mut CodeEntry) -> Result<AuthState, ClientError> {
        let email = self.challenge_email()?;
        let code = match entry.code() {
            Ok(code) => code,
            Err(e) => return self.fail(e),
        };

        match self.api.verify_code(&email, &code).await {
            Ok(()) => {}
            Err(e @ ClientError::InvalidOrExpiredCode) => {
                entry.clear();
                return self.fail(e);
            }
            Err(e) => return self.fail(e),
        }

        // The code is spent now; a record that cannot be cleared would block
        // the session forever, so start over from the credentials form.
        self.stop_countdown();
        if let Err(e) = self.clear_pending_after_verify() {
            self.abandon().await;
            return self.fail(e);
        }
        self.banner = None;
        self.phase = MfaPhase::Verified;

        let state = self.reconciler.reconcile().await;
        if !state.is_authenticated() {
            self.abandon().await;
            return self.fail(ClientError::SessionLost);
        }
        self.phase = MfaPhase::SessionEstablished;
        Ok(state)
    }

    /// New code for the same email. Refused while the countdown still locks it.
    pub async fn resend(&mut self) -> Result<(), ClientError> {
        let email = self.challenge_email()?;
        let now = self.clock.now();
        if let Some(countdown) = self.countdown {
            if !countdown.can_resend(now) {
                return self.fail(ClientError::ResendLocked {
                    retry_after_secs: countdown.resend_wait_secs(now),
                });
            }
        }

        let issued = match self.api.issue_challenge(&email).await {
            Ok(issued) => issued,
            Err(e) => return self.fail(e),
        };
        // the new code is already on its way, so the countdown follows it either way
        self.start_countdown(ResendCountdown::new(issued.expires_at));
        if let Err(e) = self.pending.store(&email, now, issued.expires_at) {
            return self.fail(e);
        }
        tracing::info!(challenge_id = %issued.challenge_id, "verification code resent");

        self.banner = None;
        Ok(())
    }

    /// Gives up on the attempt and drops the half-authenticated provider session.
    pub async fn cancel(&mut self) -> Result<(), ClientError> {
        self.stop_countdown();
        self.abandon().await;
        self.banner = None;
        self.phase = MfaPhase::Cancelled;
        Ok(())
    }

    fn challenge_email(&mut self) -> Result<String, ClientError> {
        if let MfaPhase::ChallengeIssued { email } = &self.phase {
            return Ok(email.clone());
        }
        self.fail(ClientError::NoChallenge)
    }

    fn clear_pending_after_verify(&self) -> Result<(), ClientError> {
        match self.pending.clear() {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear pending record, retrying");
                self.pending.clear()
            }
        }
    }

    async fn abandon(&mut self) {
        if let Err(e) = self.pending.clear() {
            tracing::warn!(error = %e, "failed to clear pending record");
        }
        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!(error = %e, "provider sign-out failed");
        }
        self.phase = MfaPhase::NoAttempt;
    }

    fn start_countdown(&mut self, countdown: ResendCountdown) {
        let remaining = countdown.remaining_secs(self.clock.now()).max(0) as u64;
        self.countdown = Some(countdown);
        self.ticker = Some(CountdownTicker::start(remaining));
    }

    fn stop_countdown(&mut self) {
        self.countdown = None;
        self.ticker = None;
    }

    fn fail<T>(&mut self, err: ClientError) -> Result<T, ClientError> {
        tracing::debug!(error = %err, "mfa step failed");
        self.banner = Some(err.user_message());
        Err(err)
    }
}
