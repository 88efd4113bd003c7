use shopfront_mfa_client::code::CodeEntry;
use shopfront_mfa_client::error::ClientError;
use shopfront_mfa_client::events::MfaEvent;
use shopfront_mfa_client::flow::MfaPhase;
use shopfront_mfa_client::pending::MemoryPendingStorage;
use shopfront_mfa_client::session::AuthState;

use crate::helpers::{
    FlakyStorage, Harness, MockProfiles, MockProvider, TEST_CODE, TEST_EMAIL, TEST_PASSWORD,
    test_session,
};

fn entry(code: &str) -> CodeEntry {
    let mut entry = CodeEntry::new();
    entry.paste(code);
    entry
}

#[tokio::test]
async fn should_issue_challenge_after_password() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();

    flow.begin(" Shopper@Example.com ", TEST_PASSWORD).await.unwrap();

    assert_eq!(
        flow.phase(),
        &MfaPhase::ChallengeIssued {
            email: TEST_EMAIL.to_owned()
        }
    );
    assert_eq!(h.api.issued_count(), 1);
    let record = h.controller.pending().record().unwrap().unwrap();
    assert_eq!(record.email, TEST_EMAIL);
    assert_eq!(record.expires_at, h.api.issued.lock().unwrap()[0].expires_at);
    assert!(!flow.can_resend());
}

#[tokio::test]
async fn should_clear_entry_on_wrong_code_then_establish_session() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    let mut events = h.controller.events();

    let mut wrong = entry("111111");
    let err = flow.submit(&mut wrong).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidOrExpiredCode));
    assert_eq!(wrong.display(), ["", "", "", "", "", ""].map(String::from));
    assert_eq!(flow.banner(), Some("Invalid or expired code."));
    assert!(matches!(flow.phase(), MfaPhase::ChallengeIssued { .. }));
    assert!(h.controller.pending().peek().unwrap().is_some());

    let mut right = entry(TEST_CODE);
    let state = flow.submit(&mut right).await.unwrap();

    assert_eq!(
        state,
        AuthState::Authenticated {
            session: test_session()
        }
    );
    assert_eq!(flow.phase(), &MfaPhase::SessionEstablished);
    assert_eq!(flow.banner(), None);
    assert!(h.controller.pending().peek().unwrap().is_none());

    let mut saw_cleared = false;
    while let Ok(event) = events.try_recv() {
        saw_cleared |= event.name() == "mfa-session-cleared";
    }
    assert!(saw_cleared);
}

#[tokio::test]
async fn should_reject_malformed_code_without_network_call() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    let mut short = entry("12345");
    let err = flow.submit(&mut short).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidCodeFormat));
    assert_eq!(h.api.verify_calls(), 0);
    assert!(matches!(flow.phase(), MfaPhase::ChallengeIssued { .. }));
}

#[tokio::test]
async fn should_lock_resend_for_first_minute() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    h.clock.advance_secs(30);
    let err = flow.resend().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ResendLocked {
            retry_after_secs: 30
        }
    ));
    assert_eq!(h.api.issued_count(), 1);

    h.clock.advance_secs(30);
    assert!(flow.can_resend());
    flow.resend().await.unwrap();
    assert_eq!(h.api.issued_count(), 2);

    let countdown = flow.countdown().unwrap();
    assert!(!flow.can_resend());
    assert_eq!(countdown.remaining_secs(h.clock_now()), 300);
    assert_eq!(
        h.controller.pending().record().unwrap().unwrap().expires_at,
        countdown.expires_at()
    );
}

#[tokio::test]
async fn should_return_to_credentials_on_bad_password() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();

    let err = flow.begin(TEST_EMAIL, "wrong").await.unwrap_err();

    assert!(matches!(err, ClientError::Provider(_)));
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert_eq!(
        flow.banner(),
        Some("Sign-in failed. Check your email and password.")
    );
    assert!(h.controller.pending().peek().unwrap().is_none());
    assert_eq!(h.api.issued_count(), 0);
}

#[tokio::test]
async fn should_drop_session_when_delivery_fails() {
    let h = Harness::with(
        MockProvider::signed_out(),
        MemoryPendingStorage::new(),
        MockProfiles::default(),
        |api| api.fail_issue_with_delivery = true,
    );
    let mut flow = h.controller.flow();

    let err = flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();

    assert!(matches!(err, ClientError::DeliveryError));
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert_eq!(flow.banner(), Some("Failed to send code, try again."));
    assert!(!h.provider.has_session());
    assert!(h.controller.pending().peek().unwrap().is_none());
}

#[tokio::test]
async fn should_cancel_and_sign_out() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    flow.cancel().await.unwrap();

    assert_eq!(flow.phase(), &MfaPhase::Cancelled);
    assert!(!h.provider.has_session());
    assert!(h.controller.pending().peek().unwrap().is_none());
    assert!(flow.countdown().is_none());
}

#[tokio::test]
async fn should_refuse_submit_without_challenge() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();

    let err = flow.submit(&mut entry(TEST_CODE)).await.unwrap_err();

    assert!(matches!(err, ClientError::NoChallenge));
    assert_eq!(h.api.verify_calls(), 0);
}

#[tokio::test]
async fn should_resume_countdown_from_stored_deadline() {
    let h = Harness::start(MockProvider::signed_out());
    let mut first = h.controller.flow();
    first.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    drop(first);

    h.clock.advance_secs(100);
    let mut reloaded = h.controller.flow();
    assert!(reloaded.resume().unwrap());

    assert_eq!(
        reloaded.phase(),
        &MfaPhase::ChallengeIssued {
            email: TEST_EMAIL.to_owned()
        }
    );
    assert_eq!(
        reloaded.countdown().unwrap().remaining_secs(h.clock_now()),
        200
    );
    assert!(reloaded.can_resend());
    assert_eq!(reloaded.ticks().unwrap().borrow().remaining_secs, 200);
}

#[tokio::test]
async fn should_not_resume_without_pending_record() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    assert!(!flow.resume().unwrap());
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
}

#[tokio::test]
async fn should_announce_store_on_begin() {
    let h = Harness::start(MockProvider::signed_out());
    let mut events = h.controller.events();
    let mut flow = h.controller.flow();

    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        MfaEvent::SessionStored {
            email: TEST_EMAIL.to_owned()
        }
    );
}

#[tokio::test]
async fn should_restart_when_pending_record_cannot_be_cleared_after_verify() {
    let storage = FlakyStorage::default();
    let h = Harness::with(
        MockProvider::signed_out(),
        storage.clone(),
        MockProfiles::default(),
        |_| {},
    );
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    storage.break_removes();

    let err = flow.submit(&mut entry(TEST_CODE)).await.unwrap_err();

    assert!(matches!(err, ClientError::Storage(_)));
    assert_eq!(h.api.verify_calls(), 1);
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert_eq!(flow.banner(), Some("Something went wrong, try again."));
    assert!(!h.provider.has_session());
    assert!(flow.countdown().is_none());
}

#[tokio::test]
async fn should_drop_session_when_issued_record_cannot_be_stored() {
    // the provisional record is written, the one with the server deadline is not
    let h = Harness::with(
        MockProvider::signed_out(),
        FlakyStorage::failing_after_saves(1),
        MockProfiles::default(),
        |_| {},
    );
    let mut flow = h.controller.flow();

    let err = flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();

    assert!(matches!(err, ClientError::Storage(_)));
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert_eq!(flow.banner(), Some("Something went wrong, try again."));
    assert!(!h.provider.has_session());
    assert!(h.controller.pending().peek().unwrap().is_none());
}

#[tokio::test]
async fn should_not_sign_in_when_pending_record_cannot_be_written() {
    let h = Harness::with(
        MockProvider::signed_out(),
        FlakyStorage::failing_after_saves(0),
        MockProfiles::default(),
        |_| {},
    );
    let mut flow = h.controller.flow();

    let err = flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();

    assert!(matches!(err, ClientError::Storage(_)));
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert!(flow.banner().is_some());
    assert!(!h.provider.has_session());
    assert_eq!(h.api.issued_count(), 0);
}

#[tokio::test]
async fn should_return_to_credentials_when_session_vanished_before_verify() {
    let h = Harness::start(MockProvider::signed_out());
    let mut flow = h.controller.flow();
    flow.begin(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    // provider session expired while the shopper read the email
    *h.provider.session.lock().unwrap() = None;

    let err = flow.submit(&mut entry(TEST_CODE)).await.unwrap_err();

    assert!(matches!(err, ClientError::SessionLost));
    assert_eq!(flow.phase(), &MfaPhase::NoAttempt);
    assert_eq!(flow.banner(), Some("Your sign-in expired. Sign in again."));
    assert!(h.controller.pending().peek().unwrap().is_none());
}
