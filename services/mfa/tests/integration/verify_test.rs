use std::sync::Arc;

use tokio::task::JoinSet;

use shopfront_auth_types::token::validate_assurance_token;
use shopfront_mfa::domain::types::MAX_VERIFY_ATTEMPTS;
use shopfront_mfa::error::MfaServiceError;
use shopfront_mfa::usecase::challenge::{IssueChallengeInput, IssueChallengeUseCase};
use shopfront_mfa::usecase::verify::{VerifyChallengeInput, VerifyChallengeUseCase};

use crate::helpers::{
    MockChallengeRepo, MockMailer, MockResendGate, TEST_EMAIL, TEST_JWT_SECRET, test_challenge,
};

fn verifier(repo: MockChallengeRepo) -> VerifyChallengeUseCase<MockChallengeRepo> {
    VerifyChallengeUseCase {
        challenges: repo,
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
}

fn input(code: &str) -> VerifyChallengeInput {
    VerifyChallengeInput {
        email: TEST_EMAIL.to_owned(),
        code: code.to_owned(),
    }
}

fn assert_invalid_or_expired<T: std::fmt::Debug>(result: Result<T, MfaServiceError>) {
    assert!(
        matches!(result, Err(MfaServiceError::InvalidOrExpiredCode)),
        "expected InvalidOrExpiredCode, got {result:?}"
    );
}

#[tokio::test]
async fn should_verify_matching_code_once() {
    let challenge = test_challenge("004217", 10);
    let id = challenge.id;
    let repo = MockChallengeRepo::new(vec![challenge]);
    let rows = repo.rows_handle();
    let uc = verifier(repo);

    let out = uc.execute(input("004217")).await.unwrap();
    assert_eq!(out.challenge_id, id);
    assert_eq!(out.email, TEST_EMAIL);

    let info = validate_assurance_token(&out.assurance_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.email, TEST_EMAIL);
    assert_eq!(info.challenge_id, id);
    assert_eq!(info.expires_at, out.assurance_exp);

    assert!(rows.lock().unwrap()[0].consumed_at.is_some());

    // Same code again: already consumed.
    assert_invalid_or_expired(uc.execute(input("004217")).await);
}

#[tokio::test]
async fn should_reject_code_after_expiry_even_if_digits_match() {
    let uc = verifier(MockChallengeRepo::new(vec![test_challenge("123456", 301)]));
    assert_invalid_or_expired(uc.execute(input("123456")).await);
}

#[tokio::test]
async fn should_accept_code_just_before_expiry() {
    let uc = verifier(MockChallengeRepo::new(vec![test_challenge("123456", 295)]));
    assert!(uc.execute(input("123456")).await.is_ok());
}

#[tokio::test]
async fn should_reject_wrong_code_and_count_attempt() {
    let repo = MockChallengeRepo::new(vec![test_challenge("123456", 10)]);
    let rows = repo.rows_handle();
    let uc = verifier(repo);

    assert_invalid_or_expired(uc.execute(input("654321")).await);

    let rows = rows.lock().unwrap();
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].consumed_at.is_none());
}

#[tokio::test]
async fn should_lock_challenge_after_max_attempts() {
    let uc = verifier(MockChallengeRepo::new(vec![test_challenge("123456", 10)]));

    for _ in 0..MAX_VERIFY_ATTEMPTS {
        assert_invalid_or_expired(uc.execute(input("000000")).await);
    }
    // Correct code no longer helps.
    assert_invalid_or_expired(uc.execute(input("123456")).await);
}

#[tokio::test]
async fn should_reject_when_no_challenge_exists() {
    let uc = verifier(MockChallengeRepo::empty());
    assert_invalid_or_expired(uc.execute(input("123456")).await);
}

#[tokio::test]
async fn should_reject_malformed_code_before_lookup() {
    let repo = MockChallengeRepo::new(vec![test_challenge("123456", 10)]);
    let rows = repo.rows_handle();
    let uc = verifier(repo);

    for bad in ["12345", "1234567", "12a456", "", " 123456"] {
        let result = uc.execute(input(bad)).await;
        assert!(
            matches!(result, Err(MfaServiceError::InvalidCodeFormat)),
            "expected InvalidCodeFormat for {bad:?}, got {result:?}"
        );
    }
    assert_eq!(rows.lock().unwrap()[0].attempts, 0);
}

#[tokio::test]
async fn should_match_email_case_insensitively() {
    let uc = verifier(MockChallengeRepo::new(vec![test_challenge("123456", 10)]));
    let result = uc
        .execute(VerifyChallengeInput {
            email: "A@B.COM".to_owned(),
            code: "123456".to_owned(),
        })
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn should_not_validate_superseded_code_after_resend() {
    let old = test_challenge("111111", 30);
    let old_id = old.id;
    let repo = MockChallengeRepo::new(vec![old]);
    let rows = repo.rows_handle();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();

    let issue = IssueChallengeUseCase {
        challenges: repo.clone(),
        mailer,
        gate: MockResendGate::open(),
    };
    let verify = verifier(repo);

    issue
        .execute(IssueChallengeInput {
            email: TEST_EMAIL.to_owned(),
        })
        .await
        .unwrap();

    assert!(rows.lock().unwrap().iter().all(|c| c.id != old_id));
    let new_code = sent.lock().unwrap()[0].1.clone();
    assert!(verify.execute(input(&new_code)).await.is_ok());
    // the new challenge is consumed, so only a surviving old one could accept this
    assert_invalid_or_expired(verify.execute(input("111111")).await);
}

#[tokio::test]
async fn should_not_validate_first_code_after_second_issue() {
    let repo = MockChallengeRepo::empty();
    let mailer = MockMailer::new();
    let sent = mailer.sent_handle();
    let issue = IssueChallengeUseCase {
        challenges: repo.clone(),
        mailer,
        gate: MockResendGate::open(),
    };
    let verify = verifier(repo);

    for _ in 0..2 {
        issue
            .execute(IssueChallengeInput {
                email: TEST_EMAIL.to_owned(),
            })
            .await
            .unwrap();
    }
    let (first, second) = {
        let sent = sent.lock().unwrap();
        (sent[0].1.clone(), sent[1].1.clone())
    };

    assert!(verify.execute(input(&second)).await.is_ok());
    assert_invalid_or_expired(verify.execute(input(&first)).await);
}

#[tokio::test]
async fn should_cap_attempts_under_concurrent_guesses() {
    let repo = MockChallengeRepo::yielding(vec![test_challenge("123456", 10)]);
    let rows = repo.rows_handle();
    let uc = Arc::new(verifier(repo));

    let mut guesses = JoinSet::new();
    for i in 0..20 {
        let uc = Arc::clone(&uc);
        let code = if i == 19 { "123456".to_owned() } else { format!("{i:06}") };
        guesses.spawn(async move { uc.execute(input(&code)).await.is_ok() });
    }
    let mut accepted = 0;
    while let Some(ok) = guesses.join_next().await {
        if ok.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 0);
    let rows = rows.lock().unwrap();
    assert_eq!(rows[0].attempts, MAX_VERIFY_ATTEMPTS);
    assert!(rows[0].consumed_at.is_none());
}

#[tokio::test]
async fn should_accept_correct_code_on_last_attempt() {
    let uc = verifier(MockChallengeRepo::new(vec![test_challenge("123456", 10)]));
    for _ in 1..MAX_VERIFY_ATTEMPTS {
        assert_invalid_or_expired(uc.execute(input("000000")).await);
    }
    assert!(uc.execute(input("123456")).await.is_ok());
}
