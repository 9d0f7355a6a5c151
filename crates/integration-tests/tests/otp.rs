//! One-time code verification against a real database.

use chrono::{Duration, Utc};
use lasu_mart_api::db::OtpRepository;
use lasu_mart_api::models::OtpRejection;
use lasu_mart_api::services::otp::{self, OtpError};
use lasu_mart_core::OtpKind;
use lasu_mart_integration_tests::TestApp;

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_email_code_marks_email_verified() {
    let app = TestApp::connect().await;
    let (user, _) = app.create_user("ada", false).await;
    let code = otp::generate_code();

    OtpRepository::new(app.pool())
        .replace(
            OtpKind::Email,
            user.email.as_str(),
            &code,
            Utc::now() + Duration::minutes(5),
        )
        .await
        .expect("store code");

    let updated = otp::verify(app.pool(), app.identity.as_ref(), &user, &code)
        .await
        .expect("code accepted");

    assert!(updated.verified.email);
    assert!(!updated.verified.phone);
    assert!(app.identity.claims_of(&user.uid).expect("known user").verified.email);

    let replay = otp::verify(app.pool(), app.identity.as_ref(), &user, &code).await;
    assert!(matches!(replay, Err(OtpError::Rejected(OtpRejection::Invalid))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_expired_code_is_rejected() {
    let app = TestApp::connect().await;
    let (user, _) = app.create_user("ada", false).await;
    let code = otp::generate_code();

    OtpRepository::new(app.pool())
        .replace(
            OtpKind::Phone,
            user.phone_number.as_str(),
            &code,
            Utc::now() - Duration::seconds(1),
        )
        .await
        .expect("store code");

    let result = otp::verify(app.pool(), app.identity.as_ref(), &user, &code).await;
    assert!(matches!(result, Err(OtpError::Rejected(OtpRejection::Expired))));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_code_for_someone_else_is_rejected() {
    let app = TestApp::connect().await;
    let (user, _) = app.create_user("ada", false).await;
    let (other, _) = app.create_user("grace", false).await;
    let code = otp::generate_code();

    OtpRepository::new(app.pool())
        .replace(
            OtpKind::Email,
            other.email.as_str(),
            &code,
            Utc::now() + Duration::minutes(5),
        )
        .await
        .expect("store code");

    let result = otp::verify(app.pool(), app.identity.as_ref(), &user, &code).await;
    assert!(matches!(
        result,
        Err(OtpError::Rejected(OtpRejection::RecipientMismatch))
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_same_code_issued_to_two_users_verifies_for_each() {
    let app = TestApp::connect().await;
    let (first, _) = app.create_user("ada", false).await;
    let (second, _) = app.create_user("grace", false).await;
    let code = otp::generate_code();
    let otps = OtpRepository::new(app.pool());

    // The second user's copy is the newer row.
    for user in [&first, &second] {
        otps.replace(
            OtpKind::Email,
            user.email.as_str(),
            &code,
            Utc::now() + Duration::minutes(5),
        )
        .await
        .expect("store code");
    }

    let updated = otp::verify(app.pool(), app.identity.as_ref(), &first, &code)
        .await
        .expect("first user's code accepted");
    assert!(updated.verified.email);

    let updated = otp::verify(app.pool(), app.identity.as_ref(), &second, &code)
        .await
        .expect("second user's code still outstanding");
    assert!(updated.verified.email);
}
