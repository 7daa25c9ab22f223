//! Authentication integration tests.
//!
//! Every rejected request must answer 401 with a `WWW-Authenticate` challenge
//! and must leave the base directory untouched.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use locker_test_utils::{TestLockerServer, TestTokenBuilder};
use reqwest::StatusCode;

async fn assert_rejected(response: reqwest::Response) -> Result<(), anyhow::Error> {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(
        challenge.as_deref(),
        Some(r#"Bearer realm="coatlocker", error="invalid_token""#)
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    Ok(())
}

/// PUT without an Authorization header is rejected and writes nothing.
#[tokio::test]
async fn test_missing_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/data", server.url()))
        .body("payload")
        .send()
        .await?;

    assert_rejected(response).await?;
    assert_eq!(server.blob_count(), 0);

    Ok(())
}

/// A token signed by an untrusted key is rejected and writes nothing.
#[tokio::test]
async fn test_foreign_signed_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/data", server.url()))
        .bearer_auth(TestTokenBuilder::new().sign_rogue())
        .body("payload")
        .send()
        .await?;

    assert_rejected(response).await?;
    assert_eq!(server.blob_count(), 0);

    Ok(())
}

/// A foreign-signed DELETE leaves an existing blob in place.
#[tokio::test]
async fn test_foreign_signed_delete_keeps_blob() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/keep", server.url());

    let put = client
        .put(&url)
        .bearer_auth(TestTokenBuilder::new().sign())
        .body("keep me")
        .send()
        .await?;
    assert_eq!(put.status(), 201);

    let delete = client
        .delete(&url)
        .bearer_auth(TestTokenBuilder::new().sign_rogue())
        .send()
        .await?;
    assert_rejected(delete).await?;

    assert_eq!(server.blob_count(), 1);

    Ok(())
}

/// Expired tokens are rejected.
#[tokio::test]
async fn test_expired_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/data", server.url()))
        .bearer_auth(TestTokenBuilder::new().expired().sign())
        .send()
        .await?;

    assert_rejected(response).await
}

/// Tokens whose not-before lies beyond the clock skew are rejected.
#[tokio::test]
async fn test_not_yet_valid_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/data", server.url()))
        .bearer_auth(TestTokenBuilder::new().not_before_in(3600).sign())
        .send()
        .await?;

    assert_rejected(response).await
}

/// Tokens issued too far in the future are rejected.
#[tokio::test]
async fn test_future_iat_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/data", server.url()))
        .bearer_auth(
            TestTokenBuilder::new()
                .issued_at(Utc::now().timestamp() + 3600)
                .sign(),
        )
        .send()
        .await?;

    assert_rejected(response).await
}

/// HS256 tokens are rejected even with a well-formed signature.
#[tokio::test]
async fn test_hmac_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = encode(
        &Header::default(),
        &TestTokenBuilder::new().claims(),
        &EncodingKey::from_secret(b"shared-secret"),
    )?;

    let response = client
        .get(format!("{}/data", server.url()))
        .bearer_auth(token)
        .send()
        .await?;

    assert_rejected(response).await
}

/// Authorization headers that are not Bearer tokens are rejected.
#[tokio::test]
async fn test_malformed_authorization_header_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    for value in ["Basic YWRtaW46YWRtaW4=", "Bearer", "Bearer not.a.jwt"] {
        let response = client
            .get(format!("{}/data", server.url()))
            .header("authorization", value)
            .send()
            .await?;
        assert_rejected(response).await?;
    }

    Ok(())
}

/// A token signed by the trusted key within its lifetime is accepted.
#[tokio::test]
async fn test_valid_token_is_accepted() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/data", server.url()))
        .bearer_auth(TestTokenBuilder::new().for_user("alice").sign())
        .body("payload")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(server.blob_count(), 1);

    Ok(())
}
