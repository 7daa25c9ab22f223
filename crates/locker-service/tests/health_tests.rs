//! Health endpoint integration tests.
//!
//! `/health` is public and GET-only, whether or not authentication is enabled.

use locker_test_utils::TestLockerServer;

/// Test that /health returns 200 and plain text "OK" without a token.
#[tokio::test]
async fn test_health_endpoint_returns_200_without_token() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that writes to /health are rejected with 405 and store nothing.
#[tokio::test]
async fn test_health_rejects_put_and_delete() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn().await?;
    let client = reqwest::Client::new();

    let put = client
        .put(format!("{}/health", server.url()))
        .body("not a blob")
        .send()
        .await?;
    assert_eq!(put.status(), 405);

    let delete = client
        .delete(format!("{}/health", server.url()))
        .send()
        .await?;
    assert_eq!(delete.status(), 405);

    assert_eq!(server.blob_count(), 0);

    Ok(())
}

/// Test that /health also answers when authentication is disabled.
#[tokio::test]
async fn test_health_without_auth() -> Result<(), anyhow::Error> {
    let server = TestLockerServer::spawn_without_auth().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
