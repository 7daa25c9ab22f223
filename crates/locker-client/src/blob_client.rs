//! HTTP client for the Blob Store.
//!
//! Every request carries a bearer token from a [`TokenSource`]. When the
//! source verifies its tokens through a [`CredentialClient`], a 401 from the
//! store invalidates the cached token and the request is sent once more with
//! a fresh one.

use crate::errors::ClientError;
use common::credential_client::{authenticate, build_http_client, CredentialClient, CredentialError};
use common::secret::{ExposeSecret, SecretString};
use reqwest::{header, Body, RequestBuilder, Response, StatusCode, Url};
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument, warn};

/// Where request tokens come from.
pub struct TokenSource {
    inner: TokenSourceInner,
}

enum TokenSourceInner {
    /// Tokens verified against the signing certificate, refreshed on demand.
    Verified(CredentialClient),

    /// Tokens used exactly as the authentication service returns them.
    Plain {
        url: String,
        username: String,
        password: SecretString,
        insecure: bool,
        cached: Mutex<Option<SecretString>>,
    },
}

impl TokenSource {
    /// Tokens from a [`CredentialClient`].
    pub fn verified(client: CredentialClient) -> Self {
        Self {
            inner: TokenSourceInner::Verified(client),
        }
    }

    /// Unverified tokens fetched with HTTP Basic authentication.
    pub fn plain(url: String, username: String, password: SecretString, insecure: bool) -> Self {
        Self {
            inner: TokenSourceInner::Plain {
                url,
                username,
                password,
                insecure,
                cached: Mutex::new(None),
            },
        }
    }

    /// Whether a rejected token can be replaced by re-authenticating.
    pub fn can_refresh(&self) -> bool {
        matches!(self.inner, TokenSourceInner::Verified(_))
    }

    /// Current token, authenticating first if none is held.
    ///
    /// # Errors
    ///
    /// Returns the `CredentialError` from authentication.
    pub async fn token(&self) -> Result<SecretString, CredentialError> {
        match &self.inner {
            TokenSourceInner::Verified(client) => client.retrieve_token().await,
            TokenSourceInner::Plain {
                url,
                username,
                password,
                insecure,
                cached,
            } => {
                let mut cached = cached.lock().await;
                if let Some(token) = cached.as_ref() {
                    return Ok(token.clone());
                }
                let token = authenticate(*insecure, url, username, password).await?;
                *cached = Some(token.clone());
                Ok(token)
            }
        }
    }

    async fn invalidate(&self) {
        match &self.inner {
            TokenSourceInner::Verified(client) => client.invalidate().await,
            TokenSourceInner::Plain { cached, .. } => *cached.lock().await = None,
        }
    }
}

/// A successful GET whose body has not been read yet.
pub struct BlobDownload {
    response: Response,
}

impl BlobDownload {
    /// Body length announced by the store.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Stream the body into `writer`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the body fails mid-stream and `Io` if the
    /// writer fails.
    pub async fn write_to<W>(mut self, writer: &mut W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written: u64 = 0;
        while let Some(chunk) = self.response.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }
}

/// Client for one Blob Store.
pub struct BlobClient {
    http_client: reqwest::Client,
    base_url: Url,
    tokens: TokenSource,
}

impl BlobClient {
    /// Create a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if `base_url` is not an absolute
    /// http(s) URL and `ClientError::Credential` if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, tokens: TokenSource, insecure: bool) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http_client: build_http_client(insecure)?,
            base_url,
            tokens,
        })
    }

    /// URL addressing `key`.
    ///
    /// Leading slashes are dropped and `/` separates path segments. Each
    /// segment is percent-encoded, so `?`, `#`, `%` and spaces are part of
    /// the key rather than URL syntax.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the base URL cannot take a path.
    pub fn blob_url(&self, key: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(key.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Upload the file at `path` under `key`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the key is taken; see [`ClientError`] for the rest.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn put_file(&self, key: &str, path: &Path) -> Result<(), ClientError> {
        let url = self.blob_url(key)?;
        let url = url.as_str();
        let http_client = &self.http_client;

        let response = self
            .execute(move || async move {
                let file = tokio::fs::File::open(path).await?;
                let len = file.metadata().await?.len();
                Ok::<_, ClientError>(
                    http_client
                        .put(url)
                        .header(header::CONTENT_LENGTH, len)
                        .body(Body::wrap_stream(ReaderStream::new(file))),
                )
            })
            .await?;

        expect_status(response, StatusCode::CREATED).map(|_| ())
    }

    /// Upload `bytes` under `key`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the key is taken; see [`ClientError`] for the rest.
    #[instrument(skip_all, fields(key = %key, len = bytes.len()))]
    pub async fn put_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<(), ClientError> {
        let url = self.blob_url(key)?;
        let url = url.as_str();
        let http_client = &self.http_client;
        let bytes = &bytes;

        let response = self
            .execute(move || async move { Ok(http_client.put(url).body(bytes.clone())) })
            .await?;

        expect_status(response, StatusCode::CREATED).map(|_| ())
    }

    /// Start downloading `key`.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored under the key.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn get(&self, key: &str) -> Result<BlobDownload, ClientError> {
        let url = self.blob_url(key)?;
        let url = url.as_str();
        let http_client = &self.http_client;

        let response = self
            .execute(move || async move { Ok(http_client.get(url)) })
            .await?;

        expect_status(response, StatusCode::OK).map(|response| BlobDownload { response })
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is stored under the key.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn delete(&self, key: &str) -> Result<(), ClientError> {
        let url = self.blob_url(key)?;
        let url = url.as_str();
        let http_client = &self.http_client;

        let response = self
            .execute(move || async move { Ok(http_client.delete(url)) })
            .await?;

        expect_status(response, StatusCode::OK).map(|_| ())
    }

    /// Send the request built by `build`, retrying once with a fresh token
    /// after a 401 when the token source can refresh.
    async fn execute<F, Fut>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<RequestBuilder, ClientError>>,
    {
        let response = self.send_with_token(&build).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.tokens.can_refresh() {
            return Ok(response);
        }

        warn!(
            target: "locker.client",
            "Token rejected by the Blob Store, re-authenticating once"
        );
        self.tokens.invalidate().await;

        self.send_with_token(&build).await
    }

    async fn send_with_token<F, Fut>(&self, build: &F) -> Result<Response, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<RequestBuilder, ClientError>>,
    {
        let token = self.tokens.token().await?;
        let response = build()
            .await?
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        debug!(
            target: "locker.client",
            status = %response.status(),
            "Blob Store responded"
        );

        Ok(response)
    }
}

fn expect_status(response: Response, expected: StatusCode) -> Result<Response, ClientError> {
    let status = response.status();
    if status == expected {
        Ok(response)
    } else {
        Err(ClientError::from_status(status))
    }
}
