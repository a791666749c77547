//! HTTP implementations of the backend trait seams.
//!
//! [`RestClient`] speaks the structured REST API (messages and
//! profiles), [`DirectStoreClient`] the direct data-store insert
//! endpoint, and [`RestAuthClient`] the auth backend's verification
//! endpoints. Read endpoints take JSON documents in `select`/`filter`
//! query parameters and answer with a `{ "data": ... }` envelope.

use std::time::Duration;

use serde::Deserialize;
use starchat_proto::message::{DirectInsertRecord, Message, NewMessage, RoomId};
use starchat_proto::profile::Profile;
use starchat_proto::wire::{DataEnvelope, WriteResponse};
use url::Url;

use crate::api::{ApiError, AuthApi, DirectStore, MessageApi, ProfileApi};

/// Error constructing an HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An endpoint URL could not be derived from the base.
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    /// The underlying HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Http(String),
}

const API_KEY_HEADER: &str = "X-API-KEY";

fn build_http(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ClientError::Http(err.to_string()))
}

/// Joining against a base only keeps its last path segment if the base
/// ends with a slash.
fn normalized(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

fn network(err: &reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}

fn history_select() -> String {
    serde_json::json!({
        "id": true,
        "chat_id": true,
        "user_name": true,
        "message_text": true,
        "timestamp": true,
        "full_name": true,
    })
    .to_string()
}

fn room_filter(room: RoomId) -> String {
    serde_json::json!({ "chat_id": room }).to_string()
}

fn username_filter(username: &str) -> String {
    serde_json::json!({ "username": username }).to_string()
}

/// Client for the structured REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_key: String,
    messages_url: Url,
    write_url: Url,
    profiles_url: Url,
}

impl RestClient {
    /// Builds a client for the given REST base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if an endpoint URL cannot be derived or
    /// the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = normalized(base);
        Ok(Self {
            http: build_http(timeout)?,
            api_key: api_key.into(),
            messages_url: base.join("messages")?,
            write_url: base.join("messages/__one")?,
            profiles_url: base.join("user_profiles")?,
        })
    }
}

impl MessageApi for RestClient {
    async fn fetch_messages(&self, room: RoomId) -> Result<Vec<Message>, ApiError> {
        let response = self
            .http
            .get(self.messages_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("select", history_select()), ("filter", room_filter(room))])
            .send()
            .await
            .map_err(|err| network(&err))?;
        let envelope: DataEnvelope<Vec<Message>> = checked(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(envelope.data)
    }

    async fn post_message(&self, message: &NewMessage) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.write_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|err| network(&err))?;
        let body: WriteResponse = checked(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        if let Some(error) = body.error {
            return Err(ApiError::Rejected(error));
        }
        Ok(())
    }
}

impl ProfileApi for RestClient {
    async fn fetch_profile(&self, username: &str) -> Result<Option<Profile>, ApiError> {
        let response = self
            .http
            .get(self.profiles_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("filter", username_filter(username))])
            .send()
            .await
            .map_err(|err| network(&err))?;
        let envelope: DataEnvelope<Vec<Profile>> = checked(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(envelope.data.into_iter().next())
    }
}

/// Client for the direct data-store insert path.
#[derive(Debug, Clone)]
pub struct DirectStoreClient {
    http: reqwest::Client,
    api_key: String,
    insert_url: Url,
}

impl DirectStoreClient {
    /// Builds a client for the given data-store base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the endpoint URL cannot be derived or
    /// the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = normalized(base);
        Ok(Self {
            http: build_http(timeout)?,
            api_key: api_key.into(),
            insert_url: base.join("messages")?,
        })
    }
}

impl DirectStore for DirectStoreClient {
    async fn insert_message(&self, record: &DirectInsertRecord) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.insert_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(record)
            .send()
            .await
            .map_err(|err| network(&err))?;
        checked(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct VerificationStatus {
    is_verified: bool,
}

/// Client for the auth backend's verification endpoints.
#[derive(Debug, Clone)]
pub struct RestAuthClient {
    http: reqwest::Client,
    api_key: String,
    resend_url: Url,
    status_url: Url,
}

impl RestAuthClient {
    /// Builds a client for the given auth base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if an endpoint URL cannot be derived or
    /// the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = normalized(base);
        Ok(Self {
            http: build_http(timeout)?,
            api_key: api_key.into(),
            resend_url: base.join("auth/verify/resend")?,
            status_url: base.join("auth/verify/status")?,
        })
    }
}

impl AuthApi for RestAuthClient {
    async fn resend_verification_email(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.resend_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| network(&err))?;
        checked(response).await?;
        Ok(())
    }

    async fn check_verification_status(&self) -> Result<bool, ApiError> {
        let response = self
            .http
            .get(self.status_url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| network(&err))?;
        let envelope: DataEnvelope<VerificationStatus> = checked(response)
            .await?
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(envelope.data.is_verified)
    }
}
