// File: rusty-forms-live/src/remote.rs
// Purpose: Asynchronous server-side checks for a single field

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;

use crate::error::RemoteCheckFailure;
use crate::field::{FieldDescriptor, FieldValue};

/// Override key for remote-check failures
pub const REMOTE: &str = "remote";

/// Transport used to ask a server about one field value
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Query `endpoint` with `name=value`; `Ok` means the value is acceptable
    async fn query(
        &self,
        endpoint: &str,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), RemoteCheckFailure>;
}

/// `GET endpoint?name=value` over HTTP.
///
/// Endpoints are resolved against the base URL, so markup can carry relative
/// paths such as `/users/check`. Without a base only absolute endpoints work.
/// Any 2xx answer passes; other statuses fail with their canonical reason
/// (`409` fails with "Conflict").
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Option<Url>,
}

impl HttpTransport {
    /// Transport resolving endpoints against `base`
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), Some(base))
    }

    /// Transport for absolute endpoints only
    pub fn absolute() -> Self {
        Self::with_client(reqwest::Client::new(), None)
    }

    pub fn with_client(client: reqwest::Client, base: Option<Url>) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Full URL the endpoint is queried at
    pub fn resolve(&self, endpoint: &str) -> Result<Url, RemoteCheckFailure> {
        let url = match &self.base {
            Some(base) => base.join(endpoint),
            None => Url::parse(endpoint),
        };
        url.map_err(|err| {
            RemoteCheckFailure::new(format!("Invalid endpoint '{}': {}", endpoint, err))
        })
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn query(
        &self,
        endpoint: &str,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), RemoteCheckFailure> {
        let url = self.resolve(endpoint)?;
        let value = value.as_text();
        let response = self
            .client
            .get(url)
            .query(&[(name, &*value)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RemoteCheckFailure::new(
                status.canonical_reason().unwrap_or(status.as_str()),
            ))
        }
    }
}

/// Runs the remote check configured on a field and turns a failure into the
/// message to display.
#[derive(Clone)]
pub struct RemoteChecker {
    transport: Arc<dyn RemoteTransport>,
    fallback: String,
}

impl RemoteChecker {
    pub fn new(transport: Arc<dyn RemoteTransport>, fallback: impl Into<String>) -> Self {
        Self {
            transport,
            fallback: fallback.into(),
        }
    }

    /// `None` when the field has no endpoint or the server accepted the value.
    ///
    /// The request itself is never aborted; callers drop a stale answer.
    pub async fn check(&self, field: &FieldDescriptor, value: &FieldValue) -> Option<String> {
        let endpoint = field.remote.as_deref()?;

        match self.transport.query(endpoint, &field.identifier, value).await {
            Ok(()) => None,
            Err(failure) => {
                tracing::warn!(
                    field = %field.identifier,
                    endpoint,
                    reason = %failure.reason,
                    "remote check failed"
                );
                let message = field
                    .messages
                    .validators
                    .get(REMOTE)
                    .cloned()
                    .unwrap_or(failure.reason);
                Some(if message.is_empty() {
                    self.fallback.clone()
                } else {
                    message
                })
            }
        }
    }
}
