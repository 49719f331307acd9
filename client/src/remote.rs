//! Remote record service transport.
//!
//! The sync engine's only external dependency: a generic record-mutation
//! HTTP contract plus a health probe. [`RemoteStore`] keeps the engine
//! injectable (tests script failures without a network); [`HttpRemote`] is
//! the real reqwest-backed implementation.

use std::future::Future;
use std::time::Duration;

use medisync_engine::StoreName;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One replay attempt's failure, recorded verbatim as the operation's
/// `last_error`. Both variants count identically against the retry
/// ceiling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// No response received at all
    #[error("network error: {0}")]
    Network(String),

    /// Response received, but a non-success status or failure envelope
    #[error("remote rejected: {0}")]
    Rejected(String),
}

/// The remote side of replay: one request per operation, no batching.
pub trait RemoteStore: Send + Sync + 'static {
    /// Replay a CREATE for `entity_id` carrying the full record.
    fn create(
        &self,
        store: StoreName,
        entity_id: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = std::result::Result<(), RemoteError>> + Send;

    /// Replay an UPDATE for `entity_id`.
    fn update(
        &self,
        store: StoreName,
        entity_id: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = std::result::Result<(), RemoteError>> + Send;

    /// Replay a DELETE for `entity_id`; no body travels with it.
    fn delete(
        &self,
        store: StoreName,
        entity_id: &str,
    ) -> impl Future<Output = std::result::Result<(), RemoteError>> + Send;

    /// Lightweight reachability probe, used by the scheduler before a
    /// pass so a known outage does not burn retry counts.
    fn health(&self) -> impl Future<Output = bool> + Send;
}

/// Mutation request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationBody<'a> {
    entity_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    data: &'a serde_json::Value,
}

/// Success/failure envelope every mutation endpoint answers with.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP implementation of [`RemoteStore`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    /// Build a transport for `base_url` with a per-call deadline.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn store_url(&self, store: StoreName) -> String {
        format!("{}/api/{}", self.base_url, store)
    }

    fn entity_url(&self, store: StoreName, entity_id: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, store, entity_id)
    }

    /// Classify a response: transport failures are [`RemoteError::Network`],
    /// anything the remote actually said is [`RemoteError::Rejected`].
    async fn check(
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> std::result::Result<(), RemoteError> {
        let response = response.map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Rejected(format!("HTTP {status}")));
        }

        let envelope: ResponseEnvelope = response
            .json()
            .await
            .map_err(|e| RemoteError::Rejected(format!("invalid response envelope: {e}")))?;

        if envelope.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected(
                envelope.error.unwrap_or_else(|| "unspecified error".to_string()),
            ))
        }
    }
}

impl RemoteStore for HttpRemote {
    async fn create(
        &self,
        store: StoreName,
        entity_id: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<(), RemoteError> {
        tracing::debug!(store = %store, entity_id = %entity_id, "remote create");
        let body = MutationBody {
            entity_type: store.as_str(),
            id: None,
            data: payload,
        };
        let response = self.client.post(self.store_url(store)).json(&body).send().await;
        Self::check(response).await
    }

    async fn update(
        &self,
        store: StoreName,
        entity_id: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<(), RemoteError> {
        tracing::debug!(store = %store, entity_id = %entity_id, "remote update");
        let body = MutationBody {
            entity_type: store.as_str(),
            id: Some(entity_id),
            data: payload,
        };
        let response = self
            .client
            .put(self.entity_url(store, entity_id))
            .json(&body)
            .send()
            .await;
        Self::check(response).await
    }

    async fn delete(
        &self,
        store: StoreName,
        entity_id: &str,
    ) -> std::result::Result<(), RemoteError> {
        tracing::debug!(store = %store, entity_id = %entity_id, "remote delete");
        let response = self
            .client
            .delete(self.entity_url(store, entity_id))
            .send()
            .await;
        Self::check(response).await
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mutation_body_serialization() {
        let data = json!({"id": "p1", "name": "Jane"});
        let body = MutationBody {
            entity_type: "patients",
            id: Some("p1"),
            data: &data,
        };

        let encoded = serde_json::to_string(&body).unwrap();
        assert!(encoded.contains("\"entityType\":\"patients\"")); // camelCase
        assert!(encoded.contains("\"id\":\"p1\""));
    }

    #[test]
    fn mutation_body_omits_absent_id() {
        let data = json!({"id": "p1"});
        let body = MutationBody {
            entity_type: "patients",
            id: None,
            data: &data,
        };

        let encoded = serde_json::to_string(&body).unwrap();
        assert!(!encoded.contains("\"id\":null"));
    }

    #[test]
    fn envelope_deserialization() {
        let ok: ResponseEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed: ResponseEnvelope =
            serde_json::from_str(r#"{"success": false, "error": "bad payload"}"#).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("bad payload"));
    }

    #[test]
    fn urls_are_normalized() {
        let remote = HttpRemote::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.store_url(StoreName::Patients), "http://localhost:3000/api/patients");
        assert_eq!(
            remote.entity_url(StoreName::LabResults, "lr_1"),
            "http://localhost:3000/api/lab_results/lr_1"
        );
    }
}
