//! HTTP client for the Pipedrive-style project API
//!
//! All endpoints wrap their payload in a `{ success, data }` envelope and
//! authenticate via an `api_token` query parameter. List endpoints may
//! return `data: null` for an empty result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::{RawBoard, RawContact, RawPhase, RawRecord};
use super::{CrmApi, CrmError};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

/// Live CRM client
pub struct HttpCrm {
    client: Client,
    base_url: String,
    api_token: String,
    /// Custom contact field holding the primary address, when the
    /// deployment defines one
    address_field_key: Option<String>,
}

impl HttpCrm {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        address_field_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CrmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrmError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            address_field_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, CrmError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .query(&[("api_token", self.api_token.as_str())])
            .send()
            .await
            .map_err(|e| map_reqwest(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Api(format!("{path} returned HTTP {status}")));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| CrmError::Payload(format!("{path}: {e}")))?;

        if envelope.success == Some(false) {
            let detail = envelope.error.unwrap_or_else(|| "unspecified".to_string());
            return Err(CrmError::Api(format!("{path} rejected: {detail}")));
        }

        Ok(envelope.data)
    }

    async fn put(&self, path: &str, body: serde_json::Value) -> Result<(), CrmError> {
        let response = self
            .client
            .put(self.url(path))
            .query(&[("api_token", self.api_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Api(format!("{path} returned HTTP {status}")));
        }

        Ok(())
    }
}

fn map_reqwest(path: &str, error: reqwest::Error) -> CrmError {
    if error.is_timeout() {
        CrmError::Timeout(path.to_string())
    } else {
        CrmError::Transport(format!("{path}: {error}"))
    }
}

#[async_trait]
impl CrmApi for HttpCrm {
    async fn list_boards(&self) -> Result<Vec<RawBoard>, CrmError> {
        Ok(self
            .get_data("projects/boards", &[])
            .await?
            .unwrap_or_default())
    }

    async fn list_phases(&self, board_id: u64) -> Result<Vec<RawPhase>, CrmError> {
        Ok(self
            .get_data("projects/phases", &[("board_id", board_id.to_string())])
            .await?
            .unwrap_or_default())
    }

    async fn list_open_records(&self, limit: u32) -> Result<Vec<RawRecord>, CrmError> {
        Ok(self
            .get_data(
                "projects",
                &[
                    ("status", "open".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?
            .unwrap_or_default())
    }

    async fn get_contact(&self, id: u64) -> Result<RawContact, CrmError> {
        let path = format!("persons/{id}");
        self.get_data(&path, &[])
            .await?
            .ok_or_else(|| CrmError::Payload(format!("{path}: missing data")))
    }

    async fn update_contact_address(&self, id: u64, address: &str) -> Result<(), CrmError> {
        let key = self
            .address_field_key
            .as_deref()
            .unwrap_or("postal_address");
        self.put(
            &format!("persons/{id}"),
            serde_json::json!({ key: address }),
        )
        .await
    }

    async fn update_record_phase(&self, record_id: u64, phase_id: u64) -> Result<(), CrmError> {
        self.put(
            &format!("projects/{record_id}"),
            serde_json::json!({ "phase_id": phase_id }),
        )
        .await
    }
}
