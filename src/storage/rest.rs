//! Remote sensor store over a PostgREST endpoint (e.g. Supabase).
//!
//! Reads `GET {url}/rest/v1/{table}` ordered by `created_at` descending and
//! inserts with `Prefer: return=representation` so the stored row (with its
//! server-assigned id and timestamp) comes back in the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};

use super::{NewReading, SensorStore, StorageError, StoredReading};
use crate::config::RestStoreConfig;

/// Columns selected from the readings table.
const SELECT_COLUMNS: &str = "id,nitrogen,phosphorus,potassium,created_at";

pub struct RestSensorStore {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl RestSensorStore {
    pub fn new(config: &RestStoreConfig) -> Result<Self, StorageError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                StorageError::NotConfigured("storage.rest.url (or SUPABASE_URL) is not set".to_string())
            })?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                StorageError::NotConfigured(
                    "storage.rest.api_key (or SUPABASE_ANON_KEY) is not set".to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            table_url: table_url(url, &config.table),
            api_key,
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

fn table_url(base: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base.trim().trim_end_matches('/'), table)
}

/// Turn non-2xx responses into `StorageError::RemoteStatus`.
async fn check_status(resp: Response) -> Result<Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StorageError::RemoteStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SensorStore for RestSensorStore {
    async fn append(&self, reading: NewReading) -> Result<StoredReading, StorageError> {
        let resp = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&reading)
            .send()
            .await?;
        let rows: Vec<StoredReading> = check_status(resp).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::Remote("insert returned no rows".to_string()))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        let limit = limit.to_string();
        let resp = self
            .request(Method::GET)
            .query(&[
                ("select", SELECT_COLUMNS),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}
