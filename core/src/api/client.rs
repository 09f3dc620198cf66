//! Multi-endpoint API client
//!
//! Both operations race every configured endpoint and take the first
//! success. Losing attempts are abandoned, not cancelled: they run out
//! their own timeout and their result is discarded. A fetch that fails
//! everywhere degrades to "no timeline for this zone"; an upload that
//! fails everywhere is reported false and otherwise forgotten.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;

use crate::config::ApiConfig;
use crate::duty::DutyDescriptor;

use super::error::ApiError;
use super::payload::FightRecord;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
const OVERALL_TIMEOUT: Duration = Duration::from_secs(5);
const AUTH_HEADER: &str = "X-Auth-Key";

pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    auth_key: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(OVERALL_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
            auth_key: config.auth_key.clone(),
        })
    }

    /// Fetch the duty descriptor for a zone. `None` covers both "zone has
    /// no timeline" and "every endpoint failed or timed out".
    pub async fn fetch_duty(&self, zone_id: u32) -> Option<DutyDescriptor> {
        let (tx, mut rx) = mpsc::channel(self.endpoints.len().max(1));

        for endpoint in &self.endpoints {
            let url = format!("{}/duty/{zone_id}", endpoint.trim_end_matches('/'));
            let http = self.http.clone();
            let auth_key = self.auth_key.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = fetch_attempt(http, auth_key, &url).await;
                let _ = tx.send((url, result)).await;
            });
        }
        drop(tx);

        let winner = tokio::time::timeout(OVERALL_TIMEOUT, async {
            while let Some((url, result)) = rx.recv().await {
                match result {
                    Ok(descriptor) => {
                        tracing::debug!(%url, zone_id, "duty descriptor fetched");
                        return Some(descriptor);
                    }
                    Err(error) => {
                        tracing::warn!(%url, zone_id, %error, "descriptor fetch attempt failed");
                    }
                }
            }
            None
        })
        .await;

        winner.unwrap_or(None)
    }

    /// Upload a finalized fight record. True once any endpoint accepts it.
    pub async fn upload_fight(&self, record: &FightRecord) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "fight record serialization failed");
                return false;
            }
        };
        tracing::debug!(zone_id = record.zone_id, "uploading fight record");

        let (tx, mut rx) = mpsc::channel(self.endpoints.len().max(1));

        for endpoint in &self.endpoints {
            let url = format!("{}/fight", endpoint.trim_end_matches('/'));
            let http = self.http.clone();
            let auth_key = self.auth_key.clone();
            let payload = payload.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = upload_attempt(http, auth_key, &url, payload).await;
                let _ = tx.send((url, result)).await;
            });
        }
        drop(tx);

        let winner = tokio::time::timeout(OVERALL_TIMEOUT, async {
            while let Some((url, result)) = rx.recv().await {
                match result {
                    Ok(()) => {
                        tracing::info!(%url, "fight record uploaded");
                        return true;
                    }
                    Err(error) => {
                        tracing::warn!(%url, %error, "fight record upload attempt failed");
                    }
                }
            }
            false
        })
        .await;

        winner.unwrap_or(false)
    }
}

async fn fetch_attempt(
    http: reqwest::Client,
    auth_key: String,
    url: &str,
) -> Result<DutyDescriptor, ApiError> {
    let mut request = http.get(url).timeout(ATTEMPT_TIMEOUT);
    if !auth_key.is_empty() {
        request = request.header(AUTH_HEADER, auth_key);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.json().await?)
}

async fn upload_attempt(
    http: reqwest::Client,
    auth_key: String,
    url: &str,
    payload: String,
) -> Result<(), ApiError> {
    let mut request = http
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(payload)
        .timeout(ATTEMPT_TIMEOUT);
    if !auth_key.is_empty() {
        request = request.header(AUTH_HEADER, auth_key);
    }

    let response = request.send().await?;
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        status => Err(ApiError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        }),
    }
}
