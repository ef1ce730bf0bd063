//! ZAP JSON API client implementation

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{Alert, ReportFormat, ScannerApi, parse_progress};
use crate::error::{ApiError, Result};

/// Per-request timeout; report generation on large sessions is the slow path
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client for the ZAP API at `{base_url}/JSON/...` and `{base_url}/OTHER/...`
pub struct ZapClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

/// Error body returned by ZAP for rejected calls
#[derive(Debug, Deserialize)]
struct ZapErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Body of every `*/action/*` call
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(rename = "Result")]
    result: String,
}

impl ZapClient {
    /// Create a new ZAP API client
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Base URL of the API, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET against `path`, appending the API key, and check the status
    async fn send(&self, path: &str, params: &[(&str, String)]) -> Result<Response> {
        debug!(
            "GET {} {:?}",
            path,
            params.iter().map(|(k, _)| *k).collect::<Vec<_>>()
        );

        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if let Some(ref key) = self.api_key {
            query.push(("apikey", key.as_str()));
        }

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(ApiError::from)?;

        check_status(path, response).await
    }

    /// Call `JSON/{component}/view/{name}` and decode the body
    async fn view<T: DeserializeOwned>(
        &self,
        component: &str,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let path = format!("/JSON/{}/view/{}/", component, name);
        let response = self.send(&path, params).await?;
        let data = response.json::<T>().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", path, e))
        })?;
        Ok(data)
    }

    /// Call `JSON/{component}/action/{name}` and decode the body
    async fn action_with<T: DeserializeOwned>(
        &self,
        component: &str,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let path = format!("/JSON/{}/action/{}/", component, name);
        let response = self.send(&path, params).await?;
        let data = response.json::<T>().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", path, e))
        })?;
        Ok(data)
    }

    /// Call an action that answers `{"Result": "OK"}`
    async fn action(&self, component: &str, name: &str, params: &[(&str, String)]) -> Result<()> {
        let response: ActionResponse = self.action_with(component, name, params).await?;
        if response.result != "OK" {
            return Err(ApiError::InvalidResponse(format!(
                "{}/{} answered {:?}",
                component, name, response.result
            ))
            .into());
        }
        Ok(())
    }
}

/// Map a non-success status (and ZAP's error body) to an `ApiError`
async fn check_status(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ZapErrorBody>(&text).ok();

    if let Some(ref body) = body {
        if body.code == "bad_api_key" {
            return Err(ApiError::Unauthorized.into());
        }
    }

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        status if status.is_server_error() => ApiError::ServerError(match body {
            Some(body) => body.message,
            None if text.is_empty() => format!("Server error: {}", status),
            None => text,
        }),
        status if status.is_client_error() => match body {
            Some(body) => ApiError::BadRequest {
                code: body.code,
                message: body.message,
            },
            None => ApiError::BadRequest {
                code: status.as_u16().to_string(),
                message: text,
            },
        },
        _ => ApiError::InvalidResponse(format!("Unexpected status code: {}", status)),
    };
    Err(err.into())
}

/// Flatten a raw alert object; non-string values keep their JSON text
fn flatten_alert(raw: BTreeMap<String, serde_json::Value>) -> Alert {
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

#[async_trait]
impl ScannerApi for ZapClient {
    async fn version(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct VersionResponse {
            version: String,
        }

        let response: VersionResponse = self.view("core", "version", &[]).await?;
        Ok(response.version)
    }

    async fn access_url(&self, url: &str) -> Result<()> {
        // Answers with the messages exchanged, not {"Result": "OK"}; only the
        // status matters
        self.send(
            "/JSON/core/action/accessUrl/",
            &[("url", url.to_string()), ("followRedirects", "true".to_string())],
        )
        .await?;
        Ok(())
    }

    async fn delete_all_alerts(&self) -> Result<()> {
        self.action("core", "deleteAllAlerts", &[]).await
    }

    async fn new_session(&self, name: &str, overwrite: bool) -> Result<()> {
        self.action(
            "core",
            "newSession",
            &[("name", name.to_string()), ("overwrite", overwrite.to_string())],
        )
        .await
    }

    async fn spider_set_scope(&self, scope: &str) -> Result<()> {
        self.action(
            "spider",
            "setOptionScopeString",
            &[("String", scope.to_string())],
        )
        .await
    }

    async fn spider_set_max_depth(&self, depth: u32) -> Result<()> {
        self.action(
            "spider",
            "setOptionMaxDepth",
            &[("Integer", depth.to_string())],
        )
        .await
    }

    async fn spider_set_thread_count(&self, threads: u32) -> Result<()> {
        self.action(
            "spider",
            "setOptionThreadCount",
            &[("Integer", threads.to_string())],
        )
        .await
    }

    async fn spider_scan(&self, url: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ScanResponse {
            scan: String,
        }

        let response: ScanResponse = self
            .action_with("spider", "scan", &[("url", url.to_string())])
            .await?;
        Ok(response.scan)
    }

    async fn spider_status(&self, scan_id: &str) -> Result<u8> {
        #[derive(Deserialize)]
        struct StatusResponse {
            status: String,
        }

        let response: StatusResponse = self
            .view("spider", "status", &[("scanId", scan_id.to_string())])
            .await?;
        Ok(parse_progress(&response.status)?)
    }

    async fn active_scan(&self, url: &str, recurse: bool) -> Result<String> {
        #[derive(Deserialize)]
        struct ScanResponse {
            scan: String,
        }

        let response: ScanResponse = self
            .action_with(
                "ascan",
                "scan",
                &[("url", url.to_string()), ("recurse", recurse.to_string())],
            )
            .await?;
        Ok(response.scan)
    }

    async fn active_scan_status(&self, scan_id: &str) -> Result<u8> {
        #[derive(Deserialize)]
        struct StatusResponse {
            status: String,
        }

        let response: StatusResponse = self
            .view("ascan", "status", &[("scanId", scan_id.to_string())])
            .await?;
        Ok(parse_progress(&response.status)?)
    }

    async fn hosts(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct HostsResponse {
            hosts: Vec<String>,
        }

        let response: HostsResponse = self.view("core", "hosts", &[]).await?;
        Ok(response.hosts)
    }

    async fn alerts(&self) -> Result<Vec<Alert>> {
        #[derive(Deserialize)]
        struct AlertsResponse {
            alerts: Vec<BTreeMap<String, serde_json::Value>>,
        }

        let response: AlertsResponse = self.view("core", "alerts", &[]).await?;
        Ok(response.alerts.into_iter().map(flatten_alert).collect())
    }

    async fn report(&self, format: ReportFormat) -> Result<Vec<u8>> {
        let path = format!("/OTHER/core/other/{}/", format.endpoint());
        let response = self.send(&path, &[]).await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        Ok(bytes.to_vec())
    }

    async fn shutdown(&self) -> Result<()> {
        self.action("core", "shutdown", &[]).await
    }
}
