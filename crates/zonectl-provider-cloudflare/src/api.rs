//! Cloudflare API v4 client
//!
//! A typed wrapper over the handful of endpoints the adapter needs. Every
//! response arrives in the v4 envelope `{success, errors, result,
//! result_info}`; list endpoints are paginated by `page` / `per_page`.
//!
//! HTTP 429 is retried here, honouring `Retry-After` up to a cap (the HTTP
//! timeout when built by the provider). Every other failure is mapped to a
//! core error and returned.

use crate::CLOUDFLARE_TYPE;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use zonectl_core::{Error, Result};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const PER_PAGE: u32 = 100;

/// Retries of a rate-limited request before giving up
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Wait applied when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Longest `Retry-After` honoured unless the client is given another cap
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

/// A zone as listed by the API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    /// Nameservers Cloudflare assigned to the zone
    #[serde(default)]
    pub name_servers: Vec<String>,
}

/// A DNS record as read from or written to the API
///
/// `content` carries the presentation value for simple types; SRV and CAA
/// use the structured `data` object and MX keeps its preference in
/// `priority`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// `1` means automatic
    pub ttl: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Authenticated API client
#[derive(Clone)]
pub struct CloudflareApi {
    client: Client,
    base_url: String,
    /// ⚠️ NEVER log this value
    api_token: String,
    max_retry_wait: Duration,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .field("max_retry_wait", &self.max_retry_wait)
            .finish()
    }
}

impl CloudflareApi {
    pub fn new(client: Client, base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            max_retry_wait: MAX_RETRY_AFTER,
        }
    }

    /// Cap the wait a `Retry-After` header can impose
    pub fn with_max_retry_wait(mut self, cap: Duration) -> Self {
        self.max_retry_wait = cap;
        self
    }

    /// The same client and token against another endpoint
    pub(crate) fn rebased(&self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    /// Every zone visible to the token
    pub async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.paginate("/zones").await
    }

    /// The zone called `name`, if the token can see it
    pub async fn zone_by_name(&self, name: &str) -> Result<Option<Zone>> {
        let (zones, _) = self
            .send::<Vec<Zone>>(Method::GET, "/zones", &[("name", name.to_string())], None)
            .await?;
        Ok(zones.into_iter().find(|z| z.name.eq_ignore_ascii_case(name)))
    }

    /// Create a full-setup zone in `account_id`
    pub async fn create_zone(&self, name: &str, account_id: &str) -> Result<Zone> {
        let body = json!({
            "name": name,
            "account": { "id": account_id },
            "type": "full",
        });
        let (zone, _) = self.send(Method::POST, "/zones", &[], Some(body)).await?;
        Ok(zone)
    }

    /// Every record of a zone
    pub async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.paginate(&format!("/zones/{zone_id}/dns_records")).await
    }

    pub async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord> {
        let body = serde_json::to_value(record)?;
        let path = format!("/zones/{zone_id}/dns_records");
        let (created, _) = self.send(Method::POST, &path, &[], Some(body)).await?;
        Ok(created)
    }

    pub async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord> {
        let body = serde_json::to_value(record)?;
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        let (updated, _) = self.send(Method::PUT, &path, &[], Some(body)).await?;
        Ok(updated)
    }

    pub async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        self.send::<Value>(Method::DELETE, &path, &[], None).await?;
        Ok(())
    }

    async fn paginate<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut page = 1;
        loop {
            let query = [("page", page.to_string()), ("per_page", PER_PAGE.to_string())];
            let (items, info) = self.send::<Vec<T>>(Method::GET, path, &query, None).await?;
            out.extend(items);
            match info {
                Some(info) if info.page < info.total_pages => page = info.page + 1,
                _ => break,
            }
        }
        Ok(out)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<(T, Option<ResultInfo>)> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0;
        let response = loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.api_token);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("{method} {path}: {e}"))
                } else {
                    Error::http(format!("{method} {path}: {e}"))
                }
            })?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RATE_LIMIT_RETRIES {
                attempt += 1;
                let wait = retry_wait(
                    response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
                    self.max_retry_wait,
                );
                warn!(%method, path, attempt, wait_ms = wait.as_millis() as u64, "Cloudflare rate limit, retrying");
                tokio::time::sleep(wait).await;
                continue;
            }
            break response;
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &method, path, &error_text));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider(CLOUDFLARE_TYPE, format!("{method} {path}: failed to parse response: {e}"))
        })?;
        if !envelope.success {
            return Err(Error::provider(
                CLOUDFLARE_TYPE,
                format!("{method} {path}: {}", describe(&envelope.errors)),
            ));
        }
        let result = envelope.result.ok_or_else(|| {
            Error::provider(CLOUDFLARE_TYPE, format!("{method} {path}: response has no result"))
        })?;
        debug!(%method, path, "Cloudflare request succeeded");
        Ok((result, envelope.result_info))
    }
}

/// Wait before retrying a 429, from its `Retry-After` seconds, never above `cap`
fn retry_wait(header: Option<&str>, cap: Duration) -> Duration {
    header
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
        .min(cap)
}

/// Map a non-success HTTP status to a core error
fn status_error(status: StatusCode, method: &Method, path: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{CLOUDFLARE_TYPE}: invalid API token or insufficient permissions ({status})"
        )),
        404 => Error::not_found(format!("{method} {path}")),
        429 => Error::rate_limited(format!(
            "{method} {path}: still limited after {MAX_RATE_LIMIT_RETRIES} retries"
        )),
        500..=599 => Error::http(format!(
            "{method} {path}: Cloudflare server error (transient): {status} - {body}"
        )),
        _ => Error::provider(CLOUDFLARE_TYPE, format!("{method} {path}: {status} - {body}")),
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request failed without an error message".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}
