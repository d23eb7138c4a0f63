//! Async client for the Tableau REST and VizQL Data Service endpoints.
//!
//! Covers the four calls this tool needs: sign-in, datasource listing
//! (paginated), field metadata, and query execution, plus the
//! single-field probe behind categorical filter values. Requests that
//! come back 401 invalidate the credential cache and are retried a
//! bounded number of times with a fixed delay before failing.

use crate::TabvuError;
use crate::credentials::{AuthToken, CredentialCache, TokenSource};
use crate::model::{Datasource, FieldRef, FieldType, Record};
use crate::request::{self, QueryRequest};
use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use diagnostics::*;
use reqwest::{Method, StatusCode, header};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT_SECONDS: u64 = 60;
const REST_API_VERSION: &str = "3.25";
const DATASOURCE_PAGE_SIZE: usize = 100;

/// Total tries for a request that keeps being rejected as
/// unauthenticated, including the first.
const AUTH_RETRY_ATTEMPTS: usize = 3;
const AUTH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Connection settings for one Tableau site.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Base server URL, e.g. `https://example.online.tableau.com`.
    pub server_url: String,
    /// The site's content URL; empty string for the default site.
    pub site_content_url: String,
    pub token_name: String,
    pub token_secret: String,
}

/// Signs in with a personal access token. Implements [`TokenSource`]
/// so the credential cache can pull fresh tokens on demand.
pub struct Authenticator {
    http: reqwest::Client,
    connection: Connection,
}

#[async_trait]
impl TokenSource for Authenticator {
    async fn sign_in(&self) -> Result<AuthToken, TabvuError> {
        let url = signin_url(&self.connection.server_url);
        let payload = json!({
            "credentials": {
                "personalAccessTokenName": self.connection.token_name,
                "personalAccessTokenSecret": self.connection.token_secret,
                "site": { "contentUrl": self.connection.site_content_url },
            }
        });

        let response = self
            .http
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TabvuError::Auth(format!(
                "sign-in rejected with HTTP {status}: {text}"
            )));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            TabvuError::MalformedResponse(format!("sign-in response is not JSON: {e}"))
        })?;
        let credentials = &body["credentials"];
        let token = credentials
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TabvuError::MalformedResponse("sign-in response has no credentials.token".into())
            })?;
        let site_id = credentials
            .get("site")
            .and_then(|s| s.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TabvuError::MalformedResponse("sign-in response has no credentials.site.id".into())
            })?;

        Ok(AuthToken {
            token: token.to_string(),
            site_id: site_id.to_string(),
        })
    }
}

/// Async API client for one Tableau site.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    server_url: String,
    credentials: Arc<CredentialCache>,
}

impl Client {
    pub fn new(connection: Connection) -> Result<Self, TabvuError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECONDS))
            .build()?;
        let server_url = connection.server_url.clone();
        let authenticator = Authenticator {
            http: http.clone(),
            connection,
        };
        let credentials = CredentialCache::new(Arc::new(authenticator));
        Ok(Self {
            http,
            server_url,
            credentials,
        })
    }

    /// The shared credential cache, e.g. for spawning the refresh timer.
    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Fetch every page of the site's datasource listing and return the
    /// aggregate, sorted by name.
    pub async fn list_datasources(&self) -> Result<Vec<Datasource>, TabvuError> {
        let mut all = Vec::new();
        let mut page_number = 1;
        loop {
            let auth = self.credentials.get_valid().await?;
            let url = datasources_url(
                &self.server_url,
                &auth.site_id,
                DATASOURCE_PAGE_SIZE,
                page_number,
            );
            let body = self.authorized_json(Method::GET, &url, None).await?;

            let page: Vec<Datasource> = body
                .get("datasources")
                .and_then(|d| d.get("datasource"))
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter_map(|row| {
                            let name = row.get("name")?.as_str()?;
                            let luid = row.get("id")?.as_str()?;
                            Some(Datasource {
                                name: name.to_string(),
                                luid: luid.to_string(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            let page_len = page.len();
            all.extend(page);

            let total = body
                .get("pagination")
                .and_then(|p| p.get("totalAvailable"))
                .and_then(count_value);
            let fetched = all.len();
            debug!("datasource page {page_number}: {page_len} rows, {fetched} fetched");

            match total {
                Some(total) if fetched < total && page_len > 0 => page_number += 1,
                _ => break,
            }
        }

        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(all)
    }

    /// Fetch a datasource's field metadata, classified into dimensions
    /// and measures. Rows with data types this client does not handle
    /// are skipped.
    pub async fn read_metadata(&self, datasource_luid: &str) -> Result<Vec<FieldRef>, TabvuError> {
        let url = metadata_url(&self.server_url);
        let payload = json!({ "datasource": { "datasourceLuid": datasource_luid } });
        let body = self
            .authorized_json(Method::POST, &url, Some(&payload))
            .await?;

        let rows = body.get("data").and_then(Value::as_array).ok_or_else(|| {
            TabvuError::MalformedResponse("metadata response has no data array".into())
        })?;

        let mut fields = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(name) = row.get("fieldName").and_then(Value::as_str) else {
                continue;
            };
            let Some(raw_type) = row.get("dataType").and_then(Value::as_str) else {
                continue;
            };
            match FieldType::parse(raw_type) {
                Some(data_type) => fields.push(FieldRef::new(name, data_type)),
                None => {
                    debug!("skipping field {name} with unhandled type {raw_type}");
                }
            }
        }
        Ok(fields)
    }

    /// Execute a query payload and return its result records.
    pub async fn query_datasource(&self, request: &QueryRequest) -> Result<Vec<Record>, TabvuError> {
        let url = query_url(&self.server_url);
        let body = self
            .authorized_json(Method::POST, &url, Some(&request.payload))
            .await?;

        let rows = body.get("data").and_then(Value::as_array).ok_or_else(|| {
            TabvuError::MalformedResponse("query response has no data array".into())
        })?;
        rows.iter()
            .map(|row| {
                row.as_object().cloned().ok_or_else(|| {
                    TabvuError::MalformedResponse("query result row is not an object".into())
                })
            })
            .collect()
    }

    /// Probe the distinct values of one field, for populating a
    /// categorical filter. Fetched live on demand; results are not
    /// cached across sessions.
    pub async fn fetch_distinct_values(
        &self,
        datasource_luid: &str,
        field_caption: &str,
    ) -> Result<Vec<String>, TabvuError> {
        let url = query_url(&self.server_url);
        let payload = request::distinct_values_payload(datasource_luid, field_caption);
        let body = self
            .authorized_json(Method::POST, &url, Some(&payload))
            .await?;

        let rows = body.get("data").and_then(Value::as_array).ok_or_else(|| {
            TabvuError::MalformedResponse("query response has no data array".into())
        })?;
        let mut distinct = BTreeSet::new();
        for row in rows {
            match row.get(field_caption) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => {
                    distinct.insert(s.clone());
                }
                Some(other) => {
                    distinct.insert(other.to_string());
                }
            }
        }
        Ok(distinct.into_iter().collect())
    }

    /// Send an authenticated request and parse the JSON body. A 401
    /// invalidates the cached credential and the request is retried
    /// with a fresh sign-in, up to the bounded attempt count.
    async fn authorized_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, TabvuError> {
        let attempt = || async {
            let auth = self.credentials.get_valid().await?;
            let mut request = self
                .http
                .request(method.clone(), url)
                .header("X-Tableau-Auth", &auth.token)
                .header(header::ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status == StatusCode::UNAUTHORIZED {
                self.credentials.invalidate().await;
                return Err(TabvuError::Auth(format!(
                    "request to {url} was rejected as unauthenticated"
                )));
            }
            if !status.is_success() {
                return Err(TabvuError::Http {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body: text,
                });
            }

            serde_json::from_str(&text).map_err(|e| {
                TabvuError::MalformedResponse(format!("response from {url} is not JSON: {e}"))
            })
        };

        attempt
            .retry(
                ConstantBuilder::default()
                    .with_delay(AUTH_RETRY_DELAY)
                    .with_max_times(AUTH_RETRY_ATTEMPTS - 1),
            )
            .when(TabvuError::is_auth)
            .notify(|_err: &TabvuError, _dur: Duration| {
                warn!("request rejected as unauthenticated, signing in again");
            })
            .await
    }
}

/// The seam scheduled runs and the foreground worker depend on, so
/// tests can substitute a fake gateway.
#[async_trait]
pub trait QueryGateway: Send + Sync {
    async fn query_datasource(&self, request: &QueryRequest) -> Result<Vec<Record>, TabvuError>;
}

#[async_trait]
impl QueryGateway for Client {
    async fn query_datasource(&self, request: &QueryRequest) -> Result<Vec<Record>, TabvuError> {
        Client::query_datasource(self, request).await
    }
}

// URL construction helpers

fn combine(server_url: &str, path: &str) -> String {
    format!("{}/api/{}", server_url.trim_end_matches('/'), path)
}

fn signin_url(server_url: &str) -> String {
    combine(server_url, &format!("{REST_API_VERSION}/auth/signin"))
}

fn datasources_url(server_url: &str, site_id: &str, page_size: usize, page_number: usize) -> String {
    combine(
        server_url,
        &format!(
            "{REST_API_VERSION}/sites/{site_id}/datasources?pageSize={page_size}&pageNumber={page_number}"
        ),
    )
}

fn metadata_url(server_url: &str) -> String {
    combine(server_url, "v1/vizql-data-service/read-metadata")
}

fn query_url(server_url: &str) -> String {
    combine(server_url, "v1/vizql-data-service/query-datasource")
}

/// REST pagination counts arrive as strings in the JSON rendition;
/// accept both.
fn count_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        assert_eq!(
            signin_url("https://example.online.tableau.com"),
            "https://example.online.tableau.com/api/3.25/auth/signin"
        );
        assert_eq!(
            signin_url("https://example.online.tableau.com/"),
            "https://example.online.tableau.com/api/3.25/auth/signin"
        );
        assert_eq!(
            datasources_url("https://example.online.tableau.com", "site-1", 100, 2),
            "https://example.online.tableau.com/api/3.25/sites/site-1/datasources?pageSize=100&pageNumber=2"
        );
        assert_eq!(
            metadata_url("https://example.online.tableau.com"),
            "https://example.online.tableau.com/api/v1/vizql-data-service/read-metadata"
        );
        assert_eq!(
            query_url("https://example.online.tableau.com"),
            "https://example.online.tableau.com/api/v1/vizql-data-service/query-datasource"
        );
    }

    #[test]
    fn test_count_value_accepts_strings_and_numbers() {
        assert_eq!(count_value(&json!(42)), Some(42));
        assert_eq!(count_value(&json!("142")), Some(142));
        assert_eq!(count_value(&json!("not a number")), None);
        assert_eq!(count_value(&json!(null)), None);
    }
}
