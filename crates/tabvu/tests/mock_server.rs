use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::Filter;

/// Mock Tableau server for testing: sign-in, paginated datasource
/// listing, metadata, and query execution, with bearer-style token
/// checking so re-authentication paths can be exercised.
pub struct MockTableauServer {
    port: u16,
    state: Arc<Mutex<ServerState>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

pub struct ServerState {
    /// Tokens handed out by sign-in, in order.
    pub issued_tokens: Vec<String>,
    /// Tokens currently accepted by the authenticated endpoints.
    pub valid_tokens: HashSet<String>,
    /// (name, luid) pairs served by the datasource listing.
    pub datasources: Vec<(String, String)>,
    /// Body served by read-metadata.
    pub metadata: Value,
    /// Body served by query-datasource.
    pub query_result: Value,
    /// The last payload query-datasource received.
    pub last_query_payload: Option<Value>,
}

const PAGE_SIZE_DEFAULT: usize = 100;

impl MockTableauServer {
    pub fn new(datasources: Vec<(String, String)>, metadata: Value, query_result: Value) -> Self {
        let state = ServerState {
            issued_tokens: Vec::new(),
            valid_tokens: HashSet::new(),
            datasources,
            metadata,
            query_result,
            last_query_payload: None,
        };
        MockTableauServer {
            port: 0,
            state: Arc::new(Mutex::new(state)),
            server_handle: None,
        }
    }

    /// Start the mock server and return its base URL.
    pub async fn start(&mut self) -> String {
        let state = self.state.clone();

        // Sign-in endpoint: issues a fresh token every call
        let state_signin = state.clone();
        let sign_in = warp::path!("api" / "3.25" / "auth" / "signin")
            .and(warp::post())
            .and_then(move || {
                let state = state_signin.clone();
                async move {
                    let mut state = state.lock().await;
                    let token = format!("token-{}", state.issued_tokens.len() + 1);
                    state.issued_tokens.push(token.clone());
                    state.valid_tokens.insert(token.clone());
                    Ok::<_, warp::Rejection>(warp::reply::json(&json!({
                        "credentials": {
                            "site": { "id": "site-1", "contentUrl": "" },
                            "user": { "id": "user-1" },
                            "token": token,
                        }
                    })))
                }
            });

        // Paginated datasource listing
        let state_list = state.clone();
        let datasources = warp::path!("api" / "3.25" / "sites" / String / "datasources")
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::header::optional::<String>("x-tableau-auth"))
            .and_then(move |_site: String, params: HashMap<String, String>, auth: Option<String>| {
                let state = state_list.clone();
                async move {
                    let state = state.lock().await;
                    check_auth(&state, auth.as_deref())?;

                    let page_size = params
                        .get("pageSize")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(PAGE_SIZE_DEFAULT);
                    let page_number: usize = params
                        .get("pageNumber")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(1);

                    let start = (page_number - 1) * page_size;
                    let page: Vec<Value> = state
                        .datasources
                        .iter()
                        .skip(start)
                        .take(page_size)
                        .map(|(name, luid)| json!({ "id": luid, "name": name }))
                        .collect();

                    Ok::<_, warp::Rejection>(warp::reply::json(&json!({
                        "pagination": {
                            "pageNumber": page_number.to_string(),
                            "pageSize": page_size.to_string(),
                            // the REST API renders counts as strings
                            "totalAvailable": state.datasources.len().to_string(),
                        },
                        "datasources": { "datasource": page },
                    })))
                }
            });

        // Field metadata
        let state_meta = state.clone();
        let metadata = warp::path!("api" / "v1" / "vizql-data-service" / "read-metadata")
            .and(warp::post())
            .and(warp::header::optional::<String>("x-tableau-auth"))
            .and_then(move |auth: Option<String>| {
                let state = state_meta.clone();
                async move {
                    let state = state.lock().await;
                    check_auth(&state, auth.as_deref())?;
                    Ok::<_, warp::Rejection>(warp::reply::json(&state.metadata))
                }
            });

        // Query execution; remembers the payload it was sent
        let state_query = state.clone();
        let query = warp::path!("api" / "v1" / "vizql-data-service" / "query-datasource")
            .and(warp::post())
            .and(warp::body::json())
            .and(warp::header::optional::<String>("x-tableau-auth"))
            .and_then(move |payload: Value, auth: Option<String>| {
                let state = state_query.clone();
                async move {
                    let mut state = state.lock().await;
                    check_auth(&state, auth.as_deref())?;
                    state.last_query_payload = Some(payload);
                    Ok::<_, warp::Rejection>(warp::reply::json(&state.query_result))
                }
            });

        let routes = sign_in
            .or(datasources)
            .or(metadata)
            .or(query)
            .recover(handle_rejection);

        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        self.port = addr.port();

        let handle = tokio::spawn(server);
        self.server_handle = Some(handle);

        // Wait a bit for the server to be ready
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        format!("http://127.0.0.1:{}", self.port)
    }

    /// Invalidate every issued token; the next authenticated request
    /// gets a 401 until the client signs in again.
    pub async fn revoke_tokens(&self) {
        self.state.lock().await.valid_tokens.clear();
    }

    pub async fn sign_in_count(&self) -> usize {
        self.state.lock().await.issued_tokens.len()
    }

    pub async fn last_query_payload(&self) -> Option<Value> {
        self.state.lock().await.last_query_payload.clone()
    }

    pub async fn stop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for MockTableauServer {
    fn drop(&mut self) {
        if let Some(handle) = &self.server_handle {
            handle.abort();
        }
    }
}

fn check_auth(state: &ServerState, header: Option<&str>) -> Result<(), warp::Rejection> {
    match header {
        Some(token) if state.valid_tokens.contains(token) => Ok(()),
        _ => Err(warp::reject::custom(UnauthorizedError)),
    }
}

/// Custom error for unauthorized requests
#[derive(Debug)]
struct UnauthorizedError;
impl warp::reject::Reject for UnauthorizedError {}

async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, std::convert::Infallible> {
    if err.find::<UnauthorizedError>().is_some() {
        Ok(warp::reply::with_status(
            "Unauthorized - valid X-Tableau-Auth token required",
            warp::http::StatusCode::UNAUTHORIZED,
        ))
    } else {
        Ok(warp::reply::with_status(
            "Internal Server Error",
            warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_startup() {
        let mut server = MockTableauServer::new(vec![], json!({ "data": [] }), json!({ "data": [] }));
        let base_url = server.start().await;

        assert!(base_url.starts_with("http://127.0.0.1:"));
        assert!(server.port > 0);

        server.stop().await;
    }
}
