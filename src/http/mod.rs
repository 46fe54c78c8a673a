use crate::config::Config;
use log::debug;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Status and raw body of a completed REST call. Decoding is left to the caller,
/// which picks the payload shape based on the status.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    // Authorization header is injected per request.
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
}

pub fn auth_header_value(token: &str) -> String {
    format!("token {}", token)
}

// owner/repo are interpolated verbatim; no percent-encoding.
pub fn issues_path(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}/issues", owner, repo)
}

/// Single GET against `<api_url><path>`. No retries: a send failure or a failure
/// while reading the body is returned to the caller as-is.
pub async fn rest_get(client: &Client, cfg: &Config, path: &str) -> reqwest::Result<RestResponse> {
    let url = format!("{}{}", cfg.api_url, path);
    debug!("REST GET {}", url);
    let res = client
        .get(&url)
        .header(AUTHORIZATION, auth_header_value(&cfg.token))
        .header("X-GitHub-Api-Version", &cfg.api_version)
        .header(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        )
        .send()
        .await?;
    let status = res.status();
    let body = res.bytes().await?.to_vec();
    debug!("REST GET {} -> {} ({} bytes)", url, status, body.len());
    Ok(RestResponse { status, body })
}

/// Machine-readable error code for an upstream status, and whether a caller
/// re-invoking the tool could reasonably expect a different outcome.
pub fn status_error_code(status: StatusCode) -> (&'static str, bool) {
    match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::CONFLICT => ("conflict", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("server_error", false),
    }
}
