//! The `get_issues` tool: argument validation, the upstream call, and
//! rendering of the returned issues as text lines.

use crate::config::Config;
use crate::error::{ToolError, ERROR_JSON_CONTEXT, ISSUES_JSON_CONTEXT};
use crate::http;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Rendered lines on success, or the single error describing the failure.
pub type ToolResult = Result<Vec<String>, ToolError>;

/// Validated arguments of a `get_issues` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub owner: String,
    pub repo: String,
}

impl IssueQuery {
    /// Values are taken as-is: no trimming, case folding or name-format checks.
    pub fn from_arguments(arguments: &Value) -> Result<Self, ToolError> {
        let Some(map) = arguments.as_object() else {
            return Err(ToolError::Validation("arguments not a mapping".into()));
        };
        let field = |name: &str| {
            map.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ToolError::Validation(format!("{} must be a string", name)))
        };
        Ok(Self {
            owner: field("owner")?,
            repo: field("repo")?,
        })
    }

    pub fn path(&self) -> String {
        http::issues_path(&self.owner, &self.repo)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub number: i64,
    pub title: String,
    pub state: String,
    // Decoded but not rendered.
    #[serde(default, rename = "htmlurl", alias = "html_url")]
    pub html_url: String,
}

// `message` is required: an error body without one is a parse failure, not an
// upstream error with an empty message. The same goes for a 200 body that is
// not an array (including `null`).
#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    message: String,
}

/// Turn an upstream status and body into issues or the matching error.
/// Only 200 counts as success; any other status must carry `{"message": ...}`.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<Vec<Issue>, ToolError> {
    if status != StatusCode::OK {
        let payload: ApiErrorPayload =
            serde_json::from_slice(body).map_err(|source| ToolError::ResponseParse {
                context: ERROR_JSON_CONTEXT,
                source,
            })?;
        return Err(ToolError::UpstreamApi {
            status,
            message: payload.message,
        });
    }
    serde_json::from_slice(body).map_err(|source| ToolError::ResponseParse {
        context: ISSUES_JSON_CONTEXT,
        source,
    })
}

/// One `"{number} [{state}] {title}"` line per issue, in upstream order.
pub fn render_issues(issues: &[Issue]) -> Vec<String> {
    issues
        .iter()
        .map(|i| format!("{} [{}] {}", i.number, i.state, i.title))
        .collect()
}

/// Handles `get_issues` calls. Holds no per-call state, so one instance can
/// serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct IssueQueryHandler {
    client: Client,
    config: Config,
}

impl IssueQueryHandler {
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let client = http::build_client(&config)?;
        Ok(Self { client, config })
    }

    pub async fn handle(&self, arguments: &Value) -> ToolResult {
        let (_never_aborted, registration) = AbortHandle::new_pair();
        self.handle_with_cancel(arguments, registration).await
    }

    /// Like [`handle`](Self::handle), but aborting the paired `AbortHandle`
    /// drops the in-flight request and yields `ToolError::Cancelled`.
    pub async fn handle_with_cancel(
        &self,
        arguments: &Value,
        cancel: AbortRegistration,
    ) -> ToolResult {
        let query = IssueQuery::from_arguments(arguments)?;
        debug!("get_issues owner={} repo={}", query.owner, query.repo);
        let issues = match Abortable::new(self.fetch_issues(&query), cancel).await {
            Ok(res) => res?,
            Err(_aborted) => {
                warn!("get_issues {}/{} cancelled", query.owner, query.repo);
                return Err(ToolError::Cancelled);
            }
        };
        Ok(render_issues(&issues))
    }

    async fn fetch_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, ToolError> {
        let resp = http::rest_get(&self.client, &self.config, &query.path())
            .await
            .map_err(ToolError::Transport)?;
        classify_response(resp.status, &resp.body)
    }
}
