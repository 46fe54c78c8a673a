use crate::http::status_error_code;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

pub const ERROR_JSON_CONTEXT: &str = "error reading error JSON";
pub const ISSUES_JSON_CONTEXT: &str = "error decoding issues JSON";

/// Every way a `get_issues` call can fail. Each variant is reported back to the
/// caller as a tool result; none of them terminates the process.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),
    #[error("request to GitHub failed: {}", source_chain(.0))]
    Transport(#[source] reqwest::Error),
    #[error("request cancelled")]
    Cancelled,
    #[error("{}", parse_message(.context, .source))]
    ResponseParse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{message}")]
    UpstreamApi { status: StatusCode, message: String },
}

/// Structured error shape exposed next to the text message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "invalid_arguments",
            ToolError::Transport(_) => "transport_error",
            ToolError::Cancelled => "cancelled",
            ToolError::ResponseParse { .. } => "response_parse_error",
            ToolError::UpstreamApi { status, .. } => status_error_code(*status).0,
        }
    }

    pub fn retriable(&self) -> bool {
        match self {
            ToolError::Validation(_) | ToolError::ResponseParse { .. } => false,
            ToolError::Transport(_) | ToolError::Cancelled => true,
            ToolError::UpstreamApi { status, .. } => status_error_code(*status).1,
        }
    }

    pub fn shape(&self) -> ErrorShape {
        ErrorShape {
            code: self.code().to_string(),
            message: self.to_string(),
            retriable: self.retriable(),
        }
    }
}

// An unreadable error body is reported by context alone; the issues decode
// failure carries its cause.
fn parse_message(context: &str, source: &serde_json::Error) -> String {
    if context == ISSUES_JSON_CONTEXT {
        format!("{}: {}", context, source)
    } else {
        context.to_string()
    }
}

// reqwest's top-level Display hides the root cause (e.g. "connection refused").
fn source_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cur = e.source();
    }
    out
}
