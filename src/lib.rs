//! MCP server exposing GitHub's "list repository issues" endpoint as the
//! `get_issues` tool.

pub mod config;
pub mod error;
pub mod http;
pub mod issues;
pub mod mcp;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::ToolError;
pub use issues::{IssueQueryHandler, ToolResult};
