use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const GET_ISSUES: &str = "get_issues";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let get_issues = ToolDescriptor {
        name: GET_ISSUES.into(),
        description: "List the issues of a GitHub repository, one line per issue: \"<number> [<state>] <title>\"".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "owner": {"type": "string", "description": "Repository owner (organization or user)"},
                "repo": {"type": "string", "description": "Repository name"}
            },
            "required": ["owner", "repo"]
        }),
    };

    vec![get_issues]
}
