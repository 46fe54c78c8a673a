use crate::issues::ToolResult;
use serde_json::{json, Value};

fn text_item(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

// Build an MCP-compliant result envelope for tools/call outputs.
// - success: one text block per rendered line (possibly none).
// - failure: a single text block with the message, the structured error shape,
//   and isError so clients can tell the two apart.
pub fn call_result(result: &ToolResult) -> Value {
    match result {
        Ok(lines) => {
            let content: Vec<Value> = lines.iter().map(|l| text_item(l)).collect();
            json!({ "content": content })
        }
        Err(err) => json!({
            "content": [text_item(&err.to_string())],
            "structuredContent": { "error": err.shape() },
            "isError": true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;

    #[test]
    fn success_has_one_item_per_line_and_no_error_flag() {
        let v = call_result(&Ok(vec!["1 [open] A".into(), "2 [closed] B".into()]));
        assert_eq!(
            v,
            json!({"content": [
                {"type": "text", "text": "1 [open] A"},
                {"type": "text", "text": "2 [closed] B"}
            ]})
        );
    }

    #[test]
    fn empty_success_is_not_an_error() {
        let v = call_result(&Ok(vec![]));
        assert_eq!(v, json!({"content": []}));
    }

    #[test]
    fn error_is_flagged_with_structured_shape() {
        let v = call_result(&Err(ToolError::Validation("repo must be a string".into())));
        assert_eq!(v["isError"], true);
        assert_eq!(v["content"][0]["text"], "repo must be a string");
        assert_eq!(v["structuredContent"]["error"]["code"], "invalid_arguments");
        assert_eq!(v["structuredContent"]["error"]["retriable"], false);
    }
}
