use assert_cmd::Command;
use httpmock::{Method::GET, MockServer};
use serde_json::Value;
use std::time::Duration;

fn run_with_env(reqs: &[Value], envs: &[(&str, &str)]) -> anyhow::Result<Vec<Value>> {
    let mut cmd = Command::cargo_bin("github-issues-mcp")?;
    cmd.env_remove("GITHUB_TOKEN").env_remove("GH_TOKEN");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut input = String::new();
    for req in reqs {
        input.push_str(&serde_json::to_string(req)?);
        input.push('\n');
    }
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .timeout(Duration::from_secs(30))
        .write_stdin(input)
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    let mut responses = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        responses.push(serde_json::from_str(line)?);
    }
    Ok(responses)
}

fn by_id(responses: &[Value], id: i64) -> &Value {
    responses
        .iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("no response with id {} in {:?}", id, responses))
}

fn call_get_issues(id: i64, arguments: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0", "method": "tools/call", "id": id,
        "params": {"name": "get_issues", "arguments": arguments}
    })
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let reqs = [
        serde_json::json!({"jsonrpc": "2.0", "method": "initialize", "id": 1, "params": {}}),
        serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        serde_json::json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2}),
        serde_json::json!({"jsonrpc": "2.0", "method": "ping", "id": 3}),
    ];
    let out = run_with_env(&reqs, &[])?;
    // The notification gets no response.
    assert_eq!(out.len(), 3);

    let init = by_id(&out, 1);
    assert!(init["result"]["protocolVersion"].is_string());
    assert_eq!(init["result"]["serverInfo"]["name"], "github-issues-mcp");

    let tools = by_id(&out, 2)["result"]["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "get_issues");
    assert_eq!(tools[0]["inputSchema"]["required"], serde_json::json!(["owner", "repo"]));

    assert_eq!(by_id(&out, 3)["result"], serde_json::json!({}));
    Ok(())
}

#[test]
fn get_issues_success_and_errors_are_tool_results() -> anyhow::Result<()> {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/r/issues")
            .header("authorization", "token t");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(r#"[{"number":1,"title":"Bug A","state":"open","htmlurl":"http://x"},{"number":2,"title":"Bug B","state":"closed","htmlurl":"http://y"}]"#);
    });
    let missing = server.mock(|when, then| {
        when.method(GET).path("/repos/o/gone/issues");
        then.status(404).body(r#"{"message":"Not Found"}"#);
    });

    let reqs = [
        call_get_issues(1, serde_json::json!({"owner": "o", "repo": "r"})),
        call_get_issues(2, serde_json::json!({"owner": "o", "repo": "gone"})),
        call_get_issues(3, serde_json::json!({"owner": "o"})),
    ];
    let out = run_with_env(
        &reqs,
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;

    let success = &by_id(&out, 1)["result"];
    assert!(success.get("isError").is_none());
    assert_eq!(
        success["content"],
        serde_json::json!([
            {"type": "text", "text": "1 [open] Bug A"},
            {"type": "text", "text": "2 [closed] Bug B"}
        ])
    );

    let upstream = &by_id(&out, 2)["result"];
    assert_eq!(upstream["isError"], true);
    assert_eq!(upstream["content"][0]["text"], "Not Found");
    assert_eq!(upstream["structuredContent"]["error"]["code"], "not_found");

    let invalid = &by_id(&out, 3)["result"];
    assert_eq!(invalid["isError"], true);
    assert_eq!(invalid["content"][0]["text"], "repo must be a string");

    ok.assert_hits(1);
    missing.assert_hits(1);
    Ok(())
}

#[test]
fn missing_token_still_sends_request() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/issues");
        then.status(401).body(r#"{"message":"Requires authentication"}"#);
    });
    let out = run_with_env(
        &[call_get_issues(1, serde_json::json!({"owner": "o", "repo": "r"}))],
        &[("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    let result = &by_id(&out, 1)["result"];
    assert_eq!(result["content"][0]["text"], "Requires authentication");
    assert_eq!(result["structuredContent"]["error"]["code"], "unauthorized");
    m.assert_hits(1);
    Ok(())
}

#[test]
fn cancelled_notification_aborts_in_flight_call() -> anyhow::Result<()> {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/repos/o/slow/issues");
        then.status(200).body("[]").delay(Duration::from_secs(10));
    });
    let reqs = [
        call_get_issues(9, serde_json::json!({"owner": "o", "repo": "slow"})),
        serde_json::json!({
            "jsonrpc": "2.0", "method": "notifications/cancelled",
            "params": {"requestId": 9, "reason": "user aborted"}
        }),
    ];
    let started = std::time::Instant::now();
    let out = run_with_env(
        &reqs,
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    assert!(started.elapsed() < Duration::from_secs(8));
    let result = &by_id(&out, 9)["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["code"], "cancelled");
    Ok(())
}

#[test]
fn slow_call_does_not_block_a_later_one() -> anyhow::Result<()> {
    let server = MockServer::start();
    let slow = server.mock(|when, then| {
        when.method(GET).path("/repos/o/slow/issues");
        then.status(200)
            .body(r#"[{"number":1,"title":"Slow","state":"open"}]"#)
            .delay(Duration::from_secs(3));
    });
    let fast = server.mock(|when, then| {
        when.method(GET).path("/repos/o/fast/issues");
        then.status(200)
            .body(r#"[{"number":2,"title":"Fast","state":"open"}]"#);
    });
    let reqs = [
        call_get_issues(1, serde_json::json!({"owner": "o", "repo": "slow"})),
        call_get_issues(2, serde_json::json!({"owner": "o", "repo": "fast"})),
    ];
    let out = run_with_env(
        &reqs,
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;

    assert_eq!(out.len(), 2);
    // Replies are written in completion order, not request order.
    assert_eq!(out[0]["id"], 2);
    assert_eq!(out[0]["result"]["content"][0]["text"], "2 [open] Fast");
    assert_eq!(out[1]["id"], 1);
    assert_eq!(out[1]["result"]["content"][0]["text"], "1 [open] Slow");
    slow.assert_hits(1);
    fast.assert_hits(1);
    Ok(())
}

#[test]
fn protocol_errors_use_jsonrpc_codes() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("github-issues-mcp")?;
    let input = concat!(
        "{not json\n",
        r#"{"jsonrpc":"2.0","method":"resources/list","id":1}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"tools/call","id":2,"params":{"name":"list_pulls","arguments":{}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"tools/call","id":3,"params":{"arguments":{}}}"#,
        "\n",
    );
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin(input)
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    let out: Vec<Value> = output
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(out.len(), 4);
    assert_eq!(out[0]["error"]["code"], -32700);
    assert_eq!(by_id(&out, 1)["error"]["code"], -32601);
    assert_eq!(by_id(&out, 2)["error"]["code"], -32601);
    assert_eq!(by_id(&out, 3)["error"]["code"], -32602);
    Ok(())
}

#[test]
fn version_flag_prints_and_exits() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("github-issues-mcp")?;
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::starts_with("github-issues-mcp "));
    Ok(())
}

#[test]
fn invalid_api_url_fails_at_startup() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("github-issues-mcp")?;
    cmd.env("GITHUB_API_URL", "not a url")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicates::str::contains("GITHUB_API_URL"));
    Ok(())
}
