//! tool-use 循环集成测试：脚本化传输 + 真实工具

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use comrade::agent::{Agent, AgentSettings, MAX_TOOL_ROUNDS};
use comrade::core::AgentError;
use comrade::events::{ToolEvent, ToolObserver, ToolPhase};
use comrade::llm::ScriptedTransport;
use comrade::memory::{ContentBlock, MemoryNotes, MessageContent, Role};
use comrade::remote::{CommandPort, PortControl, RemoteReply};
use comrade::tools::{PathBase, ReadFileTool, Tool, ToolContext, ToolExecutor, ToolRegistry};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the text argument"
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String, String> {
        args.get("text")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| "Missing 'text' parameter".to_string())
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ToolEvent>>);

impl ToolObserver for Recorder {
    fn on_tool_event(&self, event: &ToolEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn settings() -> AgentSettings {
    AgentSettings {
        api_key: Some("test-key".into()),
        model: "test-model".into(),
        max_tokens: 256,
        system_prompt: String::new(),
    }
}

fn agent_with(transport: Arc<ScriptedTransport>, workdir: &std::path::Path) -> Agent {
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool::new(PathBase::new(Some(workdir.to_path_buf()))));
    registry.register(EchoTool);
    Agent::new(settings(), transport, ToolExecutor::new(registry))
}

fn tool_results(content: &MessageContent) -> Vec<(String, String, bool)> {
    match content {
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                    Some((tool_use_id.clone(), content.clone(), *is_error))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn test_plain_answer() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new().text("4"));
    let mut agent = agent_with(transport.clone(), dir.path());

    assert_eq!(agent.send("What is 2+2?").await.unwrap(), "4");
    assert_eq!(agent.message_count(), 2);
    assert_eq!(agent.last_usage().input_tokens, 10);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].tools.len(), 2);
    assert_eq!(requests[0].tools[0].name, "read_file");
}

#[tokio::test]
async fn test_tool_error_round_then_answer() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .tool_uses(&[("tu_1", "read_file", json!({"path": "missing"}))])
            .text("File not found."),
    );
    let recorder = Arc::new(Recorder::default());
    let mut agent = agent_with(transport.clone(), dir.path()).with_observer(recorder.clone());

    assert_eq!(agent.send("Show me missing").await.unwrap(), "File not found.");
    assert_eq!(agent.message_count(), 4);

    let messages = agent.conversation().messages();
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(
        tool_results(&messages[2].content),
        vec![("tu_1".to_string(), "Cannot open file: missing".to_string(), true)]
    );
    assert!(agent.conversation().is_consistent());

    // 第二轮请求带上了 tool_result
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 3);

    let events = recorder.0.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].phase, ToolPhase::Executing);
    assert_eq!(events[0].detail, r#"{"path":"missing"}"#);
    assert_eq!(events[1].phase, ToolPhase::Error);
    assert_eq!(events[1].detail, "Cannot open file: missing");
}

#[tokio::test]
async fn test_results_follow_tool_use_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .tool_uses(&[
                ("t1", "echo", json!({"text": "one"})),
                ("t2", "teleport", json!({})),
                ("t3", "read_file", json!({"path": "a.txt"})),
            ])
            .text("ok"),
    );
    let mut agent = agent_with(transport, dir.path());
    agent.send("go").await.unwrap();

    let results = tool_results(&agent.conversation().messages()[2].content);
    assert_eq!(
        results,
        vec![
            ("t1".to_string(), "one".to_string(), false),
            ("t2".to_string(), "Unknown tool: teleport".to_string(), true),
            ("t3".to_string(), "alpha".to_string(), false),
        ]
    );
    assert!(agent.conversation().is_consistent());
}

#[tokio::test]
async fn test_reply_content_is_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let content = json!([
        {"type": "thinking", "thinking": "Simple arithmetic.", "signature": "EqQBCgIYAhIM"},
        {"type": "redacted_thinking", "data": "c2VjcmV0"},
        {
            "type": "text",
            "text": "4",
            "citations": [{"type": "char_location", "cited_text": "2+2=4", "document_index": 0}]
        }
    ]);
    let body = json!({"stop_reason": "end_turn", "content": content});
    let transport = Arc::new(ScriptedTransport::new().respond(body.to_string()).text("ok"));
    let mut agent = agent_with(transport.clone(), dir.path());

    assert_eq!(agent.send("What is 2+2?").await.unwrap(), "4");
    let stored = serde_json::to_value(&agent.conversation().messages()[1]).unwrap();
    assert_eq!(stored, json!({"role": "assistant", "content": content}));

    // 下一次请求把同样的块原样发回
    agent.send("thanks").await.unwrap();
    let resent = serde_json::to_value(&transport.requests()[1].messages[1]).unwrap();
    assert_eq!(resent, stored);
}

#[tokio::test]
async fn test_tool_use_stop_without_tool_blocks_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(r#"{"stop_reason": "tool_use", "content": [{"type": "text", "text": "done"}]}"#),
    );
    let mut agent = agent_with(transport.clone(), dir.path());

    assert_eq!(agent.send("go").await.unwrap(), "done");
    assert_eq!(agent.message_count(), 2);
    assert_eq!(transport.requests().len(), 1);
    assert!(agent.conversation().is_consistent());
}

#[tokio::test]
async fn test_text_accumulates_across_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let first = json!({
        "stop_reason": "tool_use",
        "content": [
            {"type": "text", "text": "Looking."},
            {"type": "tool_use", "id": "t1", "name": "echo", "input": {"text": "x"}}
        ]
    });
    let transport = Arc::new(ScriptedTransport::new().respond(first.to_string()).text("Done."));
    let mut agent = agent_with(transport, dir.path());
    assert_eq!(agent.send("go").await.unwrap(), "Looking.\nDone.");
}

/// 第 n 轮失败（n = 0..3），对话长度恢复到调用前
#[tokio::test]
async fn test_failure_after_n_rounds_rolls_back() {
    let failures: [fn(ScriptedTransport) -> ScriptedTransport; 4] = [
        |t| t.fail("connection reset"),
        |t| t.respond_status(500, r#"{"error": {"message": "overloaded"}}"#),
        |t| t.respond("{not json"),
        |t| t.respond(r#"{"error": {"message": "bad request"}}"#),
    ];

    for n in 0..=3usize {
        for fail in failures {
            let dir = tempfile::tempdir().unwrap();
            let mut script = ScriptedTransport::new().text("warm-up");
            for i in 0..n {
                let id = format!("t{}", i);
                script = script.tool_uses(&[(id.as_str(), "echo", json!({"text": "hop"}))]);
            }
            let transport = Arc::new(fail(script));
            let mut agent = agent_with(transport.clone(), dir.path());

            agent.send("first").await.unwrap();
            let before = agent.message_count();
            assert_eq!(before, 2);

            assert!(agent.send("second").await.is_err());
            assert_eq!(agent.message_count(), before, "n = {}", n);
            assert!(agent.conversation().is_consistent());
            assert_eq!(transport.requests().len(), 1 + n + 1);
        }
    }
}

#[tokio::test]
async fn test_error_variants() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail("dns failure")
            .respond_status(401, r#"{"error": {"message": "invalid x-api-key"}}"#)
            .respond(r#"{"stop_reason": "end_turn", "content": []}"#),
    );
    let mut agent = agent_with(transport, dir.path());

    let e = agent.send("a").await.unwrap_err();
    assert_eq!(e.to_string(), "HTTPS request failed: dns failure");
    let e = agent.send("b").await.unwrap_err();
    assert_eq!(e.to_string(), "HTTP 401: invalid x-api-key");
    assert_eq!(agent.message_count(), 0);

    // 没有文本但对话一致：保留
    assert!(matches!(agent.send("c").await, Err(AgentError::NoText)));
    assert_eq!(agent.message_count(), 2);
}

#[tokio::test]
async fn test_round_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = ScriptedTransport::new();
    for i in 0..MAX_TOOL_ROUNDS + 2 {
        let id = format!("t{}", i);
        script = script.tool_uses(&[(id.as_str(), "echo", json!({"text": "again"}))]);
    }
    let transport = Arc::new(script);
    let mut agent = agent_with(transport.clone(), dir.path());

    assert!(matches!(agent.send("loop").await, Err(AgentError::NoText)));
    assert_eq!(transport.requests().len(), MAX_TOOL_ROUNDS);
    assert_eq!(transport.remaining(), 2);
    assert_eq!(agent.message_count(), 1 + 2 * MAX_TOOL_ROUNDS);
    assert!(agent.conversation().is_consistent());
}

#[tokio::test]
async fn test_cancel_during_request_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .tool_uses(&[("t1", "echo", json!({"text": "hi"}))])
            .hang(),
    );
    let mut agent = agent_with(transport, dir.path());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), agent.send_cancellable("wait", cancel))
        .await
        .expect("cancellation must end the call");
    assert!(matches!(result, Err(AgentError::Cancelled)));
    assert_eq!(agent.message_count(), 0);
}

#[tokio::test]
async fn test_command_port_drives_agent() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new().text("pong").text("second"));
    let mut agent = agent_with(transport.clone(), dir.path()).with_memory(MemoryNotes::in_memory());
    let mut port = CommandPort::new();

    let (reply, control) = port.execute(&mut agent, "ASK ping").await;
    assert_eq!(reply, RemoteReply::Success(Some("pong".into())));
    assert_eq!(control, PortControl::Continue);
    assert_eq!(port.last_response(), Some("pong"));
    assert_eq!(
        port.execute(&mut agent, "getlast").await.0,
        RemoteReply::Success(Some("pong".into()))
    );

    port.execute(&mut agent, "SETMODEL other-model").await;
    port.execute(&mut agent, "ask again").await;
    assert_eq!(transport.requests()[1].model, "other-model");

    port.execute(&mut agent, "MEMADD likes short answers").await;
    assert_eq!(
        port.execute(&mut agent, "MEMCOUNT").await.0,
        RemoteReply::Success(Some("1".into()))
    );
    assert_eq!(
        port.execute(&mut agent, "MEMORY").await.0,
        RemoteReply::Success(Some("1. likes short answers\n".into()))
    );
    port.execute(&mut agent, "MEMCLEAR").await;
    assert_eq!(
        port.execute(&mut agent, "memory").await.0,
        RemoteReply::Success(Some("No memories stored.".into()))
    );

    port.execute(&mut agent, "CLEAR").await;
    assert_eq!(agent.message_count(), 0);
    assert_eq!(port.last_response(), None);
    assert_eq!(
        port.execute(&mut agent, "GETLAST").await.0,
        RemoteReply::Success(Some(String::new()))
    );

    // 脚本已耗尽：ASK 失败返回 10
    assert_eq!(
        port.execute(&mut agent, "ASK more").await.0,
        RemoteReply::Failure { code: 10, subcode: 0 }
    );
    assert_eq!(
        port.execute(&mut agent, "DANCE").await.0,
        RemoteReply::Failure { code: 5, subcode: 0 }
    );
    assert_eq!(port.execute(&mut agent, "QUIT").await.1, PortControl::Quit);
}
