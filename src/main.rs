//! Comrade - Rust 工具调用智能体
//!
//! 入口：初始化日志、加载配置、创建 Agent，注册命令端点，然后在标准输入与端点请求之间循环。
//! 请求进行中按 Ctrl+C 取消当前请求；空闲时按 Ctrl+C 退出。

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use comrade::config::load_config;
use comrade::create_agent;
use comrade::events::ToolEvent;
use comrade::remote::{CommandPort, Endpoint, EndpointDirectory, PortControl, RemoteRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    comrade::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let directory = EndpointDirectory::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ToolEvent>();
    let mut agent = create_agent(&cfg, directory.clone())
        .context("Failed to create agent")?
        .with_observer(Arc::new(event_tx));

    // 工具事件打印到 stderr，不打断回答输出
    tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            eprintln!("  [{}] {}: {}", ev.phase.as_str(), ev.tool, ev.detail);
        }
    });

    let mut port = if cfg.port.enabled {
        Some(
            directory
                .register(&cfg.port.name, 16)
                .context("Failed to register command port")?,
        )
    } else {
        None
    };
    let mut command_port = CommandPort::new();

    println!(
        "comrade ({}) - type a message, /clear to reset, /quit to exit",
        agent.model()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => continue,
                    "/quit" | "/exit" => break,
                    "/clear" => {
                        agent.clear_history();
                        println!("(conversation cleared)");
                        continue;
                    }
                    _ => {}
                }

                let cancel = CancellationToken::new();
                let trigger = cancel.clone();
                let watcher = tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        trigger.cancel();
                    }
                });
                let result = agent.send_cancellable(line, cancel).await;
                watcher.abort();

                match result {
                    Ok(answer) => {
                        println!("{}", answer);
                        let usage = agent.last_usage();
                        tracing::info!(input = usage.input_tokens, output = usage.output_tokens, "tokens");
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Some(request) = next_request(&mut port) => {
                println!();
                if command_port.handle(&mut agent, request).await == PortControl::Quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    tracing::info!("bye");
    Ok(())
}

/// 端点未启用时永远挂起，使 select 的该分支失效
async fn next_request(port: &mut Option<Endpoint>) -> Option<RemoteRequest> {
    match port {
        Some(endpoint) => endpoint.recv().await,
        None => std::future::pending().await,
    }
}
