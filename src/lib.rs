//! Comrade - Rust 工具调用智能体
//!
//! 模块划分：
//! - **agent**: 多轮 tool-use 循环（请求模型 → 执行工具 → 回填结果），失败回滚
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、所有权交接、轮询钩子、Shell 任务监管
//! - **events**: 工具调用观察者
//! - **llm**: 传输抽象、Messages API 类型、回复解析、HTTPS 实现与 Mock
//! - **memory**: 对话历史与用户笔记
//! - **remote**: 进程内远程命令端点、客户端与 Agent 命令端点
//! - **scan**: 目录扫描与文件类型识别
//! - **tools**: 工具箱（shell / remote / read / write / list / identify）与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod events;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod remote;
pub mod scan;
pub mod tools;

pub use agent::{create_agent, Agent, AgentSettings, MAX_TOOL_ROUNDS};
pub use core::AgentError;
