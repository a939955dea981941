//! 远程命令：端点目录、请求/应答客户端、Agent 自身的命令端点

pub mod client;
pub mod port;

pub use client::{Endpoint, EndpointDirectory, RemoteCommandClient, RemoteError, RemoteReply, RemoteRequest};
pub use port::{CommandPort, PortCommand, PortControl, DEFAULT_PORT_NAME};
