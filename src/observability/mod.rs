//! 可观测性：tracing 订阅器初始化
//!
//! 日志写到 stderr，避免与交互输出混在一起；RUST_LOG 可覆盖默认的 info 级别。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
