pub mod endpoints;
pub mod executor;
pub mod filesystem;
pub mod identify;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod shell;

pub use endpoints::ListEndpointsTool;
pub use executor::ToolExecutor;
pub use filesystem::{PathBase, ReadFileTool, WriteFileTool, MAX_READ_BYTES};
pub use identify::IdentifyFileTool;
pub use registry::{Tool, ToolContext, ToolOutcome, ToolRegistry};
pub use remote::RemoteCommandTool;
pub use schema::{input_schema, parse_input};
pub use shell::ShellCommandTool;
