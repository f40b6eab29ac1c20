pub mod commands;
pub mod handlers;
pub mod protocol;

pub use commands::CliArgs;
pub use handlers::handle_request;
pub use protocol::{BuildRequest, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
