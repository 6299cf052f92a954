//! MCP (Model Context Protocol) server for the tools, over the HTTP+SSE
//! transport: clients open `GET /sse`, receive an `endpoint` event naming
//! their message URL, POST JSON-RPC messages there and read the responses
//! back as `message` events on the stream.

pub mod protocol;
pub mod sse;

pub use protocol::McpHandler;
pub use sse::create_mcp_router;
