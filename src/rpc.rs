//! RPC transport to the motion planning service.
//!
//! The planning service speaks JSON-RPC 2.0 over TCP. Each message is
//! framed with an HTTP-style Content-Length header:
//!
//! ```text
//! Content-Length: 98\r\n
//! \r\n
//! {"jsonrpc":"2.0","method":"MotionPlanner.HandleRetrieveRequest","params":{...},"id":3}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐            TCP              ┌─────────────────────┐
//! │  PlannerClient  │  ◄─────────────────────────►│   motion planner    │
//! │ (JsonRpcChannel)│   JSON-RPC 2.0 + framing    │      service        │
//! └─────────────────┘                             └─────────────────────┘
//! ```
//!
//! [`RpcChannel`] is the injection point: the planning client is generic
//! over it so tests can substitute an in-memory channel.

mod channel;
mod framing;
pub mod jsonrpc;

pub use channel::{JsonRpcChannel, RpcChannel, TransportError};
pub use framing::{read_message, write_message, MAX_HEADER_LINE, MAX_MESSAGE_SIZE};
