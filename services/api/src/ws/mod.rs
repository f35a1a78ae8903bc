//! WebSocket Relay
//!
//! - `session`: the `/ws` upgrade handler; resolves the upstream before
//!   accepting the session and rejects unresolvable requests with close code 4001.
//! - `relay`: the relay engine; owns one client and one upstream socket and
//!   forwards between them, answering tool calls in-band.

pub mod relay;
pub mod session;

pub use session::ws_handler;
