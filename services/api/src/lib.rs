//! Voicebridge API Library Crate
//!
//! This library contains the web-facing half of the relay: configuration,
//! application state, HTTP handlers, routing and the WebSocket relay engine.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
