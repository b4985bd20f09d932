//! HTTP ingress: alert webhook, interactive troubleshooting over SSE, health.

pub mod server;

pub use server::{AppState, HttpServer, TroubleshootRequest};
