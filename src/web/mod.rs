//! HTTP API for the assistant service

pub mod server;

pub use server::{start_server, AppState};
