//! Adapters: concrete implementations of the ports.

pub mod http;
pub mod network;
pub mod storage;
pub mod websocket;
