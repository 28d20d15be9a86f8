//! Botwire - Real-time core for multi-bot chat clients
//!
//! This crate implements the connection lifecycle, per-channel multiplexing,
//! offline request queuing, and message-timeline reconciliation that keep a
//! chat client consistent across an unreliable network.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
