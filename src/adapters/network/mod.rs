//! Network monitor implementations.

mod manual;

pub use manual::ManualNetworkMonitor;
