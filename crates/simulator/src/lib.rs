//! Workload simulation and CLI around the rate allocator.

pub mod cmd;
pub mod compare;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod workload;
