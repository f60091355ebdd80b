//! Scan orchestration core: probe clients over external scan backends, the sweep
//! orchestrator that drives them concurrently, and the result aggregator.

pub mod aggregator;
pub mod network;
pub mod scanner;
pub mod sweep;
pub mod vendors;
