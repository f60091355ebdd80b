//! Shared data model for NetDetective: targets and their parser, probe outcomes,
//! configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod network;
pub mod probe;
pub mod services;
