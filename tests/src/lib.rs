//! Integration tests driving the sweep orchestrator end to end.

#![cfg(test)]

mod discovery;
mod fake;
mod ports;
