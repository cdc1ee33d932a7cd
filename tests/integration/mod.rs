//! Integration Tests
//!
//! End-to-end tests of the orchestration loop against the scripted mock
//! provider: plan gating, round bounds, retry behavior, streaming
//! semantics, and session persistence.

mod common;

// Orchestration loop scenarios
mod supervisor_test;

// Plan gate and execution-class ordering
mod tool_gate_test;

// Session store round trips and turn serialization
mod persistence_test;
