//! Integration tests for the Nexus router
//!
//! These drive a fully built `Router` with in-memory providers through
//! the same surface an orchestrator uses.

// Providers and helpers shared by every test module
mod fixtures;

// tools/list, tools/call, tools/help, resources and prompts end to end
mod router_flow_test;

// Session standardization, instructions and workspace context carry-over
mod session_test;
