//! Integration Tests Module
//!
//! End-to-end tests for the chat session: the controller driven by a scripted
//! worker, the full stack running the echo backend, and worker events decoded
//! from their JSON form.

// Controller behavior against a scripted worker
mod session_flow_test;

// Session service with a real worker runtime and echo backend
mod echo_session_test;

// JSON event stream fed through the controller
mod wire_protocol_test;
