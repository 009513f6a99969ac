//! End-to-end integration tests for Baitline
//!
//! These tests wire the ingress routers, observability and the server's
//! router assembly together to verify the full request flow.
