//! Integration tests for Crawl-Relay
//!
//! These tests use wiremock to create mock HTTP servers and run batches
//! end-to-end through the reqwest-backed fetcher and the HTTP API.

mod batch_tests;
mod server_tests;
