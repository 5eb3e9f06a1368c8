//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Check-in submission and management endpoints
pub mod checkins;
/// Event management and statistics endpoints
pub mod events;
/// Health check endpoint
pub mod health;
/// Live check-in stream (SSE)
pub mod stream;
