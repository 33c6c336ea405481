//! Tests for the limiter module
