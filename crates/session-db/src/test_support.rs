//! Shared test utilities for session-db unit tests.
