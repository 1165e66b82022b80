//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the WalletApi port (production backend)
//! - In-memory WalletApi and SessionStore for tests and the offline demo
//! - DuckDB for the SessionStore port

pub mod duckdb;
pub mod http;
pub mod memory;

#[cfg(test)]
pub mod http_mock;
