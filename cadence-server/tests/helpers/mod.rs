//! Shared test utilities

pub mod test_server;
