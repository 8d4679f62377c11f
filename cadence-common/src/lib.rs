//! # Cadence Common Library
//!
//! Shared code for the Cadence one-on-one meeting server:
//! - Database schema, models and queries
//! - Error type
//! - Configuration and root folder resolution
//! - Authorization gate
//! - Recurring occurrence calculator

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod occurrence;

pub use error::{Error, Result};
