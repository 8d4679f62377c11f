//! HTTP API handlers

pub mod auth;
pub mod cron;
pub mod health;
pub mod meetings;
pub mod notifications;
pub mod recordings;
pub mod schedules;
pub mod users;
