//! Data models for extracted records and configuration.

pub mod config;
pub mod record;
