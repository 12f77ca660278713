//! Configuration and result data models.

pub mod config;
pub mod record;
