//! Shared utilities

pub mod rate_limit;
pub mod text;
pub mod time;
