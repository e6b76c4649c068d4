//! Shared building blocks for the almanac workspace: errors, constants and
//! layered settings.

pub mod config;
pub mod constants;
pub mod error;
