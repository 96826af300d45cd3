//! Punch clock CLI library.
//!
//! This crate provides the orchestration service and the CLI interface
//! for the punch clock.

mod cli;
pub mod commands;
mod config;
mod service;

pub use cli::{Cli, Commands, SettingsAction};
pub use config::{BrokerConfig, Config};
pub use service::{AuthClaim, PunchClockService, RenderedReport, ServiceError};
