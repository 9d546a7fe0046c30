//! ATS detection, form pre-filling and batch application workflows.

pub mod browser;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
