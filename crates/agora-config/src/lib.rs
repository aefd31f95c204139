//! Configuration for the agora collective engine.
//!
//! Every component reads its tunables from one [`AgoraConfig`] value, which
//! can be built in code, parsed from TOML, or loaded from the per-user
//! configuration directory.

pub mod config;

pub use config::{
    AgoraConfig, AllocationMode, AnalyticsConfig, DecisionConfig, HubConfig, SchedulerConfig,
};
