//! Typed configuration sections and loading.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How an allocation pass reacts to a task that no worker can take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Stop the whole pass at the first unassignable task.
    Strict,
    /// Requeue the unassignable task and keep scanning the rest of the queue.
    #[default]
    BestEffort,
}

/// Scheduler (task allocator) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Behaviour when a popped task has no qualifying worker
    pub allocation_mode: AllocationMode,

    /// Pick the least-loaded worker among the best candidates
    pub load_balancing: bool,

    /// How many top-fitness candidates are considered for load balancing
    pub balance_window: usize,

    /// Workload capacity given to workers registered without one
    pub default_max_workload: f64,

    /// Effort units given to tasks created without an estimate
    pub default_estimated_duration: f64,

    /// Retry budget given to tasks created without one
    pub default_max_retries: u32,

    /// Accepted capability tags; empty accepts any tag
    pub known_capabilities: Vec<String>,

    /// Sender name used for task delegation messages
    pub sender_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            allocation_mode: AllocationMode::BestEffort,
            load_balancing: true,
            balance_window: 3,
            default_max_workload: 100.0,
            default_estimated_duration: 60.0,
            default_max_retries: 3,
            known_capabilities: Vec::new(),
            sender_name: "TaskAllocator".to_string(),
        }
    }
}

/// Decision engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionConfig {
    /// Share of cast votes an option needs under consensus voting
    pub consensus_threshold: f64,

    /// Weight of a voter with no explicit weight or known role
    pub default_weight: f64,

    /// Role name to vote weight, used by hierarchical decisions
    pub role_weights: BTreeMap<String, f64>,

    /// Sender name used for decision requests and results
    pub sender_name: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        let role_weights = [
            ("chairman", 3.0),
            ("decision_moderator", 3.0),
            ("investment_committee", 2.0),
            ("analyst", 1.0),
        ]
        .into_iter()
        .map(|(role, weight)| (role.to_string(), weight))
        .collect();

        Self {
            consensus_threshold: 2.0 / 3.0,
            default_weight: 1.0,
            role_weights,
            sender_name: "DecisionMaker".to_string(),
        }
    }
}

/// Message hub settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of the broadcast channel feeding subscribers
    pub event_buffer: usize,

    /// Mean response latency (seconds) that still counts as fully efficient
    pub response_baseline_secs: f64,

    /// Number of participants listed in the communication report
    pub most_active_limit: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            response_baseline_secs: 300.0,
            most_active_limit: 5,
        }
    }
}

/// Collaboration analytics weights and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub communication_weight: f64,
    pub completion_weight: f64,
    pub confidence_weight: f64,

    /// Communication efficiency below this is a bottleneck
    pub min_efficiency: f64,

    /// More pending tasks than this is a bottleneck
    pub max_pending_tasks: usize,

    /// Larger spread of per-worker assigned counts is a bottleneck
    pub max_assignment_spread: usize,

    /// Workers above this load percentage are overloaded
    pub overload_percent: f64,

    /// Workers below this load percentage are underutilized
    pub underutilized_percent: f64,

    /// Mean completion time (seconds) above which long tasks are flagged
    pub slow_completion_secs: f64,

    /// Mean vote confidence below which decisions are flagged
    pub min_confidence: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            communication_weight: 0.3,
            completion_weight: 0.4,
            confidence_weight: 0.3,
            min_efficiency: 0.5,
            max_pending_tasks: 5,
            max_assignment_spread: 3,
            overload_percent: 80.0,
            underutilized_percent: 30.0,
            slow_completion_secs: 3600.0,
            min_confidence: 0.7,
        }
    }
}

/// Top-level configuration for every engine component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgoraConfig {
    pub scheduler: SchedulerConfig,
    pub decisions: DecisionConfig,
    pub hub: HubConfig,
    pub analytics: AnalyticsConfig,
}

impl AgoraConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AgoraConfig =
            toml::from_str(content).context("Failed to parse agora configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded agora configuration");
        Ok(config)
    }

    /// Load from `path` if given, else from the per-user config file if it
    /// exists, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                tracing::debug!("No agora config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `<config_dir>/agora/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "agora").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if s.balance_window == 0 {
            anyhow::bail!("scheduler.balance_window must be at least 1");
        }
        if !(s.default_max_workload.is_finite() && s.default_max_workload >= 0.0) {
            anyhow::bail!("scheduler.default_max_workload must be a non-negative number");
        }
        if !(s.default_estimated_duration.is_finite() && s.default_estimated_duration >= 0.0) {
            anyhow::bail!("scheduler.default_estimated_duration must be a non-negative number");
        }

        let d = &self.decisions;
        if !(d.consensus_threshold > 0.0 && d.consensus_threshold <= 1.0) {
            anyhow::bail!("decisions.consensus_threshold must be in (0, 1]");
        }
        if !(d.default_weight.is_finite() && d.default_weight >= 0.0) {
            anyhow::bail!("decisions.default_weight must be a non-negative number");
        }
        if let Some((role, _)) = d
            .role_weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            anyhow::bail!("decisions.role_weights.{} must be a non-negative number", role);
        }

        let h = &self.hub;
        if h.event_buffer == 0 {
            anyhow::bail!("hub.event_buffer must be at least 1");
        }
        if !(h.response_baseline_secs > 0.0) {
            anyhow::bail!("hub.response_baseline_secs must be positive");
        }

        let a = &self.analytics;
        let weights = [
            a.communication_weight,
            a.completion_weight,
            a.confidence_weight,
        ];
        if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            anyhow::bail!("analytics score weights must be non-negative numbers");
        }

        Ok(())
    }
}
