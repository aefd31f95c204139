//! Worker capability profiles and task fitness scoring.
//!
//! This module holds the worker registry: each worker's declared capability
//! tags, per-capability proficiency, workload capacity and track record, and
//! the fitness function the scheduler uses to rank workers for a task.

use crate::types::{check_name, CollectiveError, EntityKind, Result, TaskId, WorkerName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A named skill tag (e.g., "risk_assessment", "technical_analysis").
///
/// Tags are normalized on construction: trimmed, lower-cased, with inner
/// whitespace and dashes folded into underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    /// Create a capability from a raw tag.
    pub fn new(tag: impl AsRef<str>) -> Result<Self> {
        let normalized = tag
            .as_ref()
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        if normalized.is_empty() {
            return Err(CollectiveError::InvalidArgument(
                "capability tag must not be empty".to_string(),
            ));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordinal difficulty of a task.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl ComplexityTier {
    /// Numeric level, 1 (low) through 4 (critical).
    pub fn level(&self) -> u8 {
        match self {
            ComplexityTier::Low => 1,
            ComplexityTier::Medium => 2,
            ComplexityTier::High => 3,
            ComplexityTier::Critical => 4,
        }
    }
}

/// Registration request for a worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerSpec {
    name: String,
    capabilities: Vec<String>,
    scores: Vec<(String, f64)>,
    max_workload: Option<f64>,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a capability with an explicit proficiency score.
    pub fn with_capability(mut self, tag: impl Into<String>, score: f64) -> Self {
        let tag = tag.into();
        self.capabilities.push(tag.clone());
        self.scores.push((tag, score));
        self
    }

    /// Declare capabilities without scores (they count as 0.5 when matched).
    pub fn with_capabilities<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_max_workload(mut self, max_workload: f64) -> Self {
        self.max_workload = Some(max_workload);
        self
    }
}

/// A worker's declared capabilities, load and history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerProfile {
    /// Unique worker name
    pub name: WorkerName,

    /// Declared capability tags
    pub capabilities: BTreeSet<Capability>,

    /// Proficiency per capability, 0.0 to 1.0
    pub capability_scores: BTreeMap<Capability, f64>,

    /// Effort currently assigned to this worker
    pub current_workload: f64,

    /// Effort this worker can carry
    pub max_workload: f64,

    /// Running average of task outcomes, 0.0 to 1.0
    pub success_rate: f64,

    /// Number of finished tasks that fed `success_rate`
    pub completed_count: u64,

    /// Ids of every task ever assigned to this worker
    pub task_history: Vec<TaskId>,

    /// Whether the worker takes new assignments
    pub available: bool,

    pub registered_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl WorkerProfile {
    pub(crate) fn from_spec(
        spec: WorkerSpec,
        default_max_workload: f64,
        known: &BTreeSet<Capability>,
    ) -> Result<Self> {
        check_name("worker name", &spec.name)?;
        let name = spec.name.clone();

        let max_workload = spec.max_workload.unwrap_or(default_max_workload);
        if !(max_workload.is_finite() && max_workload >= 0.0) {
            return Err(CollectiveError::InvalidArgument(format!(
                "max workload for {} must be a non-negative number",
                name
            )));
        }

        let capabilities = spec
            .capabilities
            .iter()
            .map(|tag| checked_capability(tag, known))
            .collect::<Result<BTreeSet<_>>>()?;

        let mut capability_scores = BTreeMap::new();
        for (tag, score) in &spec.scores {
            if !(0.0..=1.0).contains(score) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "score for capability {} must be within [0, 1], got {}",
                    tag, score
                )));
            }
            capability_scores.insert(checked_capability(tag, known)?, *score);
        }

        let now = Utc::now();
        Ok(Self {
            name,
            capabilities,
            capability_scores,
            current_workload: 0.0,
            max_workload,
            success_rate: 0.0,
            completed_count: 0,
            task_history: Vec::new(),
            available: true,
            registered_at: now,
            last_active: now,
        })
    }

    /// Average proficiency over `required`.
    ///
    /// A declared capability without a score counts 0.5; an undeclared one
    /// counts 0. An empty requirement matches fully.
    pub fn capability_match(&self, required: &BTreeSet<Capability>) -> f64 {
        if required.is_empty() {
            return 1.0;
        }

        let total: f64 = required
            .iter()
            .filter(|cap| self.capabilities.contains(*cap))
            .map(|cap| self.capability_scores.get(cap).copied().unwrap_or(0.5))
            .sum();

        total / required.len() as f64
    }

    /// Remaining capacity as a fraction, 0.0 (full) to 1.0 (idle).
    pub fn load_factor(&self) -> f64 {
        if self.max_workload <= 0.0 {
            return 0.0;
        }
        (1.0 - self.current_workload / self.max_workload).clamp(0.0, 1.0)
    }

    /// Reliability gate for harder tiers.
    ///
    /// Workers without history have a success rate of 0 and so score 0 for
    /// critical work until they have completed something.
    pub fn complexity_factor(&self, tier: ComplexityTier) -> f64 {
        match tier {
            ComplexityTier::Low | ComplexityTier::Medium => 1.0,
            ComplexityTier::High => 0.8 + 0.2 * self.success_rate,
            ComplexityTier::Critical => self.success_rate,
        }
    }

    /// Load as a percentage of capacity.
    pub fn workload_percentage(&self) -> f64 {
        if self.max_workload <= 0.0 {
            return 100.0;
        }
        self.current_workload / self.max_workload * 100.0
    }

    pub(crate) fn take_on(&mut self, task_id: &str, effort: f64) {
        self.current_workload += effort;
        self.task_history.push(task_id.to_string());
        self.last_active = Utc::now();
    }

    pub(crate) fn release(&mut self, effort: f64) {
        self.current_workload = (self.current_workload - effort).max(0.0);
        self.last_active = Utc::now();
    }

    /// Fold one finished task into the running success rate.
    pub(crate) fn record_outcome(&mut self, success: bool) {
        let n = self.completed_count as f64;
        let value = if success { 1.0 } else { 0.0 };
        self.success_rate = ((self.success_rate * n + value) / (n + 1.0)).clamp(0.0, 1.0);
        self.completed_count += 1;
    }
}

fn checked_capability(tag: &str, known: &BTreeSet<Capability>) -> Result<Capability> {
    let capability = Capability::new(tag)?;
    if !known.is_empty() && !known.contains(&capability) {
        return Err(CollectiveError::InvalidArgument(format!(
            "capability unrecognized: {}",
            capability
        )));
    }
    Ok(capability)
}

/// Normalize a list of raw tags, checking them against `known`.
pub(crate) fn parse_capabilities<I, S>(
    tags: I,
    known: &BTreeSet<Capability>,
) -> Result<BTreeSet<Capability>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| checked_capability(tag.as_ref(), known))
        .collect()
}

/// Score how well `worker` fits a task, in [0, 1].
///
/// `capability_match * load_factor * complexity_factor`, or 0 for an
/// unavailable worker.
pub fn fitness(
    worker: &WorkerProfile,
    required: &BTreeSet<Capability>,
    tier: ComplexityTier,
) -> f64 {
    if !worker.available {
        return 0.0;
    }

    let score =
        worker.capability_match(required) * worker.load_factor() * worker.complexity_factor(tier);
    clamp_unit(score)
}

/// Clamp to [0, 1], mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Scoring policy used to rank workers for a task.
pub trait FitnessPolicy: Send + Sync + fmt::Debug {
    fn fitness(
        &self,
        worker: &WorkerProfile,
        required: &BTreeSet<Capability>,
        tier: ComplexityTier,
    ) -> f64;
}

/// The standard [`fitness`] function.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFitness;

impl FitnessPolicy for DefaultFitness {
    fn fitness(
        &self,
        worker: &WorkerProfile,
        required: &BTreeSet<Capability>,
        tier: ComplexityTier,
    ) -> f64 {
        fitness(worker, required, tier)
    }
}

/// Registered workers, ordered by name.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerName, WorkerProfile>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker; fails if the name is taken.
    pub fn register(&mut self, profile: WorkerProfile) -> Result<()> {
        if self.workers.contains_key(&profile.name) {
            return Err(CollectiveError::InvalidArgument(format!(
                "worker already registered: {}",
                profile.name
            )));
        }
        self.workers.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WorkerProfile> {
        self.workers.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut WorkerProfile> {
        self.workers
            .get_mut(name)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Worker, name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerProfile> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(tags: &[&str]) -> BTreeSet<Capability> {
        tags.iter().map(|t| Capability::new(t).unwrap()).collect()
    }

    fn worker(spec: WorkerSpec) -> WorkerProfile {
        WorkerProfile::from_spec(spec, 100.0, &BTreeSet::new()).unwrap()
    }

    #[test]
    fn test_capability_normalization() {
        let cap = Capability::new("  Risk Assessment ").unwrap();
        assert_eq!(cap.as_str(), "risk_assessment");
        assert_eq!(Capability::new("market-research").unwrap().as_str(), "market_research");
        assert!(Capability::new("   ").is_err());
    }

    #[test]
    fn test_unknown_capability_rejected_when_catalog_set() {
        let known = caps(&["fundamental_analysis"]);
        let spec = WorkerSpec::new("a").with_capability("astrology", 0.9);
        let err = WorkerProfile::from_spec(spec, 100.0, &known).unwrap_err();
        assert!(err.to_string().contains("capability unrecognized"));
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let spec = WorkerSpec::new("a").with_capability("fundamental_analysis", 1.5);
        assert!(WorkerProfile::from_spec(spec, 100.0, &BTreeSet::new()).is_err());
    }

    #[test]
    fn test_padded_worker_name_rejected() {
        let spec = WorkerSpec::new(" analyst");
        let err = WorkerProfile::from_spec(spec, 100.0, &BTreeSet::new()).unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::InvalidArgument);
        assert!(WorkerProfile::from_spec(WorkerSpec::new(""), 100.0, &BTreeSet::new()).is_err());
        assert_eq!(worker(WorkerSpec::new("analyst")).name, "analyst");
    }

    #[test]
    fn test_complexity_levels() {
        let levels: Vec<u8> = [
            ComplexityTier::Low,
            ComplexityTier::Medium,
            ComplexityTier::High,
            ComplexityTier::Critical,
        ]
        .iter()
        .map(ComplexityTier::level)
        .collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        assert_eq!(ComplexityTier::default().level(), 2);
    }

    #[test]
    fn test_capability_match() {
        let w = worker(
            WorkerSpec::new("a")
                .with_capability("fundamental_analysis", 0.9)
                .with_capabilities(["industry_analysis"]),
        );

        assert_eq!(w.capability_match(&BTreeSet::new()), 1.0);
        assert!((w.capability_match(&caps(&["fundamental_analysis"])) - 0.9).abs() < 1e-9);
        // Declared without a score
        assert!((w.capability_match(&caps(&["industry_analysis"])) - 0.5).abs() < 1e-9);
        // Not declared at all
        assert_eq!(w.capability_match(&caps(&["technical_analysis"])), 0.0);
        let mixed = w.capability_match(&caps(&["fundamental_analysis", "technical_analysis"]));
        assert!((mixed - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_fitness_factors() {
        let mut w = worker(WorkerSpec::new("a").with_capability("fundamental_analysis", 0.8));
        let required = caps(&["fundamental_analysis"]);

        assert!((fitness(&w, &required, ComplexityTier::Medium) - 0.8).abs() < 1e-9);
        // No history: high tier is damped, critical is refused
        assert!((fitness(&w, &required, ComplexityTier::High) - 0.64).abs() < 1e-9);
        assert_eq!(fitness(&w, &required, ComplexityTier::Critical), 0.0);

        w.current_workload = 50.0;
        assert!((fitness(&w, &required, ComplexityTier::Low) - 0.4).abs() < 1e-9);

        w.available = false;
        assert_eq!(fitness(&w, &required, ComplexityTier::Low), 0.0);
    }

    #[test]
    fn test_fitness_stays_in_bounds() {
        let mut w = worker(WorkerSpec::new("a").with_capability("x", 1.0));
        let required = caps(&["x"]);
        let tiers = [
            ComplexityTier::Low,
            ComplexityTier::Medium,
            ComplexityTier::High,
            ComplexityTier::Critical,
        ];

        for load in [-50.0, 0.0, 30.0, 100.0, 250.0] {
            for rate in [0.0, 0.5, 1.0] {
                w.current_workload = load;
                w.success_rate = rate;
                for tier in tiers {
                    let f = fitness(&w, &required, tier);
                    assert!((0.0..=1.0).contains(&f), "fitness {} out of bounds", f);
                }
            }
        }

        w.max_workload = 0.0;
        assert_eq!(fitness(&w, &required, ComplexityTier::Low), 0.0);
    }

    #[test]
    fn test_success_rate_running_average() {
        let mut w = worker(WorkerSpec::new("a"));
        w.record_outcome(true);
        assert_eq!(w.success_rate, 1.0);
        w.record_outcome(false);
        assert!((w.success_rate - 0.5).abs() < 1e-9);
        w.record_outcome(true);
        assert!((w.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(w.completed_count, 3);
    }

    #[test]
    fn test_release_floors_at_zero() {
        let mut w = worker(WorkerSpec::new("a"));
        w.take_on("t-1", 30.0);
        w.release(45.0);
        assert_eq!(w.current_workload, 0.0);
        assert_eq!(w.task_history, vec!["t-1".to_string()]);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = WorkerRegistry::new();
        registry.register(worker(WorkerSpec::new("a"))).unwrap();
        assert!(registry.register(worker(WorkerSpec::new("a"))).is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.get_mut("missing").is_err());
    }
}
