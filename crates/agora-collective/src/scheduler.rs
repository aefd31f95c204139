//! Priority scheduling of tasks onto capability-matched workers.
//!
//! The [`Scheduler`] owns every task and the worker registry. Tasks wait in a
//! priority queue (higher priority first, then creation order) until
//! [`Scheduler::allocate_tasks`] finds them a worker. A task only leaves the
//! queue once every task it depends on has completed.

use crate::capability::{
    parse_capabilities, Capability, ComplexityTier, DefaultFitness, FitnessPolicy, WorkerProfile,
    WorkerRegistry, WorkerSpec,
};
use crate::hub::{MessageHub, MessagePriority, MessageType, OutgoingMessage};
use crate::types::{new_id, CollectiveError, EntityKind, Result, TaskId, WorkerName};
use agora_config::{AllocationMode, SchedulerConfig};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Assigned or in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub required_capabilities: BTreeSet<Capability>,
    pub complexity: ComplexityTier,

    /// Effort units added to the assigned worker's load
    pub estimated_duration: f64,

    /// Higher is more urgent
    pub priority: i32,

    /// Tasks that must complete before this one is assigned
    pub dependencies: BTreeSet<TaskId>,

    pub status: TaskStatus,
    pub assigned_worker: Option<WorkerName>,
    pub retry_count: u32,
    pub max_retries: u32,

    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub result: Option<serde_json::Value>,
    pub failure_reason: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Creation order, used to keep equal priorities first-in first-out
    #[serde(skip)]
    pub(crate) sequence: u64,
}

/// Parameters for [`Scheduler::create_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    name: String,
    description: String,
    required_capabilities: Vec<String>,
    complexity: ComplexityTier,
    estimated_duration: Option<f64>,
    priority: i32,
    dependencies: Vec<TaskId>,
    max_retries: Option<u32>,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requiring<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_complexity(mut self, complexity: ComplexityTier) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_estimated_duration(mut self, duration: f64) -> Self {
        self.estimated_duration = Some(duration);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, task_id: impl Into<TaskId>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One assignment made by an allocation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationRecord {
    pub task_id: TaskId,
    pub task_name: String,
    pub worker: WorkerName,
    pub allocated_at: DateTime<Utc>,
    pub complexity: ComplexityTier,
    pub priority: i32,
    pub fitness: f64,
}

/// Load snapshot of one worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerWorkload {
    pub name: WorkerName,
    pub current_workload: f64,
    pub max_workload: f64,
    pub workload_percentage: f64,
    pub active_tasks: usize,
    pub success_rate: f64,
    pub available: bool,
    pub capabilities: Vec<Capability>,
}

/// Task outcomes per worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkerTally {
    /// Tasks currently assigned or in progress
    pub assigned: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationStatistics {
    pub total_tasks: usize,
    pub pending_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub cancelled_tasks: usize,

    /// Every registered worker, including idle ones
    pub worker_statistics: BTreeMap<WorkerName, WorkerTally>,

    /// Mean of completion minus start over completed tasks, 0 when none
    pub average_completion_secs: f64,

    pub load_balancing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    priority: i32,
    sequence: u64,
    task_id: TaskId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then the earlier task
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    registry: WorkerRegistry,
    tasks: HashMap<TaskId, Task>,
    queue: BinaryHeap<QueueEntry>,
    active: HashSet<TaskId>,

    /// Tasks with status Completed; only these satisfy dependencies
    completed: HashSet<TaskId>,

    history: Vec<AllocationRecord>,
    next_sequence: u64,
    load_balancing: bool,
}

impl SchedulerState {
    fn dependencies_met(&self, task: &Task) -> bool {
        task.dependencies
            .iter()
            .all(|dep| self.completed.contains(dep))
    }

    fn task(&self, id: &str) -> Result<&Task> {
        self.tasks
            .get(id)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Task, id))
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .get_mut(id)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Task, id))
    }

    fn enqueue(&mut self, task: &Task) {
        self.queue.push(QueueEntry {
            priority: task.priority,
            sequence: task.sequence,
            task_id: task.id.clone(),
        });
    }

    /// Take the task off its worker: release the load and leave the active set.
    fn release_worker(&mut self, task_id: &str) -> Result<Option<WorkerName>> {
        let (worker, effort) = {
            let task = self.task(task_id)?;
            (task.assigned_worker.clone(), task.estimated_duration)
        };
        if let Some(name) = &worker {
            self.registry.get_mut(name)?.release(effort);
        }
        self.active.remove(task_id);
        Ok(worker)
    }

    fn workload_of(&self, worker: &WorkerProfile) -> WorkerWorkload {
        let active_tasks = self
            .active
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.assigned_worker.as_deref() == Some(worker.name.as_str()))
            .count();

        WorkerWorkload {
            name: worker.name.clone(),
            current_workload: worker.current_workload,
            max_workload: worker.max_workload,
            workload_percentage: worker.workload_percentage(),
            active_tasks,
            success_rate: worker.success_rate,
            available: worker.available,
            capabilities: worker.capabilities.iter().cloned().collect(),
        }
    }
}

/// Task allocator and owner of the worker registry.
pub struct Scheduler {
    config: SchedulerConfig,
    known_capabilities: BTreeSet<Capability>,
    hub: Arc<MessageHub>,
    policy: Box<dyn FitnessPolicy>,
    state: Mutex<SchedulerState>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, hub: Arc<MessageHub>) -> Result<Self> {
        let known_capabilities = parse_capabilities(&config.known_capabilities, &BTreeSet::new())?;
        let state = SchedulerState {
            load_balancing: config.load_balancing,
            ..SchedulerState::default()
        };

        Ok(Self {
            config,
            known_capabilities,
            hub,
            policy: Box::new(DefaultFitness),
            state: Mutex::new(state),
        })
    }

    /// Replace the scoring policy used to rank workers.
    pub fn with_policy(mut self, policy: impl FitnessPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn register_worker(&self, spec: WorkerSpec) -> Result<()> {
        let profile = WorkerProfile::from_spec(
            spec,
            self.config.default_max_workload,
            &self.known_capabilities,
        )?;
        let name = profile.name.clone();
        let capabilities = profile.capabilities.len();
        let max_workload = profile.max_workload;

        self.state.lock().registry.register(profile)?;
        info!(worker = %name, capabilities, max_workload, "Worker registered");
        Ok(())
    }

    /// Retire or restore a worker. Retired workers keep their current tasks.
    pub fn set_worker_availability(&self, name: &str, available: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.registry.get_mut(name)?.available = available;
        info!(worker = name, available, "Worker availability changed");
        Ok(())
    }

    pub fn get_worker(&self, name: &str) -> Option<WorkerProfile> {
        self.state.lock().registry.get(name).cloned()
    }

    pub fn workers(&self) -> Vec<WorkerProfile> {
        self.state.lock().registry.iter().cloned().collect()
    }

    /// Add a task to the queue as Pending.
    pub fn create_task(&self, spec: TaskSpec) -> Result<TaskId> {
        let required = parse_capabilities(&spec.required_capabilities, &self.known_capabilities)?;
        let estimated_duration = spec
            .estimated_duration
            .unwrap_or(self.config.default_estimated_duration);
        if !(estimated_duration.is_finite() && estimated_duration >= 0.0) {
            return Err(CollectiveError::InvalidArgument(format!(
                "estimated duration must be a non-negative number, got {}",
                estimated_duration
            )));
        }

        let mut state = self.state.lock();
        if let Some(missing) = spec
            .dependencies
            .iter()
            .find(|dep| !state.tasks.contains_key(*dep))
        {
            return Err(CollectiveError::not_found(EntityKind::Task, missing.clone()));
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let task = Task {
            id: new_id(),
            name: spec.name,
            description: spec.description,
            required_capabilities: required,
            complexity: spec.complexity,
            estimated_duration,
            priority: spec.priority,
            dependencies: spec.dependencies.into_iter().collect(),
            status: TaskStatus::Pending,
            assigned_worker: None,
            retry_count: 0,
            max_retries: spec.max_retries.unwrap_or(self.config.default_max_retries),
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
            result: None,
            failure_reason: None,
            metadata: spec.metadata,
            sequence,
        };

        let id = task.id.clone();
        state.enqueue(&task);
        info!(
            task_id = %id,
            name = %task.name,
            priority = task.priority,
            complexity = ?task.complexity,
            "Task created"
        );
        state.tasks.insert(id.clone(), task);
        Ok(id)
    }

    /// Run one allocation pass over the queue.
    ///
    /// Each queued task is considered at most once. Blocked tasks (unmet
    /// dependencies, no qualifying worker) go back on the queue. In strict
    /// mode the pass stops at the first task no worker can take. Returns the
    /// ids assigned by this pass, in assignment order.
    pub fn allocate_tasks(&self) -> Vec<TaskId> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut deferred = Vec::new();
        let mut assigned = Vec::new();
        let mut notices = Vec::new();

        while let Some(entry) = state.queue.pop() {
            let Some(task) = state.tasks.get(&entry.task_id) else {
                continue;
            };
            // Cancelled while queued
            if task.status != TaskStatus::Pending {
                continue;
            }

            if !state.dependencies_met(task) {
                debug!(task_id = %task.id, "Task waiting on dependencies");
                deferred.push(entry);
                continue;
            }

            let mut candidates: Vec<(&WorkerProfile, f64)> = state
                .registry
                .iter()
                .filter(|w| w.available)
                .map(|w| {
                    let score = self
                        .policy
                        .fitness(w, &task.required_capabilities, task.complexity);
                    debug!(
                        task_id = %task.id,
                        worker = %w.name,
                        fitness = score,
                        "Scored candidate"
                    );
                    (w, score)
                })
                .filter(|(_, score)| *score > 0.0)
                .collect();

            if candidates.is_empty() {
                warn!(task_id = %task.id, name = %task.name, "No qualifying worker for task");
                deferred.push(entry);
                if self.config.allocation_mode == AllocationMode::Strict {
                    break;
                }
                continue;
            }

            candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            let chosen = if state.load_balancing && candidates.len() > 1 {
                candidates
                    .iter()
                    .take(self.config.balance_window.max(1))
                    .min_by(|a, b| {
                        a.0.current_workload
                            .partial_cmp(&b.0.current_workload)
                            .unwrap_or(Ordering::Equal)
                    })
                    .copied()
                    .unwrap_or(candidates[0])
            } else {
                candidates[0]
            };
            let (worker_name, fitness) = (chosen.0.name.clone(), chosen.1);

            let task_id = entry.task_id;
            if let Some(notice) = self.assign(state, &task_id, &worker_name, fitness) {
                notices.push(notice);
                assigned.push(task_id);
            }
        }

        state.queue.extend(deferred);
        drop(guard);

        for notice in notices {
            if let Err(err) = self.hub.send_message(notice) {
                warn!(error = %err, "Failed to deliver task assignment");
            }
        }

        assigned
    }

    fn assign(
        &self,
        state: &mut SchedulerState,
        task_id: &str,
        worker_name: &str,
        fitness: f64,
    ) -> Option<OutgoingMessage> {
        let now = Utc::now();
        let task = state.tasks.get_mut(task_id)?;
        let worker = state.registry.get_mut(worker_name).ok()?;

        task.status = TaskStatus::Assigned;
        task.assigned_worker = Some(worker_name.to_string());
        task.assigned_at = Some(now);
        worker.take_on(task_id, task.estimated_duration);
        state.active.insert(task_id.to_string());

        state.history.push(AllocationRecord {
            task_id: task_id.to_string(),
            task_name: task.name.clone(),
            worker: worker_name.to_string(),
            allocated_at: now,
            complexity: task.complexity,
            priority: task.priority,
            fitness,
        });

        info!(
            task_id,
            worker = worker_name,
            fitness,
            workload = worker.current_workload,
            "Task assigned"
        );

        Some(
            OutgoingMessage::new(
                self.config.sender_name.as_str(),
                worker_name,
                MessageType::TaskDelegation,
                format!("New task assigned: {}", task.name),
                serde_json::json!({
                    "task_id": task.id,
                    "task_name": task.name,
                    "description": task.description,
                    "required_capabilities": task.required_capabilities,
                    "complexity": task.complexity,
                    "priority": task.priority,
                    "estimated_duration": task.estimated_duration,
                }),
            )
            .with_priority(MessagePriority::High),
        )
    }

    /// Mark an assigned task as being worked on.
    pub fn start_task(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let task = state.task_mut(task_id)?;
        if task.status != TaskStatus::Assigned {
            return Err(CollectiveError::StateConflict(format!(
                "task {} is {}, expected assigned",
                task_id,
                task.status.as_str()
            )));
        }
        task.status = TaskStatus::InProgress;
        task.started_at = Some(Utc::now());
        debug!(task_id, "Task started");
        Ok(())
    }

    /// Record the outcome of an assigned or in-progress task.
    pub fn complete_task(
        &self,
        task_id: &str,
        result: serde_json::Value,
        success: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let status = state.task(task_id)?.status;
        if !status.is_active() {
            return Err(CollectiveError::StateConflict(format!(
                "task {} is {}, expected assigned or in progress",
                task_id,
                status.as_str()
            )));
        }

        let worker = state.release_worker(task_id)?;
        if let Some(name) = &worker {
            state.registry.get_mut(name)?.record_outcome(success);
        }

        let task = state.task_mut(task_id)?;
        task.status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        task.completed_at = Some(Utc::now());
        task.result = Some(result);
        if success {
            state.completed.insert(task_id.to_string());
        }

        info!(
            task_id,
            worker = worker.as_deref().unwrap_or_default(),
            success,
            "Task finished"
        );
        Ok(())
    }

    /// Cancel a pending or assigned task.
    ///
    /// An assigned task releases its worker's load and the worker is told.
    pub fn cancel_task(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let (status, name) = {
            let task = state.task(task_id)?;
            (task.status, task.name.clone())
        };

        let worker = match status {
            TaskStatus::Pending => None,
            TaskStatus::Assigned => state.release_worker(task_id)?,
            other => {
                return Err(CollectiveError::StateConflict(format!(
                    "task {} is {} and cannot be cancelled",
                    task_id,
                    other.as_str()
                )))
            }
        };

        let task = state.task_mut(task_id)?;
        task.status = TaskStatus::Cancelled;
        task.completed_at = Some(Utc::now());
        drop(state);

        info!(task_id, "Task cancelled");

        if let Some(worker) = worker {
            let notice = OutgoingMessage::new(
                self.config.sender_name.as_str(),
                worker,
                MessageType::StatusUpdate,
                format!("Task cancelled: {}", name),
                serde_json::json!({ "task_id": task_id, "status": TaskStatus::Cancelled }),
            );
            if let Err(err) = self.hub.send_message(notice) {
                warn!(error = %err, "Failed to deliver task cancellation");
            }
        }
        Ok(())
    }

    /// Put an assigned or in-progress task back on the queue.
    ///
    /// The task becomes Failed instead once its retries are exhausted.
    /// Returns the task's new status.
    pub fn requeue_task(&self, task_id: &str, reason: &str) -> Result<TaskStatus> {
        let mut state = self.state.lock();
        let status = state.task(task_id)?.status;
        if !status.is_active() {
            return Err(CollectiveError::StateConflict(format!(
                "task {} is {} and cannot be requeued",
                task_id,
                status.as_str()
            )));
        }

        let worker = state.release_worker(task_id)?;
        let task = state.task_mut(task_id)?;
        task.retry_count += 1;
        task.failure_reason = Some(reason.to_string());

        if task.retry_count > task.max_retries {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now());
            let retry_count = task.retry_count;
            if let Some(name) = &worker {
                state.registry.get_mut(name)?.record_outcome(false);
            }
            warn!(task_id, retry_count, reason, "Task failed after exhausting retries");
            return Ok(TaskStatus::Failed);
        }

        task.status = TaskStatus::Pending;
        task.assigned_worker = None;
        task.assigned_at = None;
        task.started_at = None;
        let retry_count = task.retry_count;
        let task = task.clone();
        state.enqueue(&task);

        info!(task_id, retry_count, reason, "Task requeued");
        Ok(TaskStatus::Pending)
    }

    /// Whether every dependency of the task has completed.
    pub fn check_dependencies(&self, task_id: &str) -> Result<bool> {
        let state = self.state.lock();
        let task = state.task(task_id)?;
        Ok(state.dependencies_met(task))
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.state.lock().tasks.get(task_id).cloned()
    }

    /// Pending tasks in the order they would be considered.
    pub fn pending_tasks(&self) -> Vec<Task> {
        let state = self.state.lock();
        let mut pending: Vec<&Task> = state
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        pending.into_iter().cloned().collect()
    }

    pub fn allocation_history(&self) -> Vec<AllocationRecord> {
        self.state.lock().history.clone()
    }

    pub fn get_agent_workload(&self, name: &str) -> Result<WorkerWorkload> {
        let state = self.state.lock();
        let worker = state
            .registry
            .get(name)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Worker, name))?;
        Ok(state.workload_of(worker))
    }

    /// Workload of every registered worker, ordered by name.
    pub fn workloads(&self) -> Vec<WorkerWorkload> {
        let state = self.state.lock();
        state
            .registry
            .iter()
            .map(|w| state.workload_of(w))
            .collect()
    }

    pub fn load_balancing_enabled(&self) -> bool {
        self.state.lock().load_balancing
    }

    pub fn set_load_balancing(&self, enabled: bool) {
        self.state.lock().load_balancing = enabled;
        info!(enabled, "Load balancing toggled");
    }

    pub fn get_allocation_statistics(&self) -> AllocationStatistics {
        let state = self.state.lock();

        let mut worker_statistics: BTreeMap<WorkerName, WorkerTally> = state
            .registry
            .iter()
            .map(|w| (w.name.clone(), WorkerTally::default()))
            .collect();

        let mut counts: HashMap<TaskStatus, usize> = HashMap::new();
        let mut completion_total = 0.0;
        let mut completion_samples = 0usize;

        for task in state.tasks.values() {
            *counts.entry(task.status).or_insert(0) += 1;

            let Some(worker) = &task.assigned_worker else {
                continue;
            };
            let tally = worker_statistics.entry(worker.clone()).or_default();
            match task.status {
                TaskStatus::Assigned | TaskStatus::InProgress => tally.assigned += 1,
                TaskStatus::Completed => tally.completed += 1,
                TaskStatus::Failed => tally.failed += 1,
                TaskStatus::Pending | TaskStatus::Cancelled => {}
            }

            if task.status == TaskStatus::Completed {
                if let (Some(start), Some(end)) =
                    (task.started_at.or(task.assigned_at), task.completed_at)
                {
                    completion_total += (end - start).num_milliseconds().max(0) as f64 / 1000.0;
                    completion_samples += 1;
                }
            }
        }

        let count = |status: TaskStatus| counts.get(&status).copied().unwrap_or(0);

        AllocationStatistics {
            total_tasks: state.tasks.len(),
            pending_tasks: count(TaskStatus::Pending),
            active_tasks: count(TaskStatus::Assigned) + count(TaskStatus::InProgress),
            completed_tasks: count(TaskStatus::Completed),
            failed_tasks: count(TaskStatus::Failed),
            cancelled_tasks: count(TaskStatus::Cancelled),
            worker_statistics,
            average_completion_secs: if completion_samples == 0 {
                0.0
            } else {
                completion_total / completion_samples as f64
            },
            load_balancing: state.load_balancing,
        }
    }
}
