//! Read-only collaboration analytics.
//!
//! Combines hub traffic, scheduler statistics and decision outcomes into an
//! efficiency score, flags bottlenecks against configured thresholds, and
//! suggests allocation changes. Nothing here mutates engine state.

use crate::consensus::{DecisionEngine, DecisionStatistics};
use crate::hub::{CommunicationReport, MessageHub};
use crate::scheduler::{AllocationStatistics, Scheduler};
use crate::types::WorkerName;
use agora_config::AnalyticsConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Category of collaboration bottleneck.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    /// Responses take too long
    SlowCommunication,
    /// Too many tasks are waiting for a worker
    TaskBacklog,
    /// Assigned work is spread unevenly across workers
    WorkloadImbalance,
}

impl BottleneckKind {
    fn description(&self) -> &'static str {
        match self {
            BottleneckKind::SlowCommunication => {
                "Communication efficiency is low; responses take too long"
            }
            BottleneckKind::TaskBacklog => {
                "Pending tasks are piling up faster than they are assigned"
            }
            BottleneckKind::WorkloadImbalance => "Workload is unevenly spread across workers",
        }
    }

    fn recommendations(&self) -> [&'static str; 2] {
        match self {
            BottleneckKind::SlowCommunication => [
                "Optimize message routing to cut response latency",
                "Increase parallel processing capacity of workers",
            ],
            BottleneckKind::TaskBacklog => [
                "Run allocation passes more often",
                "Revisit task priorities",
            ],
            BottleneckKind::WorkloadImbalance => [
                "Enable dynamic load balancing",
                "Adjust worker capability scores",
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    pub description: String,
}

/// Full collaboration report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaborationAnalysis {
    /// Weighted score in [0, 1]
    pub collaboration_efficiency: f64,
    pub bottlenecks: Vec<Bottleneck>,
    pub recommendations: Vec<String>,
    pub communication_metrics: CommunicationReport,
    pub task_metrics: AllocationStatistics,
    pub decision_metrics: DecisionStatistics,
    pub analyzed_at: DateTime<Utc>,
}

/// Suggested allocation adjustments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationOptimization {
    pub optimization_actions: Vec<String>,
    pub overloaded_workers: Vec<WorkerName>,
    pub underutilized_workers: Vec<WorkerName>,
    pub optimized_at: DateTime<Utc>,
}

/// Analyzer borrowing the engine components it reads.
#[derive(Debug, Clone, Copy)]
pub struct CollaborationAnalytics<'a> {
    scheduler: &'a Scheduler,
    decisions: &'a DecisionEngine,
    hub: &'a MessageHub,
    config: &'a AnalyticsConfig,
}

impl<'a> CollaborationAnalytics<'a> {
    pub fn new(
        scheduler: &'a Scheduler,
        decisions: &'a DecisionEngine,
        hub: &'a MessageHub,
        config: &'a AnalyticsConfig,
    ) -> Self {
        Self {
            scheduler,
            decisions,
            hub,
            config,
        }
    }

    pub fn analyze_collaboration_patterns(&self) -> CollaborationAnalysis {
        let communication = self.hub.generate_communication_report();
        let tasks = self.scheduler.get_allocation_statistics();
        let decisions = self.decisions.get_decision_statistics();

        let efficiency = self.efficiency(&communication, &tasks, &decisions);
        let bottlenecks = self.bottlenecks(&communication, &tasks);
        let recommendations = self.recommendations(&bottlenecks, &tasks, &decisions);

        debug!(
            efficiency,
            bottlenecks = bottlenecks.len(),
            "Collaboration patterns analyzed"
        );

        CollaborationAnalysis {
            collaboration_efficiency: efficiency,
            bottlenecks,
            recommendations,
            communication_metrics: communication,
            task_metrics: tasks,
            decision_metrics: decisions,
            analyzed_at: Utc::now(),
        }
    }

    fn efficiency(
        &self,
        communication: &CommunicationReport,
        tasks: &AllocationStatistics,
        decisions: &DecisionStatistics,
    ) -> f64 {
        let mut score = communication.communication_efficiency * self.config.communication_weight;

        if tasks.total_tasks > 0 {
            let completion_rate = tasks.completed_tasks as f64 / tasks.total_tasks as f64;
            score += completion_rate * self.config.completion_weight;
        }
        if decisions.completed_votes > 0 {
            score += decisions.average_confidence * self.config.confidence_weight;
        }

        score.clamp(0.0, 1.0)
    }

    fn bottlenecks(
        &self,
        communication: &CommunicationReport,
        tasks: &AllocationStatistics,
    ) -> Vec<Bottleneck> {
        let mut found = Vec::new();

        if communication.communication_efficiency < self.config.min_efficiency {
            found.push(BottleneckKind::SlowCommunication);
        }
        if tasks.pending_tasks > self.config.max_pending_tasks {
            found.push(BottleneckKind::TaskBacklog);
        }

        let assigned = tasks.worker_statistics.values().map(|t| t.assigned);
        if let (Some(max), Some(min)) = (assigned.clone().max(), assigned.min()) {
            if max - min > self.config.max_assignment_spread {
                found.push(BottleneckKind::WorkloadImbalance);
            }
        }

        found
            .into_iter()
            .map(|kind| Bottleneck {
                kind,
                description: kind.description().to_string(),
            })
            .collect()
    }

    fn recommendations(
        &self,
        bottlenecks: &[Bottleneck],
        tasks: &AllocationStatistics,
        decisions: &DecisionStatistics,
    ) -> Vec<String> {
        let mut recommendations: Vec<String> = bottlenecks
            .iter()
            .flat_map(|b| b.kind.recommendations())
            .map(str::to_string)
            .collect();

        if tasks.average_completion_secs > self.config.slow_completion_secs {
            recommendations
                .push("Tasks take too long to complete; consider decomposing them".to_string());
        }
        if decisions.completed_votes > 0
            && decisions.average_confidence < self.config.min_confidence
        {
            recommendations
                .push("Decision confidence is low; improve the decision mechanism".to_string());
        }

        recommendations
    }

    /// Find overloaded and underutilized available workers.
    ///
    /// Only suggests changes; load balancing is left as it is.
    pub fn optimize_task_allocation(&self) -> AllocationOptimization {
        let mut overloaded = Vec::new();
        let mut underutilized = Vec::new();

        for workload in self.scheduler.workloads().into_iter().filter(|w| w.available) {
            if workload.workload_percentage > self.config.overload_percent {
                overloaded.push(workload.name);
            } else if workload.workload_percentage < self.config.underutilized_percent {
                underutilized.push(workload.name);
            }
        }

        let mut actions = Vec::new();
        if !overloaded.is_empty() && !underutilized.is_empty() {
            actions.push(format!(
                "Rebalance tasks from [{}] to [{}]",
                overloaded.join(", "),
                underutilized.join(", ")
            ));
        }
        if overloaded.len() > underutilized.len() && !self.scheduler.load_balancing_enabled() {
            actions.push("Enable load balancing".to_string());
        }

        AllocationOptimization {
            optimization_actions: actions,
            overloaded_workers: overloaded,
            underutilized_workers: underutilized,
            optimized_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::WorkerSpec;
    use crate::consensus::VoteRequest;
    use crate::scheduler::TaskSpec;
    use crate::voting::DecisionType;
    use agora_config::{DecisionConfig, SchedulerConfig};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        hub: Arc<MessageHub>,
        scheduler: Scheduler,
        decisions: DecisionEngine,
        config: AnalyticsConfig,
    }

    impl Fixture {
        fn new(scheduler_config: SchedulerConfig) -> Self {
            let hub = Arc::new(MessageHub::default());
            Self {
                scheduler: Scheduler::new(scheduler_config, Arc::clone(&hub)).unwrap(),
                decisions: DecisionEngine::new(DecisionConfig::default(), Arc::clone(&hub)),
                hub,
                config: AnalyticsConfig::default(),
            }
        }

        fn analytics(&self) -> CollaborationAnalytics<'_> {
            CollaborationAnalytics::new(&self.scheduler, &self.decisions, &self.hub, &self.config)
        }
    }

    #[test]
    fn test_idle_engine_report() {
        let fixture = Fixture::new(SchedulerConfig::default());
        let analysis = fixture.analytics().analyze_collaboration_patterns();

        // Only the default communication efficiency contributes
        assert!((analysis.collaboration_efficiency - 0.15).abs() < 1e-9);
        assert!(analysis.bottlenecks.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_efficiency_combines_sources() {
        let fixture = Fixture::new(SchedulerConfig::default());
        fixture.scheduler.register_worker(WorkerSpec::new("w")).unwrap();
        let id = fixture.scheduler.create_task(TaskSpec::new("t")).unwrap();
        fixture.scheduler.allocate_tasks();
        fixture.scheduler.complete_task(&id, json!({}), true).unwrap();

        let vote = fixture
            .decisions
            .create_vote(VoteRequest::new("t", ["Yes", "No"], ["a", "b"], DecisionType::Majority))
            .unwrap();
        fixture.decisions.cast_vote(&vote, "a", "Yes").unwrap();
        fixture.decisions.cast_vote(&vote, "b", "No").unwrap();

        let analysis = fixture.analytics().analyze_collaboration_patterns();
        // 0.5 * 0.3 + 1.0 * 0.4 + 0.5 * 0.3
        assert!((analysis.collaboration_efficiency - 0.7).abs() < 1e-9);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("decision mechanism")));
    }

    #[test]
    fn test_backlog_and_imbalance_bottlenecks() {
        let fixture = Fixture::new(SchedulerConfig {
            load_balancing: false,
            ..SchedulerConfig::default()
        });
        fixture
            .scheduler
            .register_worker(
                WorkerSpec::new("star")
                    .with_capability("research", 1.0)
                    .with_max_workload(1000.0),
            )
            .unwrap();
        fixture.scheduler.register_worker(WorkerSpec::new("novice")).unwrap();

        for i in 0..4 {
            fixture
                .scheduler
                .create_task(
                    TaskSpec::new(format!("research {}", i))
                        .requiring(["research"])
                        .with_estimated_duration(1.0),
                )
                .unwrap();
        }
        fixture.scheduler.allocate_tasks();
        for i in 0..6 {
            fixture
                .scheduler
                .create_task(TaskSpec::new(format!("translate {}", i)).requiring(["translation"]))
                .unwrap();
        }
        fixture.scheduler.allocate_tasks();

        let analysis = fixture.analytics().analyze_collaboration_patterns();
        let kinds: Vec<BottleneckKind> = analysis.bottlenecks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BottleneckKind::TaskBacklog, BottleneckKind::WorkloadImbalance]
        );
        assert_eq!(analysis.recommendations.len(), 4);
    }

    #[test]
    fn test_optimize_is_read_only() {
        let fixture = Fixture::new(SchedulerConfig {
            load_balancing: false,
            ..SchedulerConfig::default()
        });
        fixture.scheduler.register_worker(WorkerSpec::new("hot")).unwrap();
        fixture
            .scheduler
            .create_task(TaskSpec::new("big").with_estimated_duration(90.0))
            .unwrap();
        fixture.scheduler.allocate_tasks();

        let plan = fixture.analytics().optimize_task_allocation();
        assert_eq!(plan.overloaded_workers, vec!["hot".to_string()]);
        assert!(plan.underutilized_workers.is_empty());
        assert_eq!(plan.optimization_actions, vec!["Enable load balancing".to_string()]);
        assert!(!fixture.scheduler.load_balancing_enabled());

        fixture.scheduler.register_worker(WorkerSpec::new("cold")).unwrap();
        let plan = fixture.analytics().optimize_task_allocation();
        assert_eq!(plan.underutilized_workers, vec!["cold".to_string()]);
        assert_eq!(plan.optimization_actions.len(), 1);
        assert!(plan.optimization_actions[0].starts_with("Rebalance"));
    }
}
