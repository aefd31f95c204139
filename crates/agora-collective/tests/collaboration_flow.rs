use agora_collective::{
    Collective, ComplexityTier, DecisionType, ErrorKind, MessageType, TaskSpec, TaskStatus,
    VoteRequest, VoteStatusReport, WorkerSpec, NO_CONSENSUS,
};
use agora_config::AgoraConfig;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn collective() -> Collective {
    Collective::new(AgoraConfig::default()).unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_scheduling_example() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(
            WorkerSpec::new("A")
                .with_capability("Fundamental", 0.9)
                .with_max_workload(100.0),
        )
        .unwrap();

    let task = scheduler
        .create_task(
            TaskSpec::new("fundamentals")
                .requiring(["Fundamental"])
                .with_estimated_duration(30.0)
                .with_priority(5),
        )
        .unwrap();

    assert_eq!(scheduler.allocate_tasks(), vec![task.clone()]);
    assert!(approx(scheduler.get_worker("A").unwrap().current_workload, 30.0));

    scheduler
        .complete_task(&task, json!({"rating": "buy"}), true)
        .unwrap();
    let worker = scheduler.get_worker("A").unwrap();
    assert_eq!(worker.current_workload, 0.0);
    assert_eq!(worker.success_rate, 1.0);
}

#[test]
fn test_starvation_example() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(WorkerSpec::new("A").with_capability("fundamental", 0.9))
        .unwrap();

    let first = scheduler
        .create_task(TaskSpec::new("first").requiring(["fundamental"]))
        .unwrap();
    let second = scheduler
        .create_task(TaskSpec::new("second").requiring(["satellite_imagery"]))
        .unwrap();

    assert_eq!(scheduler.allocate_tasks(), vec![first]);
    assert_eq!(
        scheduler.get_task(&second).unwrap().status,
        TaskStatus::Pending
    );
}

#[test]
fn test_fitness_bounds_across_pool() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(WorkerSpec::new("a").with_capability("x", 1.0).with_max_workload(10.0))
        .unwrap();
    scheduler
        .register_worker(WorkerSpec::new("b").with_capabilities(["y"]).with_max_workload(0.0))
        .unwrap();

    for _ in 0..5 {
        scheduler
            .create_task(TaskSpec::new("load").requiring(["x"]).with_estimated_duration(7.0))
            .unwrap();
    }
    scheduler.allocate_tasks();

    let tiers = [
        ComplexityTier::Low,
        ComplexityTier::Medium,
        ComplexityTier::High,
        ComplexityTier::Critical,
    ];
    let requirements: Vec<Vec<&str>> = vec![vec![], vec!["x"], vec!["y"], vec!["x", "y", "z"]];
    for worker in scheduler.workers() {
        for required in &requirements {
            let required: BTreeSet<_> = required
                .iter()
                .map(|t| agora_collective::Capability::new(t).unwrap())
                .collect();
            for tier in tiers {
                let f = agora_collective::fitness(&worker, &required, tier);
                assert!((0.0..=1.0).contains(&f));
            }
        }
    }
}

#[test]
fn test_workload_conservation() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler.register_worker(WorkerSpec::new("w")).unwrap();

    let ids: Vec<String> = (0..3)
        .map(|i| {
            scheduler
                .create_task(TaskSpec::new(format!("t{}", i)).with_estimated_duration(20.0))
                .unwrap()
        })
        .collect();
    scheduler.allocate_tasks();
    assert!(approx(scheduler.get_worker("w").unwrap().current_workload, 60.0));

    for id in &ids {
        scheduler.complete_task(id, json!({}), true).unwrap();
        assert!(scheduler.get_worker("w").unwrap().current_workload >= 0.0);
    }
    assert_eq!(scheduler.get_worker("w").unwrap().current_workload, 0.0);
}

#[test]
fn test_dependency_chain_never_assigned_early() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(WorkerSpec::new("w").with_max_workload(1000.0))
        .unwrap();

    let gather = scheduler.create_task(TaskSpec::new("gather")).unwrap();
    let analyze = scheduler
        .create_task(TaskSpec::new("analyze").depends_on(gather.clone()).with_priority(3))
        .unwrap();
    let report = scheduler
        .create_task(TaskSpec::new("report").depends_on(analyze.clone()).with_priority(9))
        .unwrap();

    assert_eq!(scheduler.allocate_tasks(), vec![gather.clone()]);
    assert_eq!(scheduler.get_task(&report).unwrap().status, TaskStatus::Pending);

    scheduler.complete_task(&gather, json!({}), true).unwrap();
    assert_eq!(scheduler.allocate_tasks(), vec![analyze.clone()]);
    assert_eq!(scheduler.get_task(&report).unwrap().status, TaskStatus::Pending);

    scheduler.complete_task(&analyze, json!({}), true).unwrap();
    assert_eq!(scheduler.allocate_tasks(), vec![report]);
}

#[test]
fn test_weighted_vote_example() {
    let collective = collective();
    let decisions = collective.decisions();
    let vote = decisions
        .create_vote(
            VoteRequest::new("Position", ["Buy", "Sell"], ["a", "b", "c"], DecisionType::Weighted)
                .with_weights([("a", 3.0), ("b", 1.0), ("c", 1.0)]),
        )
        .unwrap();

    decisions.cast_vote(&vote, "a", "Buy").unwrap();
    decisions.cast_vote(&vote, "b", "Sell").unwrap();
    let result = decisions.cast_vote(&vote, "c", "Sell").unwrap().unwrap();

    assert_eq!(result.winner, "Buy");
    assert!(approx(result.confidence, 0.6));
}

#[test]
fn test_unanimous_vote_example() {
    let collective = collective();
    let decisions = collective.decisions();
    let voters = ["a", "b", "c"];

    let agreed = decisions
        .create_vote(VoteRequest::new("Go", ["Approve", "Reject"], voters, DecisionType::Unanimous))
        .unwrap();
    let split = decisions
        .create_vote(VoteRequest::new("Go", ["Approve", "Reject"], voters, DecisionType::Unanimous))
        .unwrap();

    let mut last = None;
    for voter in voters {
        last = decisions.cast_vote(&agreed, voter, "Approve").unwrap();
    }
    let result = last.unwrap();
    assert_eq!(result.winner, "Approve");
    assert_eq!(result.confidence, 1.0);

    decisions.cast_vote(&split, "a", "Approve").unwrap();
    decisions.cast_vote(&split, "b", "Approve").unwrap();
    let result = decisions.cast_vote(&split, "c", "Reject").unwrap().unwrap();
    assert_eq!(result.winner, NO_CONSENSUS);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_invalid_option_leaves_votes_unchanged() {
    let collective = collective();
    let decisions = collective.decisions();
    let vote = decisions
        .create_vote(VoteRequest::new("t", ["Yes", "No"], ["a", "b"], DecisionType::Consensus))
        .unwrap();
    decisions.cast_vote(&vote, "a", "Yes").unwrap();

    let err = decisions.cast_vote(&vote, "b", "Perhaps").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let record = decisions.get_vote(&vote).unwrap();
    assert_eq!(record.votes.len(), 1);
    assert!(matches!(
        decisions.get_vote_status(&vote).unwrap(),
        VoteStatusReport::Open { votes_cast: 1, total_voters: 2, .. }
    ));
}

#[test]
fn test_statistics_are_idempotent() {
    let collective = collective();
    let scheduler = collective.scheduler();
    scheduler.register_worker(WorkerSpec::new("w")).unwrap();
    let id = scheduler.create_task(TaskSpec::new("t")).unwrap();
    scheduler.create_task(TaskSpec::new("u")).unwrap();
    scheduler.allocate_tasks();
    scheduler.complete_task(&id, json!({}), true).unwrap();

    assert_eq!(
        scheduler.get_allocation_statistics(),
        scheduler.get_allocation_statistics()
    );
    assert_eq!(
        collective.decisions().get_decision_statistics(),
        collective.decisions().get_decision_statistics()
    );
}

#[test]
fn test_end_to_end_flow() {
    let collective = collective();
    let scheduler = collective.scheduler();
    let hub = collective.hub();

    scheduler
        .register_worker(
            WorkerSpec::new("fundamental_analyst").with_capability("fundamental_analysis", 0.9),
        )
        .unwrap();
    scheduler
        .register_worker(WorkerSpec::new("risk_manager").with_capability("risk_assessment", 0.8))
        .unwrap();

    let fundamentals = scheduler
        .create_task(
            TaskSpec::new("fundamentals")
                .requiring(["fundamental_analysis"])
                .with_estimated_duration(30.0),
        )
        .unwrap();
    let risk = scheduler
        .create_task(
            TaskSpec::new("risk")
                .requiring(["risk_assessment"])
                .depends_on(fundamentals.clone()),
        )
        .unwrap();

    assert_eq!(scheduler.allocate_tasks(), vec![fundamentals.clone()]);
    scheduler.start_task(&fundamentals).unwrap();
    scheduler.complete_task(&fundamentals, json!({"score": 8}), true).unwrap();
    assert_eq!(scheduler.allocate_tasks(), vec![risk.clone()]);
    scheduler.complete_task(&risk, json!({"level": "moderate"}), true).unwrap();

    let delegation = hub
        .delegate_task(
            "risk_manager",
            "fundamental_analyst",
            "risk",
            "double-check leverage",
            "second opinion",
            None,
        )
        .unwrap();
    let message_id = hub.get_delegation(&delegation).unwrap().message_id;
    hub.respond_to_message(
        &message_id,
        json!({"eta": "1h"}),
        agora_collective::ResponseType::Accept,
    )
    .unwrap();

    let vote = collective
        .decisions()
        .create_vote(VoteRequest::new(
            "Invest?",
            ["Buy", "Hold", "Sell"],
            ["fundamental_analyst", "risk_manager"],
            DecisionType::Majority,
        ))
        .unwrap();
    collective.decisions().cast_vote(&vote, "fundamental_analyst", "Buy").unwrap();
    let result = collective
        .decisions()
        .cast_vote(&vote, "risk_manager", "Buy")
        .unwrap()
        .unwrap();
    assert_eq!(result.winner, "Buy");

    let inbox = hub.get_messages_for_agent("risk_manager", false);
    assert!(inbox.iter().any(|m| m.message_type == MessageType::TaskDelegation));
    assert!(inbox.iter().any(|m| m.message_type == MessageType::DecisionRequest));
    assert!(inbox.iter().any(|m| m.message_type == MessageType::Feedback));

    let analysis = collective.analytics().analyze_collaboration_patterns();
    assert_eq!(analysis.task_metrics.completed_tasks, 2);
    assert_eq!(analysis.decision_metrics.completed_votes, 1);
    assert_eq!(analysis.communication_metrics.response_pairs, 1);
    // Every source is at its best: instant responses, all tasks done, unanimous vote
    assert!(approx(analysis.collaboration_efficiency, 1.0));
    assert!(analysis.bottlenecks.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_vote_finalizes_exactly_once_under_concurrency() {
    let collective = Arc::new(collective());
    let voters: Vec<String> = (0..32).map(|i| format!("voter-{}", i)).collect();

    let vote = collective
        .decisions()
        .create_vote(VoteRequest::new(
            "Concurrent",
            ["Yes", "No"],
            voters.clone(),
            DecisionType::Majority,
        ))
        .unwrap();

    let handles: Vec<_> = voters
        .into_iter()
        .enumerate()
        .map(|(i, voter)| {
            let collective = Arc::clone(&collective);
            let vote = vote.clone();
            tokio::spawn(async move {
                let option = if i % 3 == 0 { "No" } else { "Yes" };
                collective.decisions().cast_vote(&vote, &voter, option)
            })
        })
        .collect();

    let mut finalizations = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            finalizations += 1;
        }
    }
    assert_eq!(finalizations, 1);

    let err = collective
        .decisions()
        .cast_vote(&vote, "voter-0", "Yes")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    let record = collective.decisions().get_vote(&vote).unwrap();
    assert_eq!(record.votes.len(), 32);
    assert_eq!(record.result.as_deref(), Some("Yes"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completion_keeps_workload_non_negative() {
    let collective = Arc::new(collective());
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(WorkerSpec::new("w").with_max_workload(10_000.0))
        .unwrap();

    let ids: Vec<String> = (0..50)
        .map(|i| {
            scheduler
                .create_task(TaskSpec::new(format!("t{}", i)).with_estimated_duration(10.0))
                .unwrap()
        })
        .collect();
    assert_eq!(scheduler.allocate_tasks().len(), 50);

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let collective = Arc::clone(&collective);
            tokio::spawn(async move {
                collective.scheduler().complete_task(&id, json!({}), true)
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let worker = collective.scheduler().get_worker("w").unwrap();
    assert_eq!(worker.current_workload, 0.0);
    assert_eq!(worker.completed_count, 50);
    assert_eq!(worker.success_rate, 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_racing_allocation_keeps_workload_consistent() {
    let collective = Arc::new(collective());
    let scheduler = collective.scheduler();
    scheduler
        .register_worker(WorkerSpec::new("w").with_max_workload(10_000.0))
        .unwrap();

    let ids: Vec<String> = (0..40)
        .map(|i| {
            scheduler
                .create_task(TaskSpec::new(format!("t{}", i)).with_estimated_duration(10.0))
                .unwrap()
        })
        .collect();

    let allocator = {
        let collective = Arc::clone(&collective);
        tokio::spawn(async move { collective.scheduler().allocate_tasks() })
    };
    let cancels: Vec<_> = ids
        .iter()
        .step_by(2)
        .cloned()
        .map(|id| {
            let collective = Arc::clone(&collective);
            tokio::spawn(async move { collective.scheduler().cancel_task(&id) })
        })
        .collect();

    allocator.await.unwrap();
    for handle in cancels {
        // Pending and Assigned tasks can both be cancelled
        handle.await.unwrap().unwrap();
    }

    let scheduler = collective.scheduler();
    let mut assigned_effort = 0.0;
    for (i, id) in ids.iter().enumerate() {
        let task = scheduler.get_task(id).unwrap();
        if i % 2 == 0 {
            assert_eq!(task.status, TaskStatus::Cancelled, "task {}", i);
        } else {
            assert_eq!(task.status, TaskStatus::Assigned, "task {}", i);
            assert_eq!(task.assigned_worker.as_deref(), Some("w"));
            assigned_effort += task.estimated_duration;
        }
    }

    let worker = scheduler.get_worker("w").unwrap();
    assert!(worker.current_workload >= 0.0);
    assert!(approx(worker.current_workload, assigned_effort));
    assert!(approx(assigned_effort, 200.0));
}
