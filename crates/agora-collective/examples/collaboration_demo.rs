//! Collaboration Demo
//!
//! Runs an investment committee through task allocation, delegation and a
//! hierarchical vote, then prints the analytics report.
//!
//! Pass a TOML config path as the first argument to override defaults.
//! Set `RUST_LOG=debug` to see fitness scoring.

use agora_collective::{
    Collective, ComplexityTier, DecisionType, DelegationStatus, ResponseType, TaskSpec,
    VoteRequest, WorkerSpec,
};
use agora_config::AgoraConfig;
use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AgoraConfig::load_or_default(config_path.as_deref())?;
    let collective = Collective::new(config)?;

    // Print every message as the hub records it
    let mut events = collective.hub().subscribe();
    let listener = tokio::spawn(async move {
        let mut seen = 0usize;
        while let Ok(message) = events.recv().await {
            seen += 1;
            println!(
                "  [{}] {} -> {}: {}",
                message.message_type, message.sender, message.receiver, message.subject
            );
        }
        seen
    });

    println!("=== Registering workers ===\n");
    let scheduler = collective.scheduler();
    scheduler.register_worker(
        WorkerSpec::new("fundamental_analyst")
            .with_capability("fundamental_analysis", 0.9)
            .with_capability("industry_analysis", 0.7),
    )?;
    scheduler.register_worker(
        WorkerSpec::new("technical_analyst")
            .with_capability("technical_analysis", 0.85)
            .with_capabilities(["market_sentiment"]),
    )?;
    scheduler.register_worker(
        WorkerSpec::new("risk_manager")
            .with_capability("risk_assessment", 0.9)
            .with_max_workload(80.0),
    )?;

    println!("\n=== Allocating tasks ===\n");
    let fundamentals = scheduler.create_task(
        TaskSpec::new("Fundamental review")
            .requiring(["fundamental_analysis"])
            .with_estimated_duration(30.0)
            .with_priority(5),
    )?;
    let technicals = scheduler.create_task(
        TaskSpec::new("Chart review")
            .requiring(["technical_analysis"])
            .with_estimated_duration(20.0)
            .with_priority(4),
    )?;
    let risk = scheduler.create_task(
        TaskSpec::new("Risk assessment")
            .requiring(["risk_assessment"])
            .with_complexity(ComplexityTier::High)
            .depends_on(fundamentals.clone())
            .with_priority(6),
    )?;

    let assigned = scheduler.allocate_tasks();
    println!("\nAssigned {} task(s)", assigned.len());

    scheduler.complete_task(&fundamentals, json!({"fair_value": 142.5}), true)?;
    scheduler.complete_task(&technicals, json!({"trend": "up"}), true)?;
    let assigned = scheduler.allocate_tasks();
    println!("\nAssigned {} task(s) after dependencies cleared", assigned.len());
    scheduler.complete_task(&risk, json!({"level": "moderate"}), true)?;

    println!("\n=== Delegating ===\n");
    let hub = collective.hub();
    let delegation = hub.delegate_task(
        "risk_manager",
        "technical_analyst",
        "Risk assessment",
        "Volatility check",
        "needs chart expertise",
        None,
    )?;
    if let Some(record) = hub.get_delegation(&delegation) {
        hub.respond_to_message(
            &record.message_id,
            json!({"eta_minutes": 15}),
            ResponseType::Accept,
        )?;
    }
    hub.update_delegation_status(
        &delegation,
        DelegationStatus::Completed,
        Some(1.0),
        Some("volatility is low"),
    )?;

    println!("\n=== Voting ===\n");
    let decisions = collective.decisions();
    let vote = decisions.create_vote(
        VoteRequest::new(
            "Invest in ACME?",
            ["Buy", "Hold", "Sell"],
            ["chair", "fundamental_analyst", "technical_analyst", "risk_manager"],
            DecisionType::Hierarchical,
        )
        .with_role("chair", "chairman")
        .with_role("fundamental_analyst", "analyst")
        .with_role("technical_analyst", "analyst")
        .with_role("risk_manager", "investment_committee"),
    )?;
    decisions.cast_vote(&vote, "chair", "Buy")?;
    decisions.cast_vote(&vote, "fundamental_analyst", "Buy")?;
    decisions.cast_vote(&vote, "technical_analyst", "Hold")?;
    if let Some(result) = decisions.cast_vote(&vote, "risk_manager", "Hold")? {
        println!("\nDecision: {} (confidence {:.2})", result.winner, result.confidence);
    }

    println!("\n=== Analytics ===\n");
    let analytics = collective.analytics();
    let analysis = analytics.analyze_collaboration_patterns();
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    let plan = analytics.optimize_task_allocation();
    println!("{}", serde_json::to_string_pretty(&plan)?);

    // Closing the hub ends the listener
    drop(collective);
    let seen = listener.await?;
    println!("\nObserved {} hub message(s)", seen);

    Ok(())
}
