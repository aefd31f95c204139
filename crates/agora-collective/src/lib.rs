//! Dynamic task allocation and collective decision-making for agent pools.
//!
//! This crate coordinates a pool of named workers:
//!
//! - **Worker Registry**: Workers declare capabilities, proficiency scores and capacity
//! - **Scheduling**: Tasks are matched to the fittest available worker under
//!   priority, dependency and load constraints
//! - **Collective Decisions**: Voters choose among options and one of five
//!   algorithms turns their choices into a single outcome
//! - **Message Hub**: Point-to-point messages, task delegations and
//!   collaboration groups, with a broadcast feed of every message
//! - **Analytics**: Read-only efficiency scoring and bottleneck detection
//!
//! # Usage
//!
//! ```ignore
//! use agora_collective::{Collective, TaskSpec, VoteRequest, DecisionType, WorkerSpec};
//!
//! let collective = Collective::new(AgoraConfig::default())?;
//! let scheduler = collective.scheduler();
//!
//! scheduler.register_worker(WorkerSpec::new("analyst").with_capability("valuation", 0.9))?;
//! let task = scheduler.create_task(TaskSpec::new("value ACME").requiring(["valuation"]))?;
//! scheduler.allocate_tasks();
//! scheduler.complete_task(&task, json!({"fair_value": 12.5}), true)?;
//!
//! let vote = collective.decisions().create_vote(VoteRequest::new(
//!     "Invest in ACME?",
//!     ["Buy", "Hold", "Sell"],
//!     ["analyst", "risk_manager"],
//!     DecisionType::Majority,
//! ))?;
//! ```

pub mod analytics;
pub mod capability;
pub mod collective;
pub mod consensus;
pub mod hub;
pub mod scheduler;
pub mod types;
pub mod voting;

// Re-export main types for convenience
pub use analytics::{
    AllocationOptimization, Bottleneck, BottleneckKind, CollaborationAnalysis,
    CollaborationAnalytics,
};
pub use capability::{
    fitness, Capability, ComplexityTier, DefaultFitness, FitnessPolicy, WorkerProfile,
    WorkerRegistry, WorkerSpec,
};
pub use collective::Collective;
pub use consensus::{
    DecisionEngine, DecisionStatistics, VoteRequest, VoteState, VoteStatusReport, VotingRecord,
};
pub use hub::{
    Collaboration, CommunicationLoad, CommunicationReport, DelegationRecord, DelegationStatus,
    Message, MessageHub, MessagePriority, MessageType, OutgoingMessage, ParticipantActivity,
    ResponseType,
};
pub use scheduler::{
    AllocationRecord, AllocationStatistics, Scheduler, Task, TaskSpec, TaskStatus, WorkerTally,
    WorkerWorkload,
};
pub use types::{CollectiveError, EntityKind, ErrorKind, Result};
pub use voting::{DecisionResult, DecisionType, NO_CONSENSUS, NO_VOTES};
