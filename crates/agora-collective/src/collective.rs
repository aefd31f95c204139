//! The engine context: one hub shared by one scheduler and one decision engine.

use crate::analytics::CollaborationAnalytics;
use crate::consensus::DecisionEngine;
use crate::hub::MessageHub;
use crate::scheduler::Scheduler;
use crate::types::Result;
use agora_config::AgoraConfig;
use std::sync::Arc;
use tracing::info;

/// Every engine component for one run, built from a single configuration.
///
/// Construct one per process (or per test) and share it by reference or
/// inside an `Arc`. Components are independent owners of their own state and
/// talk to each other only through the hub.
#[derive(Debug)]
pub struct Collective {
    config: AgoraConfig,
    hub: Arc<MessageHub>,
    scheduler: Scheduler,
    decisions: DecisionEngine,
}

impl Collective {
    pub fn new(config: AgoraConfig) -> Result<Self> {
        config.validate()?;

        let hub = Arc::new(MessageHub::new(config.hub.clone()));
        let scheduler = Scheduler::new(config.scheduler.clone(), Arc::clone(&hub))?;
        let decisions = DecisionEngine::new(config.decisions.clone(), Arc::clone(&hub));

        info!(
            allocation_mode = ?config.scheduler.allocation_mode,
            load_balancing = config.scheduler.load_balancing,
            "Collective initialized"
        );

        Ok(Self {
            config,
            hub,
            scheduler,
            decisions,
        })
    }

    pub fn hub(&self) -> &Arc<MessageHub> {
        &self.hub
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn decisions(&self) -> &DecisionEngine {
        &self.decisions
    }

    pub fn analytics(&self) -> CollaborationAnalytics<'_> {
        CollaborationAnalytics::new(
            &self.scheduler,
            &self.decisions,
            &self.hub,
            &self.config.analytics,
        )
    }

    pub fn config(&self) -> &AgoraConfig {
        &self.config
    }
}
