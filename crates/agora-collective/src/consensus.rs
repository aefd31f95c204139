//! Collective decision-making through votes.
//!
//! The [`DecisionEngine`] owns every vote. A vote is created open, collects
//! one choice per voter, and is finalized exactly once: either when the last
//! voter casts, or early through [`DecisionEngine::close_vote`].

use crate::hub::{MessageHub, MessagePriority, MessageType, OutgoingMessage};
use crate::types::{
    check_name, new_id, CollectiveError, EntityKind, Result, VoteId, WorkerName,
};
use crate::voting::{self, DecisionResult, DecisionType};
use agora_config::DecisionConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a vote still accepts choices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    Open,
    Closed,
}

/// A vote and everything cast on it so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingRecord {
    pub id: VoteId,
    pub topic: String,
    pub decision_type: DecisionType,

    /// Options in the order given at creation; this order breaks ties
    pub options: Vec<String>,

    pub voters: BTreeSet<WorkerName>,

    /// Voter to chosen option
    pub votes: BTreeMap<WorkerName, String>,

    /// Explicit voter weights for weighted decisions
    pub weights: BTreeMap<WorkerName, f64>,

    /// Voter roles for hierarchical decisions
    pub roles: BTreeMap<WorkerName, String>,

    pub state: VoteState,

    /// Winning option or a sentinel, set on finalization
    pub result: Option<String>,

    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl VotingRecord {
    pub fn is_open(&self) -> bool {
        self.state == VoteState::Open
    }
}

/// Parameters for [`DecisionEngine::create_vote`].
#[derive(Debug, Clone)]
pub struct VoteRequest {
    topic: String,
    options: Vec<String>,
    voters: Vec<String>,
    decision_type: DecisionType,
    weights: Vec<(String, f64)>,
    roles: Vec<(String, String)>,
}

impl VoteRequest {
    pub fn new<O, V>(
        topic: impl Into<String>,
        options: O,
        voters: V,
        decision_type: DecisionType,
    ) -> Self
    where
        O: IntoIterator,
        O::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            topic: topic.into(),
            options: options.into_iter().map(Into::into).collect(),
            voters: voters.into_iter().map(Into::into).collect(),
            decision_type,
            weights: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_weight(mut self, voter: impl Into<String>, weight: f64) -> Self {
        self.weights.push((voter.into(), weight));
        self
    }

    pub fn with_weights<I, S>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.weights
            .extend(weights.into_iter().map(|(v, w)| (v.into(), w)));
        self
    }

    /// Declare a voter's role (e.g., "chairman") for hierarchical decisions.
    pub fn with_role(mut self, voter: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles.push((voter.into(), role.into()));
        self
    }
}

/// Progress or outcome of a vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteStatusReport {
    Open {
        topic: String,
        votes_cast: usize,
        total_voters: usize,
    },
    Closed {
        topic: String,
        result: String,
        confidence: f64,
        closed_at: DateTime<Utc>,
    },
}

/// Aggregate statistics over every vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionStatistics {
    pub total_votes: usize,
    pub active_votes: usize,
    pub completed_votes: usize,

    /// Completed votes per decision type
    pub decision_type_distribution: BTreeMap<String, usize>,

    /// Mean confidence of completed votes, 0 when none completed
    pub average_confidence: f64,
}

#[derive(Debug, Default)]
struct DecisionState {
    votes: HashMap<VoteId, VotingRecord>,
}

/// Owner of every vote.
#[derive(Debug)]
pub struct DecisionEngine {
    config: DecisionConfig,
    hub: Arc<MessageHub>,
    state: Mutex<DecisionState>,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig, hub: Arc<MessageHub>) -> Self {
        let role_weights = config
            .role_weights
            .iter()
            .map(|(role, weight)| (normalize_role(role), *weight))
            .collect();

        Self {
            config: DecisionConfig {
                role_weights,
                ..config
            },
            hub,
            state: Mutex::new(DecisionState::default()),
        }
    }

    /// Open a vote and ask every voter for a decision.
    pub fn create_vote(&self, request: VoteRequest) -> Result<VoteId> {
        let record = self.build_record(request)?;
        let id = record.id.clone();

        let request_content = serde_json::json!({
            "vote_id": record.id,
            "topic": record.topic,
            "options": record.options,
            "decision_type": record.decision_type.as_str(),
        });
        let voters: Vec<String> = record.voters.iter().cloned().collect();
        let topic = record.topic.clone();

        self.state.lock().votes.insert(id.clone(), record);
        info!(
            vote_id = %id,
            topic = %topic,
            voters = voters.len(),
            "Vote created"
        );

        for voter in voters {
            self.notify(
                OutgoingMessage::new(
                    self.config.sender_name.as_str(),
                    voter,
                    MessageType::DecisionRequest,
                    format!("Decision requested: {}", topic),
                    request_content.clone(),
                )
                .with_priority(MessagePriority::High)
                .requiring_response(),
            );
        }

        Ok(id)
    }

    fn build_record(&self, request: VoteRequest) -> Result<VotingRecord> {
        let options = request.options;
        if options.is_empty() {
            return Err(CollectiveError::InvalidArgument(
                "a vote needs at least one option".to_string(),
            ));
        }
        for option in &options {
            check_name("vote option", option)?;
        }
        let unique: BTreeSet<&String> = options.iter().collect();
        if unique.len() != options.len() {
            return Err(CollectiveError::InvalidArgument(
                "vote options must be distinct".to_string(),
            ));
        }

        let mut voters = BTreeSet::new();
        for voter in request.voters {
            check_name("voter name", &voter)?;
            if voters.contains(&voter) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "duplicate voter: {}",
                    voter
                )));
            }
            voters.insert(voter);
        }
        if voters.is_empty() {
            return Err(CollectiveError::InvalidArgument(
                "a vote needs at least one voter".to_string(),
            ));
        }

        let mut weights = BTreeMap::new();
        for (voter, weight) in request.weights {
            if !voters.contains(&voter) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "weight given for unregistered voter: {}",
                    voter
                )));
            }
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "weight for {} must be a non-negative number",
                    voter
                )));
            }
            weights.insert(voter, weight);
        }

        let mut roles = BTreeMap::new();
        for (voter, role) in request.roles {
            if !voters.contains(&voter) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "role given for unregistered voter: {}",
                    voter
                )));
            }
            roles.insert(voter, normalize_role(&role));
        }

        Ok(VotingRecord {
            id: new_id(),
            topic: request.topic,
            decision_type: request.decision_type,
            options,
            voters,
            votes: BTreeMap::new(),
            weights,
            roles,
            state: VoteState::Open,
            result: None,
            confidence: 0.0,
            created_at: Utc::now(),
            closed_at: None,
        })
    }

    /// Record `voter`'s choice.
    ///
    /// Returns the decision if this vote completed the ballot. A voter may
    /// change their choice while the vote is open.
    pub fn cast_vote(
        &self,
        vote_id: &str,
        voter: &str,
        option: &str,
    ) -> Result<Option<DecisionResult>> {
        let finalized = {
            let mut state = self.state.lock();
            let record = state
                .votes
                .get_mut(vote_id)
                .ok_or_else(|| CollectiveError::not_found(EntityKind::Vote, vote_id))?;

            if !record.is_open() {
                return Err(CollectiveError::StateConflict(format!(
                    "vote {} is closed",
                    vote_id
                )));
            }
            if !record.voters.contains(voter) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "{} is not a voter on {}",
                    voter, vote_id
                )));
            }
            if !record.options.iter().any(|o| o == option) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "option {} is not offered by vote {}",
                    option, vote_id
                )));
            }

            record.votes.insert(voter.to_string(), option.to_string());
            debug!(
                vote_id,
                voter,
                option,
                cast = record.votes.len(),
                voters = record.voters.len(),
                "Vote cast"
            );

            if record.votes.len() == record.voters.len() {
                let result = self.finalize(record);
                Some((result, record.clone()))
            } else {
                None
            }
        };

        Ok(finalized.map(|(result, record)| {
            self.announce(&record);
            result
        }))
    }

    /// Finalize an open vote with whatever has been cast.
    pub fn close_vote(&self, vote_id: &str) -> Result<DecisionResult> {
        let (result, record) = {
            let mut state = self.state.lock();
            let record = state
                .votes
                .get_mut(vote_id)
                .ok_or_else(|| CollectiveError::not_found(EntityKind::Vote, vote_id))?;
            if !record.is_open() {
                return Err(CollectiveError::StateConflict(format!(
                    "vote {} is already closed",
                    vote_id
                )));
            }
            let result = self.finalize(record);
            (result, record.clone())
        };

        self.announce(&record);
        Ok(result)
    }

    fn finalize(&self, record: &mut VotingRecord) -> DecisionResult {
        let result = self.decide(record);
        record.state = VoteState::Closed;
        record.result = Some(result.winner.clone());
        record.confidence = result.confidence;
        record.closed_at = Some(Utc::now());

        info!(
            vote_id = %record.id,
            decision_type = record.decision_type.as_str(),
            winner = %result.winner,
            confidence = result.confidence,
            "Vote finalized"
        );
        result
    }

    fn decide(&self, record: &VotingRecord) -> DecisionResult {
        let options = &record.options;
        let votes = &record.votes;
        match record.decision_type {
            DecisionType::Unanimous => voting::unanimous(options, votes, record.voters.len()),
            DecisionType::Majority => voting::majority(options, votes),
            DecisionType::Weighted => voting::weighted(options, votes, |voter| {
                record
                    .weights
                    .get(voter)
                    .copied()
                    .unwrap_or(self.config.default_weight)
            }),
            DecisionType::Hierarchical => {
                voting::weighted(options, votes, |voter| self.role_weight(record, voter))
            }
            DecisionType::Consensus => {
                voting::consensus(options, votes, self.config.consensus_threshold)
            }
        }
    }

    fn role_weight(&self, record: &VotingRecord, voter: &str) -> f64 {
        record
            .roles
            .get(voter)
            .and_then(|role| self.config.role_weights.get(role))
            .copied()
            .unwrap_or(self.config.default_weight)
    }

    fn announce(&self, record: &VotingRecord) {
        let counts: BTreeMap<String, usize> = voting::tally(&record.options, &record.votes)
            .into_iter()
            .collect();
        let content = serde_json::json!({
            "vote_id": record.id,
            "topic": record.topic,
            "result": record.result,
            "confidence": record.confidence,
            "vote_counts": counts,
        });

        for voter in &record.voters {
            self.notify(OutgoingMessage::new(
                self.config.sender_name.as_str(),
                voter.as_str(),
                MessageType::StatusUpdate,
                format!("Decision result: {}", record.topic),
                content.clone(),
            ));
        }
    }

    fn notify(&self, message: OutgoingMessage) {
        if let Err(err) = self.hub.send_message(message) {
            warn!(error = %err, "Failed to deliver decision notification");
        }
    }

    pub fn get_vote_status(&self, vote_id: &str) -> Result<VoteStatusReport> {
        let state = self.state.lock();
        let record = state
            .votes
            .get(vote_id)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Vote, vote_id))?;

        Ok(match record.state {
            VoteState::Open => VoteStatusReport::Open {
                topic: record.topic.clone(),
                votes_cast: record.votes.len(),
                total_voters: record.voters.len(),
            },
            VoteState::Closed => VoteStatusReport::Closed {
                topic: record.topic.clone(),
                result: record.result.clone().unwrap_or_default(),
                confidence: record.confidence,
                closed_at: record.closed_at.unwrap_or(record.created_at),
            },
        })
    }

    pub fn get_vote(&self, vote_id: &str) -> Option<VotingRecord> {
        self.state.lock().votes.get(vote_id).cloned()
    }

    /// Open votes, oldest first.
    pub fn open_votes(&self) -> Vec<VotingRecord> {
        let state = self.state.lock();
        let mut open: Vec<VotingRecord> = state
            .votes
            .values()
            .filter(|v| v.is_open())
            .cloned()
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        open
    }

    pub fn get_decision_statistics(&self) -> DecisionStatistics {
        let state = self.state.lock();
        let mut distribution = BTreeMap::new();
        let mut confidence_total = 0.0;
        let mut completed = 0;

        for record in state.votes.values().filter(|v| !v.is_open()) {
            *distribution
                .entry(record.decision_type.as_str().to_string())
                .or_insert(0) += 1;
            confidence_total += record.confidence;
            completed += 1;
        }

        DecisionStatistics {
            total_votes: state.votes.len(),
            active_votes: state.votes.len() - completed,
            completed_votes: completed,
            decision_type_distribution: distribution,
            average_confidence: if completed == 0 {
                0.0
            } else {
                confidence_total / completed as f64
            },
        }
    }
}

fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase().replace(' ', "_")
}
