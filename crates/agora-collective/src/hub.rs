//! Message hub for point-to-point messages, delegations and collaborations.
//!
//! The hub keeps an append-only message log with per-receiver inboxes, a set
//! of mutable delegation records, and ad-hoc collaboration groups. Every
//! appended message is also published on a broadcast channel so callers can
//! react to events instead of polling.

use crate::types::{
    check_name, new_id, CollaborationId, CollectiveError, DelegationId, EntityKind, MessageId,
    Result, WorkerName,
};
use agora_config::HubConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Kind of hub message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TaskDelegation,
    InformationRequest,
    InformationShare,
    CollaborationInvite,
    StatusUpdate,
    ErrorReport,
    DecisionRequest,
    Feedback,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::TaskDelegation => "task_delegation",
            MessageType::InformationRequest => "information_request",
            MessageType::InformationShare => "information_share",
            MessageType::CollaborationInvite => "collaboration_invite",
            MessageType::StatusUpdate => "status_update",
            MessageType::ErrorReport => "error_report",
            MessageType::DecisionRequest => "decision_request",
            MessageType::Feedback => "feedback",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = CollectiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "task_delegation" => Ok(MessageType::TaskDelegation),
            "information_request" => Ok(MessageType::InformationRequest),
            "information_share" => Ok(MessageType::InformationShare),
            "collaboration_invite" => Ok(MessageType::CollaborationInvite),
            "status_update" => Ok(MessageType::StatusUpdate),
            "error_report" => Ok(MessageType::ErrorReport),
            "decision_request" => Ok(MessageType::DecisionRequest),
            "feedback" => Ok(MessageType::Feedback),
            other => Err(CollectiveError::InvalidArgument(format!(
                "unknown message type: {}",
                other
            ))),
        }
    }
}

/// Delivery urgency of a message.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A message in the hub log. Never mutated after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: WorkerName,
    pub receiver: WorkerName,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub subject: String,

    /// Opaque payload; its shape is a convention per message type
    pub content: serde_json::Value,

    pub timestamp: DateTime<Utc>,
    pub requires_response: bool,
    pub response_deadline: Option<DateTime<Utc>>,

    #[serde(default)]
    pub attachments: Vec<String>,

    /// Message this one answers (set on feedback messages)
    pub in_reply_to: Option<MessageId>,
}

/// A message to be sent through [`MessageHub::send_message`].
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    sender: String,
    receiver: String,
    message_type: MessageType,
    priority: MessagePriority,
    subject: String,
    content: serde_json::Value,
    requires_response: bool,
    response_deadline: Option<DateTime<Utc>>,
    attachments: Vec<String>,
    in_reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        message_type: MessageType,
        subject: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            message_type,
            priority: MessagePriority::default(),
            subject: subject.into(),
            content,
            requires_response: false,
            response_deadline: None,
            attachments: Vec::new(),
            in_reply_to: None,
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn requiring_response(mut self) -> Self {
        self.requires_response = true;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.response_deadline = Some(deadline);
        self
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachments.push(attachment.into());
        self
    }

    fn in_reply_to(mut self, id: impl Into<String>) -> Self {
        self.in_reply_to = Some(id.into());
        self
    }
}

/// How a participant answers a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Accept,
    Reject,
    Acknowledge,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Accept => "accept",
            ResponseType::Reject => "reject",
            ResponseType::Acknowledge => "acknowledge",
        }
    }
}

/// Status of a delegation record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Failed,
}

impl DelegationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationStatus::Pending => "pending",
            DelegationStatus::Accepted => "accepted",
            DelegationStatus::Rejected => "rejected",
            DelegationStatus::Completed => "completed",
            DelegationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DelegationStatus::Rejected | DelegationStatus::Completed | DelegationStatus::Failed
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DelegationStatus::Pending | DelegationStatus::Accepted)
    }
}

/// A tracked hand-off of a task between two participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelegationRecord {
    pub id: DelegationId,
    pub delegator: WorkerName,
    pub delegatee: WorkerName,
    pub original_task: String,
    pub delegated_task: String,
    pub reason: String,
    pub deadline: Option<DateTime<Utc>>,
    pub status: DelegationStatus,

    /// Completion fraction, 0.0 to 1.0
    pub progress: f64,

    pub feedback: Vec<String>,

    /// Id of the task delegation message announcing this record
    pub message_id: MessageId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named group of participants working on one topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collaboration {
    pub id: CollaborationId,
    pub initiator: WorkerName,
    pub topic: String,

    /// Every member, initiator included
    pub participants: BTreeSet<WorkerName>,

    pub created_at: DateTime<Utc>,
}

/// Communication load of one participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CommunicationLoad {
    pub active_delegations: usize,
    pub pending_messages: usize,
    pub collaboration_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantActivity {
    pub name: WorkerName,

    /// Messages sent plus messages received
    pub message_count: usize,
}

/// Snapshot of hub traffic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunicationReport {
    pub total_messages: usize,
    pub total_delegations: usize,
    pub active_collaborations: usize,
    pub message_type_distribution: BTreeMap<String, usize>,
    pub delegation_status_distribution: BTreeMap<String, usize>,
    pub most_active_participants: Vec<ParticipantActivity>,

    /// Feedback messages matched to an original that required a response
    pub response_pairs: usize,

    pub mean_response_secs: Option<f64>,
    pub communication_efficiency: f64,
}

#[derive(Debug, Default)]
struct HubState {
    log: Vec<Message>,
    index: HashMap<MessageId, usize>,
    inboxes: HashMap<WorkerName, Vec<usize>>,
    read: HashMap<WorkerName, HashSet<MessageId>>,
    delegations: BTreeMap<DelegationId, DelegationRecord>,
    collaborations: BTreeMap<CollaborationId, Collaboration>,
}

impl HubState {
    fn append(&mut self, outgoing: OutgoingMessage) -> Result<Message> {
        check_name("message sender", &outgoing.sender)?;
        check_name("message receiver", &outgoing.receiver)?;

        let message = Message {
            id: new_id(),
            sender: outgoing.sender,
            receiver: outgoing.receiver,
            message_type: outgoing.message_type,
            priority: outgoing.priority,
            subject: outgoing.subject,
            content: outgoing.content,
            timestamp: Utc::now(),
            requires_response: outgoing.requires_response,
            response_deadline: outgoing.response_deadline,
            attachments: outgoing.attachments,
            in_reply_to: outgoing.in_reply_to,
        };

        let position = self.log.len();
        self.index.insert(message.id.clone(), position);
        self.inboxes
            .entry(message.receiver.clone())
            .or_default()
            .push(position);
        self.log.push(message.clone());

        Ok(message)
    }

    fn is_read(&self, agent: &str, id: &str) -> bool {
        self.read.get(agent).is_some_and(|ids| ids.contains(id))
    }

    fn unread_count(&self, agent: &str) -> usize {
        self.inboxes.get(agent).map_or(0, |positions| {
            positions
                .iter()
                .filter(|&&p| !self.is_read(agent, &self.log[p].id))
                .count()
        })
    }

    /// Latencies in seconds between a message requiring a response and its
    /// feedback messages.
    fn response_latencies(&self) -> Vec<f64> {
        self.log
            .iter()
            .filter(|m| m.message_type == MessageType::Feedback)
            .filter_map(|reply| {
                let original = reply
                    .in_reply_to
                    .as_ref()
                    .and_then(|id| self.index.get(id))
                    .map(|&p| &self.log[p])?;
                if !original.requires_response {
                    return None;
                }
                let elapsed = reply.timestamp - original.timestamp;
                Some(elapsed.num_milliseconds().max(0) as f64 / 1000.0)
            })
            .collect()
    }
}

/// Efficiency for a mean response latency; 0.5 when nothing was answered.
fn communication_efficiency(latencies: &[f64], baseline_secs: f64) -> f64 {
    if latencies.is_empty() {
        return 0.5;
    }
    let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;
    if mean <= 0.0 {
        return 1.0;
    }
    let efficiency = (baseline_secs / mean).clamp(0.0, 1.0);
    (efficiency * 100.0).round() / 100.0
}

/// Append-only message log plus delegation and collaboration tracking.
#[derive(Debug)]
pub struct MessageHub {
    config: HubConfig,
    state: Mutex<HubState>,
    events: broadcast::Sender<Message>,
}

impl MessageHub {
    pub fn new(config: HubConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            config,
            state: Mutex::new(HubState::default()),
            events,
        }
    }

    /// Receive every message appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    fn publish(&self, message: &Message) {
        // No subscribers is not an error
        let _ = self.events.send(message.clone());
    }

    /// Append a message to the log and the receiver's inbox.
    pub fn send_message(&self, message: OutgoingMessage) -> Result<MessageId> {
        let mut state = self.state.lock();
        let message = state.append(message)?;
        self.publish(&message);

        debug!(
            message_id = %message.id,
            sender = %message.sender,
            receiver = %message.receiver,
            message_type = %message.message_type,
            "Message sent"
        );
        Ok(message.id)
    }

    /// Record a delegation and announce it to the delegatee.
    pub fn delegate_task(
        &self,
        delegator: &str,
        delegatee: &str,
        original_task: &str,
        delegated_task: &str,
        reason: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<DelegationId> {
        let delegation_id = new_id();
        let content = serde_json::json!({
            "delegation_id": delegation_id,
            "original_task": original_task,
            "delegated_task": delegated_task,
            "reason": reason,
            "deadline": deadline,
        });

        let mut outgoing = OutgoingMessage::new(
            delegator,
            delegatee,
            MessageType::TaskDelegation,
            format!("Task delegation: {}", delegated_task),
            content,
        )
        .with_priority(MessagePriority::High)
        .requiring_response();
        if let Some(deadline) = deadline {
            outgoing = outgoing.with_deadline(deadline);
        }

        let mut state = self.state.lock();
        let message = state.append(outgoing)?;

        let now = Utc::now();
        let record = DelegationRecord {
            id: delegation_id.clone(),
            delegator: message.sender.clone(),
            delegatee: message.receiver.clone(),
            original_task: original_task.to_string(),
            delegated_task: delegated_task.to_string(),
            reason: reason.to_string(),
            deadline,
            status: DelegationStatus::Pending,
            progress: 0.0,
            feedback: Vec::new(),
            message_id: message.id.clone(),
            created_at: now,
            updated_at: now,
        };
        state.delegations.insert(delegation_id.clone(), record);
        self.publish(&message);

        info!(
            delegation_id = %delegation_id,
            delegator = %message.sender,
            delegatee = %message.receiver,
            "Task delegated"
        );
        Ok(delegation_id)
    }

    /// Answer a message with a feedback message and mark the original read.
    pub fn respond_to_message(
        &self,
        message_id: &str,
        content: serde_json::Value,
        response_type: ResponseType,
    ) -> Result<MessageId> {
        let mut state = self.state.lock();
        let original = state
            .index
            .get(message_id)
            .map(|&p| state.log[p].clone())
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Message, message_id))?;

        let reply = OutgoingMessage::new(
            original.receiver.clone(),
            original.sender.clone(),
            MessageType::Feedback,
            format!("Re: {}", original.subject),
            serde_json::json!({
                "original_message_id": original.id,
                "response_type": response_type.as_str(),
                "response_content": content,
            }),
        )
        .in_reply_to(original.id.clone());

        let reply = state.append(reply)?;
        state
            .read
            .entry(original.receiver.clone())
            .or_default()
            .insert(original.id.clone());
        self.publish(&reply);

        info!(
            message_id = %reply.id,
            in_reply_to = %original.id,
            response_type = response_type.as_str(),
            "Response sent"
        );
        Ok(reply.id)
    }

    /// Create a collaboration group and invite every participant.
    pub fn start_collaboration(
        &self,
        initiator: &str,
        participants: &[&str],
        topic: &str,
    ) -> Result<CollaborationId> {
        check_name("collaboration initiator", initiator)?;
        for participant in participants {
            check_name("collaboration participant", participant)?;
        }

        let invitees: BTreeSet<String> = participants
            .iter()
            .filter(|p| **p != initiator)
            .map(|p| p.to_string())
            .collect();
        if invitees.is_empty() {
            return Err(CollectiveError::InvalidArgument(
                "collaboration needs at least one participant besides the initiator".to_string(),
            ));
        }

        let id = new_id();
        let mut members = invitees.clone();
        members.insert(initiator.to_string());

        let mut state = self.state.lock();
        for invitee in &invitees {
            let invite = OutgoingMessage::new(
                initiator,
                invitee.as_str(),
                MessageType::CollaborationInvite,
                format!("Collaboration invite: {}", topic),
                serde_json::json!({
                    "collaboration_id": id,
                    "topic": topic,
                    "initiator": initiator,
                    "participants": members,
                }),
            )
            .requiring_response();
            let message = state.append(invite)?;
            self.publish(&message);
        }

        state.collaborations.insert(
            id.clone(),
            Collaboration {
                id: id.clone(),
                initiator: initiator.to_string(),
                topic: topic.to_string(),
                participants: members,
                created_at: Utc::now(),
            },
        );

        info!(
            collaboration_id = %id,
            topic,
            participants = invitees.len(),
            "Collaboration started"
        );
        Ok(id)
    }

    /// Update a delegation record's status, progress and feedback.
    pub fn update_delegation_status(
        &self,
        delegation_id: &str,
        status: DelegationStatus,
        progress: Option<f64>,
        feedback: Option<&str>,
    ) -> Result<()> {
        if let Some(progress) = progress {
            if !(0.0..=1.0).contains(&progress) {
                return Err(CollectiveError::InvalidArgument(format!(
                    "delegation progress must be within [0, 1], got {}",
                    progress
                )));
            }
        }

        let mut state = self.state.lock();
        let record = state
            .delegations
            .get_mut(delegation_id)
            .ok_or_else(|| CollectiveError::not_found(EntityKind::Delegation, delegation_id))?;

        if record.status.is_terminal() {
            return Err(CollectiveError::StateConflict(format!(
                "delegation {} is already {}",
                delegation_id,
                record.status.as_str()
            )));
        }

        record.status = status;
        if let Some(progress) = progress {
            record.progress = progress;
        }
        if let Some(feedback) = feedback.filter(|f| !f.is_empty()) {
            record.feedback.push(feedback.to_string());
        }
        record.updated_at = Utc::now();

        info!(delegation_id, status = status.as_str(), "Delegation updated");
        Ok(())
    }

    /// Messages addressed to `agent`, oldest first.
    pub fn get_messages_for_agent(&self, agent: &str, unread_only: bool) -> Vec<Message> {
        let state = self.state.lock();
        state.inboxes.get(agent).map_or_else(Vec::new, |positions| {
            positions
                .iter()
                .map(|&p| &state.log[p])
                .filter(|m| !unread_only || !state.is_read(agent, &m.id))
                .cloned()
                .collect()
        })
    }

    /// Mark messages in `agent`'s inbox as read; returns how many changed.
    ///
    /// Ids that are unknown or addressed to someone else are ignored.
    pub fn acknowledge_messages(&self, agent: &str, ids: &[&str]) -> usize {
        let mut state = self.state.lock();
        let owned: Vec<String> = ids
            .iter()
            .filter(|id| {
                state
                    .index
                    .get(**id)
                    .is_some_and(|&p| state.log[p].receiver == agent)
            })
            .map(|id| id.to_string())
            .collect();

        let read = state.read.entry(agent.to_string()).or_default();
        owned.into_iter().filter(|id| read.insert(id.clone())).count()
    }

    /// Communication load of `agent`; unknown names have zero load.
    pub fn get_agent_workload(&self, agent: &str) -> CommunicationLoad {
        let state = self.state.lock();
        CommunicationLoad {
            active_delegations: state
                .delegations
                .values()
                .filter(|d| d.delegatee == agent && d.status.is_active())
                .count(),
            pending_messages: state.unread_count(agent),
            collaboration_count: state
                .collaborations
                .values()
                .filter(|c| c.participants.contains(agent))
                .count(),
        }
    }

    pub fn generate_communication_report(&self) -> CommunicationReport {
        let state = self.state.lock();

        let mut message_type_distribution = BTreeMap::new();
        let mut activity: HashMap<&str, usize> = HashMap::new();
        for message in &state.log {
            *message_type_distribution
                .entry(message.message_type.as_str().to_string())
                .or_insert(0) += 1;
            *activity.entry(message.sender.as_str()).or_insert(0) += 1;
            *activity.entry(message.receiver.as_str()).or_insert(0) += 1;
        }

        let mut delegation_status_distribution = BTreeMap::new();
        for record in state.delegations.values() {
            *delegation_status_distribution
                .entry(record.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut most_active: Vec<ParticipantActivity> = activity
            .into_iter()
            .map(|(name, message_count)| ParticipantActivity {
                name: name.to_string(),
                message_count,
            })
            .collect();
        most_active.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        most_active.truncate(self.config.most_active_limit);

        let latencies = state.response_latencies();
        let mean_response_secs = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };

        CommunicationReport {
            total_messages: state.log.len(),
            total_delegations: state.delegations.len(),
            active_collaborations: state.collaborations.len(),
            message_type_distribution,
            delegation_status_distribution,
            most_active_participants: most_active,
            response_pairs: latencies.len(),
            mean_response_secs,
            communication_efficiency: communication_efficiency(
                &latencies,
                self.config.response_baseline_secs,
            ),
        }
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        let state = self.state.lock();
        state.index.get(id).map(|&p| state.log[p].clone())
    }

    pub fn get_delegation(&self, id: &str) -> Option<DelegationRecord> {
        self.state.lock().delegations.get(id).cloned()
    }

    pub fn get_collaboration(&self, id: &str) -> Option<Collaboration> {
        self.state.lock().collaborations.get(id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().log.len()
    }
}

impl Default for MessageHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
