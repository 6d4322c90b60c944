use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipient marker for messages addressed to every capability.
pub const BROADCAST_RECIPIENT: &str = "all";

/// Message type sent after a workflow step completes.
pub const ANALYSIS_COMPLETE: &str = "analysis_complete";

/// Message type asking a capability to run an analysis for a customer.
pub const REQUEST_ANALYSIS: &str = "request_analysis";

/// String-keyed request payload handed to a capability.
pub type RequestData = HashMap<String, serde_json::Value>;

/// Unique workflow identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque customer correlation value passed through to every step.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Read a customer id out of a JSON value (string or number).
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::String(self.0.clone())
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Standard response produced by a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_name: String,
    pub response_type: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    /// Confidence in `[0, 1]`.
    pub confidence_score: f64,
    #[serde(default)]
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
}

impl AgentResponse {
    pub fn new(agent_name: impl Into<String>, response_type: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            response_type: response_type.into(),
            data: HashMap::new(),
            confidence_score: 0.0,
            reasoning: String::new(),
            timestamp: Utc::now(),
            recommendations: None,
        }
    }

    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Set the confidence score, clamped into `[0, 1]`.
    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = Some(recommendations);
        self
    }

    /// The response's data payload as a JSON object.
    pub fn data_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Confidence from input data quality and analysis complexity, both in `[0, 1]`.
///
/// Quality dominates (70%); simpler analyses earn the remaining 30%.
pub fn confidence_score(data_quality: f64, analysis_complexity: f64) -> f64 {
    let base = data_quality * 0.7 + (1.0 - analysis_complexity) * 0.3;
    base.clamp(0.0, 1.0)
}

/// Message exchanged between capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub sender: String,
    pub recipient: String,
    pub message_type: String,
    pub content: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl AgentMessage {
    pub fn broadcast(
        sender: impl Into<String>,
        message_type: impl Into<String>,
        content: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: BROADCAST_RECIPIENT.to_string(),
            message_type: message_type.into(),
            content,
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }

    pub fn with_correlation(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient == BROADCAST_RECIPIENT
    }
}

/// Step transition reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPhase {
    Running,
    Completed,
    Failed,
}

impl StepPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// Workflow registered by a builder.
    WorkflowCreated {
        workflow_id: WorkflowId,
        customer_id: CustomerId,
        steps: usize,
    },
    /// Scheduling loop started.
    WorkflowStarted { workflow_id: WorkflowId },
    /// Step dispatched.
    StepStarted { workflow_id: WorkflowId, step_id: String },
    /// Step finished successfully.
    StepCompleted {
        workflow_id: WorkflowId,
        step_id: String,
        elapsed_ms: u64,
    },
    /// Step failed.
    StepFailed {
        workflow_id: WorkflowId,
        step_id: String,
        error: String,
    },
    /// Every step completed.
    WorkflowCompleted { workflow_id: WorkflowId, elapsed_ms: u64 },
    /// Scheduling stopped on a blocked or deadlocked graph.
    WorkflowFailed { workflow_id: WorkflowId, error: String },
    /// Cancellation accepted.
    WorkflowCancelled { workflow_id: WorkflowId },
    /// A capability failed to handle a broadcast.
    NotificationFailed {
        workflow_id: WorkflowId,
        recipient: String,
        error: String,
    },
    /// Terminal workflows removed by cleanup.
    WorkflowsCleaned { removed: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_ids_are_unique() {
        assert_ne!(WorkflowId::new(), WorkflowId::new());
    }

    #[test]
    fn customer_id_from_value() {
        assert_eq!(
            CustomerId::from_value(&serde_json::json!("c-42")),
            Some(CustomerId::new("c-42"))
        );
        assert_eq!(
            CustomerId::from_value(&serde_json::json!(42)),
            Some(CustomerId::new("42"))
        );
        assert_eq!(CustomerId::from_value(&serde_json::json!("  ")), None);
        assert_eq!(CustomerId::from_value(&serde_json::json!(null)), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert!((confidence_score(1.0, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!((confidence_score(0.5, 0.5) - 0.5).abs() < 1e-9);
        assert_eq!(confidence_score(2.0, -1.0), 1.0);
        assert_eq!(confidence_score(-1.0, 2.0), 0.0);

        let resp = AgentResponse::new("a", "t").with_confidence(1.7);
        assert_eq!(resp.confidence_score, 1.0);
    }

    #[test]
    fn response_data_value_is_object() {
        let resp = AgentResponse::new("spending_analyzer", "spending_analysis")
            .with_entry("total", serde_json::json!(120.5));
        assert_eq!(resp.data_value(), serde_json::json!({"total": 120.5}));
    }

    #[test]
    fn broadcast_message() {
        let msg = AgentMessage::broadcast("advisor", ANALYSIS_COMPLETE, HashMap::new())
            .with_correlation("wf-1");
        assert!(msg.is_broadcast());
        assert_eq!(msg.correlation_id.as_deref(), Some("wf-1"));
    }

    #[test]
    fn response_serialization_roundtrip() {
        let resp = AgentResponse::new("goal_planner", "goal_plan")
            .with_confidence(0.8)
            .with_recommendations(vec!["save more".into()]);
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: AgentResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.agent_name, "goal_planner");
        assert_eq!(parsed.timestamp, resp.timestamp);
        assert_eq!(parsed.recommendations, Some(vec!["save more".to_string()]));
    }
}
