use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finsight_core::traits::AgentCapability;
use finsight_core::types::{AgentResponse, RequestData};

/// Lifecycle of a single step. Transitions only move forward:
/// `Pending -> Running -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative step definition consumed by the `WorkflowBuilder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Unique identifier within the workflow.
    pub step_id: String,
    /// Registration name of the capability to invoke.
    pub capability: String,
    /// Step ids that must complete first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Initial request payload.
    #[serde(default)]
    pub request_data: RequestData,
}

impl StepSpec {
    pub fn new(step_id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            capability: capability.into(),
            depends_on: vec![],
            request_data: RequestData::new(),
        }
    }

    /// Set the dependencies.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Add one request entry.
    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.request_data.insert(key.into(), value);
        self
    }

    /// Merge a whole payload into the request (overwrites on conflict).
    pub fn with_request(mut self, data: RequestData) -> Self {
        self.request_data.extend(data);
        self
    }
}

/// One node of a workflow graph.
pub struct Step {
    pub step_id: String,
    /// Registration name the capability was resolved from.
    pub capability_name: String,
    pub capability: Arc<dyn AgentCapability>,
    pub depends_on: Vec<String>,
    /// Input payload; the propagator rewrites it right before dispatch.
    pub request_data: RequestData,
    pub status: StepStatus,
    pub result: Option<AgentResponse>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    pub fn new(
        step_id: impl Into<String>,
        capability_name: impl Into<String>,
        capability: Arc<dyn AgentCapability>,
        depends_on: Vec<String>,
        request_data: RequestData,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            capability_name: capability_name.into(),
            capability,
            depends_on,
            request_data,
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Pending with every dependency in `completed`.
    pub fn is_ready(&self, completed: &HashSet<String>) -> bool {
        self.status == StepStatus::Pending
            && self.depends_on.iter().all(|dep| completed.contains(dep))
    }

    /// `Pending -> Running`, installing the propagated payload.
    pub(crate) fn start(&mut self, request: RequestData, at: DateTime<Utc>) -> bool {
        if self.status != StepStatus::Pending {
            return false;
        }
        self.request_data = request;
        self.status = StepStatus::Running;
        self.started_at = Some(at);
        true
    }

    /// `Running -> Completed`.
    pub(crate) fn complete(&mut self, result: AgentResponse, at: DateTime<Utc>) -> bool {
        if self.status != StepStatus::Running {
            return false;
        }
        self.status = StepStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(at);
        true
    }

    /// `Running -> Failed`.
    pub(crate) fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) -> bool {
        if self.status != StepStatus::Running {
            return false;
        }
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(at);
        true
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("step_id", &self.step_id)
            .field("capability", &self.capability_name)
            .field("depends_on", &self.depends_on)
            .field("status", &self.status)
            .field("error", &self.error)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_test_utils::MockAgent;

    fn step(deps: &[&str]) -> Step {
        Step::new(
            "advice",
            "advisor",
            MockAgent::new("advisor").into_arc(),
            deps.iter().map(|d| d.to_string()).collect(),
            RequestData::new(),
        )
    }

    #[test]
    fn test_step_spec_builder() {
        let spec = StepSpec::new("advice", "advisor")
            .depends_on(["spending", "goals"])
            .with_input("tone", serde_json::json!("formal"));

        assert_eq!(spec.step_id, "advice");
        assert_eq!(spec.capability, "advisor");
        assert_eq!(spec.depends_on, vec!["spending", "goals"]);
        assert_eq!(spec.request_data["tone"], serde_json::json!("formal"));
    }

    #[test]
    fn test_readiness() {
        let s = step(&["a", "b"]);
        let mut done = HashSet::new();
        assert!(!s.is_ready(&done));
        done.insert("a".to_string());
        assert!(!s.is_ready(&done));
        done.insert("b".to_string());
        assert!(s.is_ready(&done));

        assert!(step(&[]).is_ready(&HashSet::new()));
    }

    #[test]
    fn test_transitions_are_monotonic() {
        let now = Utc::now();
        let mut s = step(&[]);

        assert!(!s.complete(AgentResponse::new("advisor", "advice"), now));
        assert!(s.start(RequestData::new(), now));
        assert!(!s.start(RequestData::new(), now));
        assert!(!s.is_ready(&HashSet::new()));

        assert!(s.fail("boom", now));
        assert_eq!(s.status, StepStatus::Failed);
        assert!(!s.complete(AgentResponse::new("advisor", "advice"), now));
        assert!(s.result.is_none());
        assert_eq!(s.error.as_deref(), Some("boom"));
    }
}
