use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finsight_core::types::{AgentResponse, CustomerId, WorkflowId};

use super::step::{Step, StepStatus};

/// Completed step results keyed by step id.
pub type StepResults = HashMap<String, AgentResponse>;

/// Lifecycle of a workflow. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One DAG execution instance.
#[derive(Debug)]
pub struct Workflow {
    pub workflow_id: WorkflowId,
    pub customer_id: CustomerId,
    /// Insertion order, not execution order.
    pub steps: Vec<Step>,
    pub status: WorkflowStatus,
    /// Only ever holds results of `Completed` steps.
    pub results: StepResults,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Workflow-level failure or cancellation reason.
    pub error: Option<String>,
}

impl Workflow {
    pub fn new(customer_id: CustomerId, steps: Vec<Step>) -> Self {
        Self {
            workflow_id: WorkflowId::new(),
            customer_id,
            steps,
            status: WorkflowStatus::Pending,
            results: StepResults::new(),
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Indices of steps that are pending with all dependencies in `completed`.
    pub fn ready_steps(&self, completed: &HashSet<String>) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_ready(completed))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn step_ids_with(&self, status: StepStatus) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.status == status)
            .map(|s| s.step_id.clone())
            .collect()
    }

    /// Record a successful step. Returns false if the step was not running.
    pub(crate) fn record_success(
        &mut self,
        index: usize,
        response: AgentResponse,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(step) = self.steps.get_mut(index) else {
            return false;
        };
        if !step.complete(response.clone(), at) {
            return false;
        }
        self.results.insert(step.step_id.clone(), response);
        true
    }

    /// Record a failed step. Returns false if the step was not running.
    pub(crate) fn record_failure(
        &mut self,
        index: usize,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> bool {
        self.steps
            .get_mut(index)
            .is_some_and(|step| step.fail(error, at))
    }

    /// `Pending -> Running`.
    pub(crate) fn begin(&mut self) -> bool {
        if self.status != WorkflowStatus::Pending {
            return false;
        }
        self.status = WorkflowStatus::Running;
        true
    }

    /// Move a running workflow into a terminal status.
    ///
    /// Terminal statuses are sticky; returns false if the workflow was no
    /// longer running (e.g. cancelled meanwhile).
    pub(crate) fn finish(&mut self, status: WorkflowStatus, error: Option<String>) -> bool {
        if self.status != WorkflowStatus::Running || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Cancel a running workflow. No-op for any other status.
    pub fn cancel(&mut self) -> bool {
        self.finish(
            WorkflowStatus::Cancelled,
            Some("cancelled by request".to_string()),
        )
    }

    /// Terminal and finished before `cutoff`.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.completed_at.is_some_and(|at| at < cutoff)
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            workflow_id: self.workflow_id.clone(),
            customer_id: self.customer_id.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }

    /// Read-only view for status queries.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let mut results_available: Vec<String> = self.results.keys().cloned().collect();
        results_available.sort();

        WorkflowSnapshot {
            workflow_id: self.workflow_id.clone(),
            customer_id: self.customer_id.clone(),
            status: self.status,
            created_at: self.created_at,
            completed_at: self.completed_at,
            error: self.error.clone(),
            steps: self
                .steps
                .iter()
                .map(|s| StepSnapshot {
                    step_id: s.step_id.clone(),
                    agent: s.capability.name().to_string(),
                    status: s.status,
                    depends_on: s.depends_on.clone(),
                    started_at: s.started_at,
                    completed_at: s.completed_at,
                    error: s.error.clone(),
                })
                .collect(),
            results_available,
        }
    }
}

/// Point-in-time status of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub customer_id: CustomerId,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StepSnapshot>,
    pub results_available: Vec<String>,
}

impl WorkflowSnapshot {
    pub fn step(&self, step_id: &str) -> Option<&StepSnapshot> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// Point-in-time status of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step_id: String,
    pub agent: String,
    pub status: StepStatus,
    pub depends_on: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One line of a workflow listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub workflow_id: WorkflowId,
    pub customer_id: CustomerId,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
}
