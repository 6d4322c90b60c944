use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use finsight_core::types::WorkflowId;

use crate::workflow::{StepResults, Workflow, WorkflowSnapshot, WorkflowStatus, WorkflowSummary};

/// A registered workflow behind its own lock.
pub type WorkflowHandle = Arc<Mutex<Workflow>>;

/// In-memory map of every live or terminal workflow.
///
/// The map lock is only held to look up, insert or remove handles; all
/// per-workflow state goes through the workflow's own mutex.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<WorkflowId, WorkflowHandle>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow and return its handle.
    pub async fn insert(&self, workflow: Workflow) -> WorkflowHandle {
        let id = workflow.workflow_id.clone();
        let handle = Arc::new(Mutex::new(workflow));
        self.workflows.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: &WorkflowId) -> Option<WorkflowHandle> {
        self.workflows.read().await.get(id).cloned()
    }

    pub async fn status(&self, id: &WorkflowId) -> Option<WorkflowSnapshot> {
        let handle = self.get(id).await?;
        let wf = handle.lock().await;
        Some(wf.snapshot())
    }

    /// Results of a completed workflow. `None` while it is still running or
    /// if it ended any other way.
    pub async fn results(&self, id: &WorkflowId) -> Option<StepResults> {
        let handle = self.get(id).await?;
        let wf = handle.lock().await;
        (wf.status == WorkflowStatus::Completed).then(|| wf.results.clone())
    }

    /// Cancel a running workflow. False if unknown or not running.
    pub async fn cancel(&self, id: &WorkflowId) -> bool {
        match self.get(id).await {
            Some(handle) => handle.lock().await.cancel(),
            None => false,
        }
    }

    /// Drop terminal workflows that finished more than `max_age` ago.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };

        let handles: Vec<(WorkflowId, WorkflowHandle)> = self
            .workflows
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), h.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, handle) in handles {
            if handle.lock().await.is_expired(cutoff) {
                expired.push(id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut workflows = self.workflows.write().await;
        let removed = expired
            .iter()
            .filter(|id| workflows.remove(*id).is_some())
            .count();
        debug!(removed, remaining = workflows.len(), "Cleaned up workflows");
        removed
    }

    /// Summaries of every registered workflow, oldest first.
    pub async fn list(&self) -> Vec<WorkflowSummary> {
        let handles: Vec<WorkflowHandle> =
            self.workflows.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.lock().await.summary());
        }
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.workflow_id.cmp(&b.workflow_id))
        });
        summaries
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }
}
