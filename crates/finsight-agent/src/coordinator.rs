use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use finsight_core::config::CoordinatorConfig;
use finsight_core::error::{FinsightError, Result};
use finsight_core::event::EventBus;
use finsight_core::types::{CoordinatorEvent, CustomerId, RequestData, WorkflowId};

use crate::capability::{CapabilityInfo, CapabilitySet};
use crate::registry::WorkflowRegistry;
use crate::workflow::{
    ProgressCallback, StepResults, StepSpec, Workflow, WorkflowBuilder, WorkflowExecutor,
    WorkflowSnapshot, WorkflowSummary,
};

/// Front door for building, running and querying workflows.
///
/// Construct one per process and share it behind an `Arc`. Building only
/// registers a `Pending` workflow; `execute` drives it.
pub struct AgentCoordinator {
    capabilities: Arc<CapabilitySet>,
    registry: Arc<WorkflowRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
    config: CoordinatorConfig,
}

impl AgentCoordinator {
    pub fn new(capabilities: CapabilitySet, config: CoordinatorConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_capacity));
        Self::with_event_bus(capabilities, config, event_bus)
    }

    /// Use an existing event bus (e.g. one the caller already subscribed to).
    pub fn with_event_bus(
        capabilities: CapabilitySet,
        config: CoordinatorConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let capabilities = Arc::new(capabilities);
        let executor = WorkflowExecutor::new(capabilities.clone(), event_bus.clone())
            .with_step_timeout(config.step_timeout())
            .with_cancel_between_rounds(config.cancel_between_rounds);

        info!(
            capabilities = capabilities.len(),
            cancel_between_rounds = config.cancel_between_rounds,
            "Agent coordinator initialized"
        );

        Self {
            capabilities,
            registry: Arc::new(WorkflowRegistry::new()),
            executor,
            event_bus,
            config,
        }
    }

    /// Build and register a workflow from declarative step specs.
    pub async fn build_workflow(
        &self,
        customer_id: &CustomerId,
        steps: Vec<StepSpec>,
    ) -> Result<WorkflowId> {
        let workflow = self.builder().build(customer_id, steps)?;
        Ok(self.register(workflow).await)
    }

    /// Spending analysis and goal planning in parallel, then comprehensive advice.
    pub async fn build_comprehensive_analysis(
        &self,
        customer_id: &CustomerId,
        goal_info: Option<RequestData>,
    ) -> Result<WorkflowId> {
        let workflow = self
            .builder()
            .comprehensive_analysis(customer_id, goal_info)?;
        Ok(self.register(workflow).await)
    }

    pub async fn build_spending_analysis_only(
        &self,
        customer_id: &CustomerId,
    ) -> Result<WorkflowId> {
        let workflow = self.builder().spending_analysis_only(customer_id)?;
        Ok(self.register(workflow).await)
    }

    pub async fn build_goal_planning_only(
        &self,
        customer_id: &CustomerId,
        goal_info: RequestData,
    ) -> Result<WorkflowId> {
        let workflow = self.builder().goal_planning_only(customer_id, goal_info)?;
        Ok(self.register(workflow).await)
    }

    /// Run a registered workflow to a terminal status.
    pub async fn execute(
        &self,
        workflow_id: &WorkflowId,
        progress: Option<ProgressCallback>,
    ) -> Result<StepResults> {
        let handle = self
            .registry
            .get(workflow_id)
            .await
            .ok_or_else(|| FinsightError::WorkflowNotFound(workflow_id.to_string()))?;
        self.executor.execute(&handle, progress).await
    }

    pub async fn status(&self, workflow_id: &WorkflowId) -> Option<WorkflowSnapshot> {
        self.registry.status(workflow_id).await
    }

    /// Results of a completed workflow; `None` otherwise.
    pub async fn results(&self, workflow_id: &WorkflowId) -> Option<StepResults> {
        self.registry.results(workflow_id).await
    }

    /// Cancel a running workflow. Steps already dispatched still finish.
    pub async fn cancel(&self, workflow_id: &WorkflowId) -> bool {
        let cancelled = self.registry.cancel(workflow_id).await;
        if cancelled {
            info!(workflow_id = %workflow_id, "Workflow cancelled");
            self.event_bus.publish(CoordinatorEvent::WorkflowCancelled {
                workflow_id: workflow_id.clone(),
            });
        } else {
            warn!(workflow_id = %workflow_id, "Cancel ignored: workflow unknown or not running");
        }
        cancelled
    }

    /// Remove terminal workflows older than `max_age`.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let removed = self.registry.cleanup(max_age).await;
        if removed > 0 {
            info!(removed, "Cleaned up finished workflows");
            self.event_bus
                .publish(CoordinatorEvent::WorkflowsCleaned { removed });
        }
        removed
    }

    /// Cleanup using the configured retention.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup(self.config.retention()).await
    }

    pub fn list_capabilities(&self) -> BTreeMap<String, CapabilityInfo> {
        self.capabilities.info()
    }

    pub async fn list_workflows(&self) -> Vec<WorkflowSummary> {
        self.registry.list().await
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Arc<CapabilitySet> {
        &self.capabilities
    }

    fn builder(&self) -> WorkflowBuilder<'_> {
        WorkflowBuilder::new(&self.capabilities)
    }

    async fn register(&self, workflow: Workflow) -> WorkflowId {
        let workflow_id = workflow.workflow_id.clone();
        let customer_id = workflow.customer_id.clone();
        let steps = workflow.steps.len();

        self.registry.insert(workflow).await;

        info!(workflow_id = %workflow_id, customer_id = %customer_id, steps, "Workflow created");
        self.event_bus.publish(CoordinatorEvent::WorkflowCreated {
            workflow_id: workflow_id.clone(),
            customer_id,
            steps,
        });
        workflow_id
    }
}
