use std::collections::HashSet;

use finsight_core::error::{FinsightError, Result};
use finsight_core::types::{CustomerId, RequestData};

use super::state::Workflow;
use super::step::{Step, StepSpec};
use crate::capability::CapabilitySet;

/// Capability registration names used by the stock workflows.
pub const SPENDING_ANALYZER: &str = "spending_analyzer";
pub const GOAL_PLANNER: &str = "goal_planner";
pub const ADVISOR: &str = "advisor";

/// Step ids used by the stock workflows.
pub const SPENDING_ANALYSIS_STEP: &str = "spending_analysis";
pub const GOAL_PLANNING_STEP: &str = "goal_planning";
pub const ADVICE_STEP: &str = "comprehensive_advice";

/// Turns declarative step lists into `Workflow`s bound to registered capabilities.
///
/// Building never executes anything. Dependencies are not checked for
/// cycles or dangling ids; the executor reports those as deadlocks.
pub struct WorkflowBuilder<'a> {
    capabilities: &'a CapabilitySet,
}

impl<'a> WorkflowBuilder<'a> {
    pub fn new(capabilities: &'a CapabilitySet) -> Self {
        Self { capabilities }
    }

    /// Build a workflow from step specs.
    ///
    /// Every step's request gets the customer id under `customer_id`.
    pub fn build(&self, customer_id: &CustomerId, specs: Vec<StepSpec>) -> Result<Workflow> {
        if customer_id.is_empty() {
            return Err(FinsightError::InvalidWorkflow(
                "customer id must not be empty".into(),
            ));
        }
        if specs.is_empty() {
            return Err(FinsightError::InvalidWorkflow(
                "workflow needs at least one step".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(specs.len());

        for spec in specs {
            if spec.step_id.trim().is_empty() {
                return Err(FinsightError::InvalidWorkflow(
                    "step id must not be empty".into(),
                ));
            }
            if !seen.insert(spec.step_id.clone()) {
                return Err(FinsightError::InvalidWorkflow(format!(
                    "duplicate step id '{}'",
                    spec.step_id
                )));
            }
            let capability = self
                .capabilities
                .get(&spec.capability)
                .ok_or_else(|| FinsightError::CapabilityNotFound(spec.capability.clone()))?;

            let mut request = spec.request_data;
            request.insert("customer_id".into(), customer_id.to_value());

            steps.push(Step::new(
                spec.step_id,
                spec.capability,
                capability,
                spec.depends_on,
                request,
            ));
        }

        Ok(Workflow::new(customer_id.clone(), steps))
    }

    /// Spending analysis and goal planning in parallel, then advice from both.
    pub fn comprehensive_analysis(
        &self,
        customer_id: &CustomerId,
        goal_info: Option<RequestData>,
    ) -> Result<Workflow> {
        self.build(
            customer_id,
            vec![
                StepSpec::new(SPENDING_ANALYSIS_STEP, SPENDING_ANALYZER),
                StepSpec::new(GOAL_PLANNING_STEP, GOAL_PLANNER)
                    .with_request(goal_info.unwrap_or_default()),
                StepSpec::new(ADVICE_STEP, ADVISOR)
                    .depends_on([SPENDING_ANALYSIS_STEP, GOAL_PLANNING_STEP]),
            ],
        )
    }

    pub fn spending_analysis_only(&self, customer_id: &CustomerId) -> Result<Workflow> {
        self.build(
            customer_id,
            vec![StepSpec::new(SPENDING_ANALYSIS_STEP, SPENDING_ANALYZER)],
        )
    }

    pub fn goal_planning_only(
        &self,
        customer_id: &CustomerId,
        goal_info: RequestData,
    ) -> Result<Workflow> {
        self.build(
            customer_id,
            vec![StepSpec::new(GOAL_PLANNING_STEP, GOAL_PLANNER).with_request(goal_info)],
        )
    }
}
