use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinsightError {
    // Workflow errors
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow {workflow_id} blocked by failed steps {failed:?} (blocked: {blocked:?})")]
    WorkflowBlocked {
        workflow_id: String,
        failed: Vec<String>,
        blocked: Vec<String>,
    },

    #[error("Workflow {workflow_id} deadlock: no ready steps but {pending:?} not completed")]
    WorkflowDeadlock {
        workflow_id: String,
        pending: Vec<String>,
    },

    #[error("Workflow cancelled: {0}")]
    WorkflowCancelled(String),

    #[error("Workflow {workflow_id} cannot be executed from status {status}")]
    WorkflowNotRunnable { workflow_id: String, status: String },

    #[error("Invalid workflow definition: {0}")]
    InvalidWorkflow(String),

    // Capability errors
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Agent execution failed: {agent}: {message}")]
    AgentExecution { agent: String, message: String },

    #[error("Step timeout after {timeout_ms}ms: {step_id}")]
    StepTimeout { step_id: String, timeout_ms: u64 },

    #[error("Step task aborted: {step_id}: {message}")]
    StepAborted { step_id: String, message: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FinsightError {
    /// Build an `AgentExecution` error from anything displayable.
    pub fn agent(agent: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::AgentExecution {
            agent: agent.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_message_names_steps() {
        let err = FinsightError::WorkflowBlocked {
            workflow_id: "wf-1".into(),
            failed: vec!["spending_analysis".into()],
            blocked: vec!["comprehensive_advice".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("wf-1"));
        assert!(msg.contains("spending_analysis"));
        assert!(msg.contains("comprehensive_advice"));
    }

    #[test]
    fn agent_helper() {
        let err = FinsightError::agent("advisor", "model unavailable");
        assert_eq!(
            err.to_string(),
            "Agent execution failed: advisor: model unavailable"
        );
    }
}
