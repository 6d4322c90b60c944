pub mod capability;
pub mod coordinator;
pub mod janitor;
pub mod registry;
pub mod workflow;

pub use capability::{CapabilityInfo, CapabilitySet};
pub use coordinator::AgentCoordinator;
pub use janitor::Janitor;
pub use registry::{WorkflowHandle, WorkflowRegistry};
pub use workflow::{
    ProgressCallback, Step, StepResults, StepSnapshot, StepSpec, StepStatus, Workflow,
    WorkflowBuilder, WorkflowExecutor, WorkflowSnapshot, WorkflowStatus, WorkflowSummary,
};
