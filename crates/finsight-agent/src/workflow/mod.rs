//! Workflow execution engine: DAG scheduling of agent capabilities.
//!
//! A workflow is an ordered list of `Step`s, each wrapping one capability
//! call and naming the step ids it depends on. The `WorkflowExecutor` runs
//! the graph in rounds: every step whose dependencies have completed is
//! dispatched concurrently, the round joins, and the next ready set is
//! computed. Completed results flow into dependent steps' inputs through the
//! propagator, and each success is broadcast to the other capabilities.
//!
//! A failed step never aborts its siblings, but its dependents never become
//! ready; the workflow then fails as blocked. An empty ready set with no
//! failures is reported as a deadlock (cyclic or dangling dependencies).

pub mod builder;
pub mod executor;
pub mod notify;
pub mod propagate;
pub mod state;
pub mod step;

pub use builder::WorkflowBuilder;
pub use executor::{ProgressCallback, WorkflowExecutor};
pub use notify::Notifier;
pub use state::{StepResults, StepSnapshot, Workflow, WorkflowSnapshot, WorkflowStatus, WorkflowSummary};
pub use step::{Step, StepSpec, StepStatus};
