use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use finsight_core::error::{FinsightError, Result};
use finsight_core::event::EventBus;
use finsight_core::traits::AgentCapability;
use finsight_core::types::{CoordinatorEvent, CustomerId, RequestData, StepPhase, WorkflowId};

use super::notify::Notifier;
use super::propagate::propagate_results;
use super::state::{StepResults, Workflow, WorkflowStatus};
use super::step::StepStatus;
use crate::capability::CapabilitySet;
use crate::registry::WorkflowHandle;

/// Called synchronously as each step starts, completes or fails.
pub type ProgressCallback = Arc<dyn Fn(&WorkflowId, &str, StepPhase) + Send + Sync>;

/// A step taken out of the workflow for dispatch.
struct StepJob {
    index: usize,
    step_id: String,
    capability_name: String,
    capability: Arc<dyn AgentCapability>,
    request: RequestData,
}

/// Drives a workflow to a terminal status in readiness rounds.
///
/// Each round dispatches every ready step on its own tokio task and joins
/// them all before the next ready set is computed. The workflow lock is only
/// taken to read or record state, never across a capability call.
#[derive(Clone)]
pub struct WorkflowExecutor {
    notifier: Notifier,
    event_bus: Arc<EventBus>,
    step_timeout: Option<Duration>,
    cancel_between_rounds: bool,
}

impl WorkflowExecutor {
    pub fn new(capabilities: Arc<CapabilitySet>, event_bus: Arc<EventBus>) -> Self {
        Self {
            notifier: Notifier::new(capabilities, event_bus.clone()),
            event_bus,
            step_timeout: None,
            cancel_between_rounds: true,
        }
    }

    /// Bound every capability call. `None` disables the limit.
    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Stop dispatching new rounds once the workflow was cancelled.
    pub fn with_cancel_between_rounds(mut self, enabled: bool) -> Self {
        self.cancel_between_rounds = enabled;
        self
    }

    /// Run a pending workflow until it completes, blocks, deadlocks or is cancelled.
    ///
    /// Returns the results of every step on success. Step failures are
    /// recorded on the step; they only surface here as `WorkflowBlocked`
    /// once nothing else can run.
    pub async fn execute(
        &self,
        handle: &WorkflowHandle,
        progress: Option<ProgressCallback>,
    ) -> Result<StepResults> {
        let start = Instant::now();

        let (workflow_id, customer_id, total) = {
            let mut wf = handle.lock().await;
            if !wf.begin() {
                return Err(FinsightError::WorkflowNotRunnable {
                    workflow_id: wf.workflow_id.to_string(),
                    status: wf.status.to_string(),
                });
            }
            (wf.workflow_id.clone(), wf.customer_id.clone(), wf.steps.len())
        };

        info!(workflow_id = %workflow_id, customer_id = %customer_id, steps = total, "Workflow started");
        self.event_bus.publish(CoordinatorEvent::WorkflowStarted {
            workflow_id: workflow_id.clone(),
        });

        let mut completed: HashSet<String> = HashSet::new();
        let mut round = 0usize;

        while completed.len() < total {
            let batch = {
                let mut wf = handle.lock().await;

                if wf.status == WorkflowStatus::Cancelled && self.cancel_between_rounds {
                    info!(workflow_id = %workflow_id, round, "Workflow cancelled, stopping dispatch");
                    return Err(FinsightError::WorkflowCancelled(workflow_id.to_string()));
                }

                let ready = wf.ready_steps(&completed);
                if ready.is_empty() {
                    if wf.status == WorkflowStatus::Cancelled {
                        info!(workflow_id = %workflow_id, round, "Cancelled workflow cannot make progress");
                        return Err(FinsightError::WorkflowCancelled(workflow_id.to_string()));
                    }
                    let err = stall_error(&wf);
                    if wf.finish(WorkflowStatus::Failed, Some(err.to_string())) {
                        warn!(workflow_id = %workflow_id, error = %err, "Workflow failed");
                        self.event_bus.publish(CoordinatorEvent::WorkflowFailed {
                            workflow_id: workflow_id.clone(),
                            error: err.to_string(),
                        });
                    }
                    return Err(err);
                }

                prepare_batch(&mut wf, &ready)
            };

            round += 1;
            debug!(workflow_id = %workflow_id, round, steps = batch.len(), "Dispatching batch");

            let mut dispatched = Vec::with_capacity(batch.len());
            let mut tasks = Vec::with_capacity(batch.len());
            for job in batch {
                dispatched.push((job.index, job.step_id.clone()));
                let executor = self.clone();
                let handle = handle.clone();
                let workflow_id = workflow_id.clone();
                let customer_id = customer_id.clone();
                let progress = progress.clone();
                tasks.push(tokio::spawn(async move {
                    executor
                        .run_step(&handle, &workflow_id, &customer_id, job, progress.as_ref())
                        .await
                }));
            }

            let outcomes = join_all(tasks).await;

            for ((index, step_id), outcome) in dispatched.into_iter().zip(outcomes) {
                match outcome {
                    Ok(true) => {
                        completed.insert(step_id);
                    }
                    Ok(false) => {}
                    Err(join_err) => {
                        let err = FinsightError::StepAborted {
                            step_id: step_id.clone(),
                            message: join_err.to_string(),
                        };
                        error!(workflow_id = %workflow_id, step_id = %step_id, error = %err, "Step task aborted");
                        handle
                            .lock()
                            .await
                            .record_failure(index, err.to_string(), Utc::now());
                        self.event_bus.publish(CoordinatorEvent::StepFailed {
                            workflow_id: workflow_id.clone(),
                            step_id: step_id.clone(),
                            error: err.to_string(),
                        });
                        if let Some(cb) = progress.as_ref() {
                            cb(&workflow_id, &step_id, StepPhase::Failed);
                        }
                    }
                }
            }
        }

        let mut wf = handle.lock().await;
        if !wf.finish(WorkflowStatus::Completed, None) {
            info!(workflow_id = %workflow_id, status = %wf.status, "Workflow finished after cancellation");
            return Err(FinsightError::WorkflowCancelled(workflow_id.to_string()));
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(workflow_id = %workflow_id, rounds = round, elapsed_ms, "Workflow completed");
        self.event_bus.publish(CoordinatorEvent::WorkflowCompleted {
            workflow_id: workflow_id.clone(),
            elapsed_ms,
        });

        Ok(wf.results.clone())
    }

    /// Invoke one capability and record its outcome. Returns true on success.
    async fn run_step(
        &self,
        handle: &WorkflowHandle,
        workflow_id: &WorkflowId,
        customer_id: &CustomerId,
        job: StepJob,
        progress: Option<&ProgressCallback>,
    ) -> bool {
        if let Some(cb) = progress {
            cb(workflow_id, &job.step_id, StepPhase::Running);
        }
        self.event_bus.publish(CoordinatorEvent::StepStarted {
            workflow_id: workflow_id.clone(),
            step_id: job.step_id.clone(),
        });
        debug!(workflow_id = %workflow_id, step_id = %job.step_id, agent = %job.capability_name, "Step started");

        let step_start = Instant::now();
        let call = job.capability.execute(customer_id.clone(), job.request);
        let outcome = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(FinsightError::StepTimeout {
                    step_id: job.step_id.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => call.await,
        };
        let elapsed_ms = step_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                let message = Notifier::completion_message(
                    workflow_id,
                    customer_id,
                    &job.step_id,
                    job.capability.name(),
                    &response,
                );
                let recorded = handle
                    .lock()
                    .await
                    .record_success(job.index, response, Utc::now());
                if !recorded {
                    return false;
                }

                info!(workflow_id = %workflow_id, step_id = %job.step_id, elapsed_ms, "Step completed");
                self.event_bus.publish(CoordinatorEvent::StepCompleted {
                    workflow_id: workflow_id.clone(),
                    step_id: job.step_id.clone(),
                    elapsed_ms,
                });
                if let Some(cb) = progress {
                    cb(workflow_id, &job.step_id, StepPhase::Completed);
                }

                self.notifier
                    .notify(workflow_id.clone(), job.capability_name, message);
                true
            }
            Err(e) => {
                handle
                    .lock()
                    .await
                    .record_failure(job.index, e.to_string(), Utc::now());

                error!(workflow_id = %workflow_id, step_id = %job.step_id, error = %e, "Step failed");
                self.event_bus.publish(CoordinatorEvent::StepFailed {
                    workflow_id: workflow_id.clone(),
                    step_id: job.step_id.clone(),
                    error: e.to_string(),
                });
                if let Some(cb) = progress {
                    cb(workflow_id, &job.step_id, StepPhase::Failed);
                }
                false
            }
        }
    }
}

/// Propagate dependency results into each ready step and mark it running.
fn prepare_batch(wf: &mut Workflow, ready: &[usize]) -> Vec<StepJob> {
    let mut jobs = Vec::with_capacity(ready.len());
    let now = Utc::now();

    for &index in ready {
        let mut request = wf.steps[index].request_data.clone();
        propagate_results(&mut request, &wf.steps[index].depends_on, &wf.results);

        let step = &mut wf.steps[index];
        if !step.start(request.clone(), now) {
            continue;
        }
        jobs.push(StepJob {
            index,
            step_id: step.step_id.clone(),
            capability_name: step.capability_name.clone(),
            capability: step.capability.clone(),
            request,
        });
    }

    jobs
}

/// Why nothing is ready: blocked by failures, or a dependency deadlock.
fn stall_error(wf: &Workflow) -> FinsightError {
    let failed = wf.step_ids_with(StepStatus::Failed);
    let pending = wf.step_ids_with(StepStatus::Pending);

    if failed.is_empty() {
        FinsightError::WorkflowDeadlock {
            workflow_id: wf.workflow_id.to_string(),
            pending,
        }
    } else {
        FinsightError::WorkflowBlocked {
            workflow_id: wf.workflow_id.to_string(),
            failed,
            blocked: pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use tokio::sync::Mutex;

    use crate::workflow::builder::{ADVICE_STEP, GOAL_PLANNING_STEP, SPENDING_ANALYSIS_STEP};
    use crate::workflow::{StepSpec, WorkflowBuilder};
    use finsight_test_utils::{
        sample_goal, MockAgent, StandardAgents, ADVISOR, GOAL_PLANNER, SPENDING_ANALYZER,
    };

    struct Fixture {
        capabilities: Arc<CapabilitySet>,
        executor: WorkflowExecutor,
        event_bus: Arc<EventBus>,
    }

    fn fixture(agents: Vec<Arc<dyn AgentCapability>>) -> Fixture {
        let capabilities = Arc::new(CapabilitySet::from_agents(agents));
        let event_bus = Arc::new(EventBus::default());
        let executor = WorkflowExecutor::new(capabilities.clone(), event_bus.clone());
        Fixture {
            capabilities,
            executor,
            event_bus,
        }
    }

    impl Fixture {
        fn build(&self, specs: Vec<StepSpec>) -> WorkflowHandle {
            let wf = WorkflowBuilder::new(&self.capabilities)
                .build(&CustomerId::new("c-1"), specs)
                .unwrap();
            Arc::new(Mutex::new(wf))
        }
    }

    async fn run(executor: &WorkflowExecutor, handle: &WorkflowHandle) -> Result<StepResults> {
        tokio::time::timeout(Duration::from_secs(5), executor.execute(handle, None))
            .await
            .expect("executor hung")
    }

    #[tokio::test]
    async fn test_comprehensive_dag_propagates_results() {
        let agents = StandardAgents::new();
        let fx = fixture(agents.all());
        let wf = WorkflowBuilder::new(&fx.capabilities)
            .comprehensive_analysis(&CustomerId::new("42"), Some(sample_goal()))
            .unwrap();
        let handle = Arc::new(Mutex::new(wf));

        let results = run(&fx.executor, &handle).await.unwrap();

        let mut keys: Vec<&str> = results.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec![ADVICE_STEP, GOAL_PLANNING_STEP, SPENDING_ANALYSIS_STEP]);

        let advice_input = agents.advisor.last_request().unwrap();
        assert!(advice_input.contains_key("spending_analysis_result"));
        assert!(advice_input.contains_key("goal_planning_result"));
        assert_eq!(
            advice_input["spending_analysis"]["source"],
            serde_json::json!(SPENDING_ANALYZER)
        );
        assert_eq!(
            advice_input["goal_planning"]["source"],
            serde_json::json!(GOAL_PLANNER)
        );
        assert_eq!(advice_input["customer_id"], serde_json::json!("42"));

        let wf = handle.lock().await;
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(wf.completed_at.is_some());
        let advice = wf.step(ADVICE_STEP).unwrap();
        assert!(advice.request_data.contains_key("goal_planning_result"));
        assert!(wf.steps.iter().all(|s| s.status == StepStatus::Completed));
    }

    #[tokio::test]
    async fn test_independent_steps_share_a_round() {
        let agents = StandardAgents::with_delay(Duration::from_millis(50));
        let fx = fixture(agents.all());
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", GOAL_PLANNER),
            StepSpec::new("c", ADVISOR).depends_on(["a", "b"]),
        ]);

        run(&fx.executor, &handle).await.unwrap();

        let wf = handle.lock().await;
        let (a, b, c) = (wf.step("a").unwrap(), wf.step("b").unwrap(), wf.step("c").unwrap());
        assert!(a.started_at.unwrap() <= b.completed_at.unwrap());
        assert!(b.started_at.unwrap() <= a.completed_at.unwrap());
        assert!(c.started_at.unwrap() >= a.completed_at.unwrap());
        assert!(c.started_at.unwrap() >= b.completed_at.unwrap());
    }

    #[tokio::test]
    async fn test_failed_step_blocks_dependents() {
        let fx = fixture(vec![
            MockAgent::new(SPENDING_ANALYZER).failing("no transactions").into_arc(),
            MockAgent::new(GOAL_PLANNER).into_arc(),
            MockAgent::new(ADVISOR).into_arc(),
            MockAgent::new("reporter").into_arc(),
        ]);
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", GOAL_PLANNER),
            StepSpec::new("c", ADVISOR).depends_on(["a", "b"]),
            StepSpec::new("d", "reporter").depends_on(["c"]),
        ]);

        let err = run(&fx.executor, &handle).await.unwrap_err();
        match err {
            FinsightError::WorkflowBlocked { failed, blocked, .. } => {
                assert_eq!(failed, vec!["a"]);
                assert_eq!(blocked, vec!["c", "d"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let wf = handle.lock().await;
        assert_eq!(wf.status, WorkflowStatus::Failed);
        assert!(wf.error.as_deref().unwrap().contains("blocked"));
        assert_eq!(wf.step("a").unwrap().status, StepStatus::Failed);
        assert!(wf.step("a").unwrap().error.as_deref().unwrap().contains("no transactions"));
        assert_eq!(wf.step("b").unwrap().status, StepStatus::Completed);
        assert_eq!(wf.step("c").unwrap().status, StepStatus::Pending);
        assert_eq!(wf.step("d").unwrap().status, StepStatus::Pending);
        assert!(!wf.results.contains_key("a"));
        assert!(wf.results.contains_key("b"));
    }

    #[tokio::test]
    async fn test_cycle_is_reported_as_deadlock() {
        let fx = fixture(StandardAgents::new().all());
        let handle = fx.build(vec![
            StepSpec::new("a", ADVISOR).depends_on(["b"]),
            StepSpec::new("b", ADVISOR).depends_on(["a"]),
        ]);

        let err = run(&fx.executor, &handle).await.unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowDeadlock { ref pending, .. } if pending.len() == 2));
        assert_eq!(handle.lock().await.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn test_dangling_dependency_is_reported_as_deadlock() {
        let fx = fixture(StandardAgents::new().all());
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", ADVISOR).depends_on(["missing"]),
        ]);

        let err = run(&fx.executor, &handle).await.unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowDeadlock { ref pending, .. } if pending == &vec!["b".to_string()]));
        assert_eq!(handle.lock().await.step("a").unwrap().status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_panicking_capability_is_isolated() {
        let fx = fixture(vec![
            MockAgent::new(SPENDING_ANALYZER).panicking().into_arc(),
            MockAgent::new(GOAL_PLANNER).into_arc(),
        ]);
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", GOAL_PLANNER),
        ]);

        let err = run(&fx.executor, &handle).await.unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowBlocked { ref failed, .. } if failed == &vec!["a".to_string()]));

        let wf = handle.lock().await;
        let a = wf.step("a").unwrap();
        assert_eq!(a.status, StepStatus::Failed);
        assert!(a.error.as_deref().unwrap().contains("aborted"));
        assert_eq!(wf.step("b").unwrap().status, StepStatus::Completed);
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let fx = fixture(vec![MockAgent::new(SPENDING_ANALYZER)
            .with_delay(Duration::from_secs(10))
            .into_arc()]);
        let executor = fx
            .executor
            .clone()
            .with_step_timeout(Some(Duration::from_millis(50)));
        let handle = fx.build(vec![StepSpec::new("a", SPENDING_ANALYZER)]);

        let err = run(&executor, &handle).await.unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowBlocked { .. }));
        let wf = handle.lock().await;
        let error = wf.step("a").unwrap().error.clone().unwrap();
        assert!(error.contains("timeout after 50ms"), "{error}");
    }

    #[tokio::test]
    async fn test_progress_callback_phases() {
        let fx = fixture(vec![
            MockAgent::new(SPENDING_ANALYZER).into_arc(),
            MockAgent::new(ADVISOR).failing("boom").into_arc(),
        ]);
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", ADVISOR).depends_on(["a"]),
        ]);

        let seen: Arc<StdMutex<Vec<(String, StepPhase)>>> = Arc::default();
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |_wf: &WorkflowId, step: &str, phase: StepPhase| {
            sink.lock().unwrap().push((step.to_string(), phase));
        });

        let _ = fx.executor.execute(&handle, Some(callback)).await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), StepPhase::Running),
                ("a".to_string(), StepPhase::Completed),
                ("b".to_string(), StepPhase::Running),
                ("b".to_string(), StepPhase::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn test_notifications_skip_producer_and_never_fail_workflow() {
        let spending = MockAgent::new(SPENDING_ANALYZER).into_arc();
        let goals = MockAgent::new(GOAL_PLANNER).failing_messages().into_arc();
        let advisor = MockAgent::new(ADVISOR).into_arc();
        let fx = fixture(vec![
            spending.clone() as Arc<dyn AgentCapability>,
            goals.clone() as Arc<dyn AgentCapability>,
            advisor.clone() as Arc<dyn AgentCapability>,
        ]);
        let mut events = fx.event_bus.subscribe();
        let handle = fx.build(vec![StepSpec::new(SPENDING_ANALYSIS_STEP, SPENDING_ANALYZER)]);

        run(&fx.executor, &handle).await.unwrap();
        assert_eq!(handle.lock().await.status, WorkflowStatus::Completed);

        let received = advisor.wait_for_messages(1, Duration::from_secs(2)).await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content["step_id"], serde_json::json!(SPENDING_ANALYSIS_STEP));
        goals.wait_for_messages(1, Duration::from_secs(2)).await;
        assert!(spending.messages().is_empty());

        let failure = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(CoordinatorEvent::NotificationFailed { recipient, .. }) =
                    events.recv().await
                {
                    return recipient;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(failure, GOAL_PLANNER);
    }

    #[tokio::test]
    async fn test_cancel_stops_next_round() {
        let agents = StandardAgents::with_delay(Duration::from_millis(100));
        let fx = fixture(agents.all());
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", ADVISOR).depends_on(["a"]),
        ]);

        let executor = fx.executor.clone();
        let task_handle = handle.clone();
        let task = tokio::spawn(async move { executor.execute(&task_handle, None).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.lock().await.cancel());

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowCancelled(_)));

        let wf = handle.lock().await;
        assert_eq!(wf.status, WorkflowStatus::Cancelled);
        assert_eq!(wf.step("a").unwrap().status, StepStatus::Completed);
        assert_eq!(wf.step("b").unwrap().status, StepStatus::Pending);
        assert_eq!(agents.advisor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_only_cancellation_runs_to_the_end() {
        let agents = StandardAgents::with_delay(Duration::from_millis(100));
        let fx = fixture(agents.all());
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", ADVISOR).depends_on(["a"]),
        ]);

        let executor = fx.executor.clone().with_cancel_between_rounds(false);
        let task_handle = handle.clone();
        let task = tokio::spawn(async move { executor.execute(&task_handle, None).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.lock().await.cancel());

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowCancelled(_)));

        let wf = handle.lock().await;
        assert_eq!(wf.status, WorkflowStatus::Cancelled, "cancel is sticky");
        assert_eq!(wf.step("b").unwrap().status, StepStatus::Completed);
        assert_eq!(agents.advisor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_status_only_cancellation_with_failed_step_reports_cancelled() {
        let fx = fixture(vec![
            MockAgent::new(SPENDING_ANALYZER)
                .with_delay(Duration::from_millis(100))
                .failing("feed offline")
                .into_arc(),
            MockAgent::new(ADVISOR).into_arc(),
        ]);
        let handle = fx.build(vec![
            StepSpec::new("a", SPENDING_ANALYZER),
            StepSpec::new("b", ADVISOR).depends_on(["a"]),
        ]);

        let executor = fx.executor.clone().with_cancel_between_rounds(false);
        let task_handle = handle.clone();
        let task = tokio::spawn(async move { executor.execute(&task_handle, None).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.lock().await.cancel());

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowCancelled(_)), "{err}");

        let wf = handle.lock().await;
        assert_eq!(wf.status, WorkflowStatus::Cancelled);
        assert_eq!(wf.step("a").unwrap().status, StepStatus::Failed);
        assert_eq!(wf.step("b").unwrap().status, StepStatus::Pending);
    }

    #[tokio::test]
    async fn test_only_pending_workflows_run() {
        let fx = fixture(StandardAgents::new().all());
        let handle = fx.build(vec![StepSpec::new("a", SPENDING_ANALYZER)]);

        run(&fx.executor, &handle).await.unwrap();
        let err = run(&fx.executor, &handle).await.unwrap_err();
        assert!(matches!(err, FinsightError::WorkflowNotRunnable { ref status, .. } if status == "completed"));
    }
}
