//! Mock capabilities and fixtures shared by finsight tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use finsight_core::error::{FinsightError, Result};
use finsight_core::traits::AgentCapability;
use finsight_core::types::{AgentMessage, AgentResponse, CustomerId, RequestData};

/// Capability names used by the stock workflows.
pub const SPENDING_ANALYZER: &str = "spending_analyzer";
pub const GOAL_PLANNER: &str = "goal_planner";
pub const ADVISOR: &str = "advisor";

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub customer_id: CustomerId,
    pub request: RequestData,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Scriptable capability that records every call and message it sees.
pub struct MockAgent {
    name: String,
    delay: Duration,
    fail_with: Option<String>,
    fail_messages: bool,
    panic_on_execute: bool,
    available: bool,
    confidence: f64,
    calls: Mutex<Vec<RecordedCall>>,
    messages: Mutex<Vec<AgentMessage>>,
}

impl MockAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: Duration::ZERO,
            fail_with: None,
            fail_messages: false,
            panic_on_execute: false,
            available: true,
            confidence: 0.9,
            calls: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every `execute`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every `execute` with the given message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Return an error from every `handle_message`.
    pub fn failing_messages(mut self) -> Self {
        self.fail_messages = true;
        self
    }

    /// Panic inside `execute`.
    pub fn panicking(mut self) -> Self {
        self.panic_on_execute = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock").len()
    }

    pub fn last_request(&self) -> Option<RequestData> {
        self.calls().last().map(|c| c.request.clone())
    }

    pub fn messages(&self) -> Vec<AgentMessage> {
        self.messages.lock().expect("mock messages lock").clone()
    }

    /// Wait until at least `count` messages arrived or `timeout` elapsed.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> Vec<AgentMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let seen = self.messages();
            if seen.len() >= count || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl AgentCapability for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock capability for tests"
    }

    fn execute(
        &self,
        customer_id: CustomerId,
        request: RequestData,
    ) -> BoxFuture<'_, Result<AgentResponse>> {
        Box::pin(async move {
            let started_at = Utc::now();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panic_on_execute {
                panic!("mock capability {} panicked", self.name);
            }

            let mut keys: Vec<&String> = request.keys().collect();
            keys.sort();
            let keys = serde_json::json!(keys);

            self.calls.lock().expect("mock calls lock").push(RecordedCall {
                customer_id: customer_id.clone(),
                request: request.clone(),
                started_at,
                finished_at: Utc::now(),
            });

            if let Some(ref message) = self.fail_with {
                return Err(FinsightError::agent(&self.name, message));
            }

            Ok(AgentResponse::new(&self.name, format!("{}_result", self.name))
                .with_entry("source", serde_json::json!(self.name))
                .with_entry("customer_id", customer_id.to_value())
                .with_entry("request_keys", keys)
                .with_confidence(self.confidence)
                .with_reasoning(format!("{} mock analysis", self.name)))
        })
    }

    fn handle_message<'a>(
        &'a self,
        message: &'a AgentMessage,
    ) -> BoxFuture<'a, Result<Option<AgentResponse>>> {
        Box::pin(async move {
            self.messages
                .lock()
                .expect("mock messages lock")
                .push(message.clone());
            if self.fail_messages {
                return Err(FinsightError::agent(&self.name, "cannot handle messages"));
            }
            Ok(None)
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// The three capabilities the stock workflows expect.
pub struct StandardAgents {
    pub spending: Arc<MockAgent>,
    pub goals: Arc<MockAgent>,
    pub advisor: Arc<MockAgent>,
}

impl StandardAgents {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            spending: MockAgent::new(SPENDING_ANALYZER).with_delay(delay).into_arc(),
            goals: MockAgent::new(GOAL_PLANNER).with_delay(delay).into_arc(),
            advisor: MockAgent::new(ADVISOR).with_delay(delay).into_arc(),
        }
    }

    /// All three as trait objects, ready for registration.
    pub fn all(&self) -> Vec<Arc<dyn AgentCapability>> {
        vec![
            self.spending.clone() as Arc<dyn AgentCapability>,
            self.goals.clone() as Arc<dyn AgentCapability>,
            self.advisor.clone() as Arc<dyn AgentCapability>,
        ]
    }
}

impl Default for StandardAgents {
    fn default() -> Self {
        Self::new()
    }
}

/// Goal payload used by goal-planning fixtures.
pub fn sample_goal() -> RequestData {
    let mut goal = RequestData::new();
    goal.insert("goal_name".into(), serde_json::json!("Emergency fund"));
    goal.insert("target_amount".into(), serde_json::json!(10_000));
    goal.insert("target_months".into(), serde_json::json!(12));
    goal
}
