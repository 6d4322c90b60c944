//! Offline stand-ins for the financial capabilities, used by `finsight run`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use finsight_agent::workflow::builder::{ADVISOR, GOAL_PLANNER, SPENDING_ANALYZER};
use finsight_agent::CapabilitySet;
use finsight_core::error::Result;
use finsight_core::traits::AgentCapability;
use finsight_core::types::{confidence_score, AgentResponse, CustomerId, RequestData};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Spending,
    Goals,
    Advice,
}

/// Deterministic capability that sleeps for `latency` and derives its
/// answer from the request payload.
pub struct SimulatedAgent {
    name: &'static str,
    description: &'static str,
    kind: Kind,
    latency: Duration,
}

impl SimulatedAgent {
    pub fn spending(latency: Duration) -> Self {
        Self {
            name: SPENDING_ANALYZER,
            description: "Analyzes spending patterns and categorizes transactions",
            kind: Kind::Spending,
            latency,
        }
    }

    pub fn goals(latency: Duration) -> Self {
        Self {
            name: GOAL_PLANNER,
            description: "Builds savings plans for financial goals",
            kind: Kind::Goals,
            latency,
        }
    }

    pub fn advisor(latency: Duration) -> Self {
        Self {
            name: ADVISOR,
            description: "Synthesizes analyses into prioritized advice",
            kind: Kind::Advice,
            latency,
        }
    }

    fn respond(&self, customer_id: &CustomerId, request: &RequestData) -> AgentResponse {
        match self.kind {
            Kind::Spending => AgentResponse::new(self.name, "spending_analysis")
                .with_entry("customer_id", customer_id.to_value())
                .with_entry("monthly_total", serde_json::json!(2450.0))
                .with_entry(
                    "top_categories",
                    serde_json::json!(["housing", "groceries", "transport"]),
                )
                .with_entry("spending_trend", serde_json::json!("stable"))
                .with_confidence(confidence_score(0.8, 0.4))
                .with_reasoning("Simulated spending analysis over the last 30 days"),
            Kind::Goals => {
                let target = request
                    .get("target_amount")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(5000.0);
                let months = request
                    .get("target_months")
                    .and_then(serde_json::Value::as_f64)
                    .filter(|m| *m > 0.0)
                    .unwrap_or(12.0);
                let goal_name = request
                    .get("goal_name")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!("General savings"));

                AgentResponse::new(self.name, "goal_planning")
                    .with_entry("goal_name", goal_name)
                    .with_entry("target_amount", serde_json::json!(target))
                    .with_entry("monthly_savings", serde_json::json!(target / months))
                    .with_entry("feasible", serde_json::json!(target / months < 1000.0))
                    .with_confidence(confidence_score(0.7, 0.5))
                    .with_reasoning("Simulated plan from target amount and horizon")
            }
            Kind::Advice => {
                let mut inputs: Vec<&str> = request
                    .keys()
                    .filter(|k| k.ends_with("_result"))
                    .map(String::as_str)
                    .collect();
                inputs.sort_unstable();
                let mut recommendations = vec!["Review recurring subscriptions".to_string()];
                if request.contains_key("goal_planning") {
                    recommendations.push("Automate the monthly goal transfer".to_string());
                }

                AgentResponse::new(self.name, "comprehensive_advice")
                    .with_entry("based_on", serde_json::json!(inputs))
                    .with_confidence(confidence_score(0.75, 0.6))
                    .with_reasoning("Simulated synthesis of upstream analyses")
                    .with_recommendations(recommendations)
            }
        }
    }
}

impl AgentCapability for SimulatedAgent {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn execute(
        &self,
        customer_id: CustomerId,
        request: RequestData,
    ) -> BoxFuture<'_, Result<AgentResponse>> {
        Box::pin(async move {
            debug!(agent = self.name, customer_id = %customer_id, "Simulated capability running");
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            Ok(self.respond(&customer_id, &request))
        })
    }
}

/// The three stock capabilities.
pub fn capability_set(latency: Duration) -> CapabilitySet {
    CapabilitySet::from_agents([
        Arc::new(SimulatedAgent::spending(latency)) as Arc<dyn AgentCapability>,
        Arc::new(SimulatedAgent::goals(latency)) as Arc<dyn AgentCapability>,
        Arc::new(SimulatedAgent::advisor(latency)) as Arc<dyn AgentCapability>,
    ])
}
