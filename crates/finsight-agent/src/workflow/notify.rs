use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use finsight_core::event::EventBus;
use finsight_core::types::{
    AgentMessage, AgentResponse, CoordinatorEvent, CustomerId, WorkflowId, ANALYSIS_COMPLETE,
};

use crate::capability::CapabilitySet;

/// Best-effort fan-out of step completions to the other registered capabilities.
///
/// Delivery runs on a detached task so the scheduler never waits on it.
/// Recipient failures are logged and published on the event bus; nothing
/// is reported back to the workflow.
#[derive(Clone)]
pub struct Notifier {
    capabilities: Arc<CapabilitySet>,
    event_bus: Arc<EventBus>,
}

impl Notifier {
    pub fn new(capabilities: Arc<CapabilitySet>, event_bus: Arc<EventBus>) -> Self {
        Self {
            capabilities,
            event_bus,
        }
    }

    /// Build the `analysis_complete` broadcast for a finished step.
    pub fn completion_message(
        workflow_id: &WorkflowId,
        customer_id: &CustomerId,
        step_id: &str,
        sender: &str,
        result: &AgentResponse,
    ) -> AgentMessage {
        let mut content = HashMap::new();
        content.insert("customer_id".to_string(), customer_id.to_value());
        content.insert("step_id".to_string(), serde_json::json!(step_id));
        content.insert("result_data".to_string(), result.data_value());
        content.insert(
            "confidence_score".to_string(),
            serde_json::json!(result.confidence_score),
        );

        AgentMessage::broadcast(sender, ANALYSIS_COMPLETE, content)
            .with_correlation(workflow_id.as_str())
    }

    /// Deliver in the background to everyone except `producer` (a registration name).
    pub fn notify(
        &self,
        workflow_id: WorkflowId,
        producer: String,
        message: AgentMessage,
    ) -> JoinHandle<usize> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.deliver(&workflow_id, &producer, &message).await })
    }

    /// Deliver to every capability except `producer`.
    ///
    /// Returns how many recipients handled the message without error.
    pub async fn deliver(
        &self,
        workflow_id: &WorkflowId,
        producer: &str,
        message: &AgentMessage,
    ) -> usize {
        let mut delivered = 0;

        for (name, capability) in self.capabilities.iter() {
            if name == producer {
                continue;
            }
            match capability.handle_message(message).await {
                Ok(Some(_)) => {
                    info!(
                        workflow_id = %workflow_id,
                        recipient = %name,
                        sender = %message.sender,
                        "Capability responded to broadcast"
                    );
                    delivered += 1;
                }
                Ok(None) => {
                    debug!(workflow_id = %workflow_id, recipient = %name, "Broadcast delivered");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        workflow_id = %workflow_id,
                        recipient = %name,
                        error = %e,
                        "Capability failed to handle broadcast"
                    );
                    self.event_bus.publish(CoordinatorEvent::NotificationFailed {
                        workflow_id: workflow_id.clone(),
                        recipient: name.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        delivered
    }
}
