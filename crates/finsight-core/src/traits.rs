use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::*;

/// Agent capability: one unit of work a workflow step invokes.
///
/// Implementations own their reasoning (prompting, data access); the
/// coordinator only sees `execute` and treats it as an opaque, possibly
/// long-running call.
pub trait AgentCapability: Send + Sync + 'static {
    /// Capability name (used by workflow step definitions).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Run the capability for a customer.
    fn execute(
        &self,
        customer_id: CustomerId,
        request: RequestData,
    ) -> BoxFuture<'_, Result<AgentResponse>>;

    /// Handle a message from another capability.
    ///
    /// The default answers `request_analysis` messages that carry a
    /// `customer_id` by running `execute` with the message content, and
    /// ignores every other message type.
    fn handle_message<'a>(
        &'a self,
        message: &'a AgentMessage,
    ) -> BoxFuture<'a, Result<Option<AgentResponse>>> {
        Box::pin(async move {
            if message.message_type != REQUEST_ANALYSIS {
                return Ok(None);
            }
            let Some(customer_id) = message
                .content
                .get("customer_id")
                .and_then(CustomerId::from_value)
            else {
                return Ok(None);
            };
            self.execute(customer_id, message.content.clone())
                .await
                .map(Some)
        })
    }

    /// Whether the capability can currently take work.
    fn is_available(&self) -> bool {
        true
    }
}
