use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{ConversationSession, ToolCallRecord};
use crate::tools::ToolRegistry;

/// One function call requested by the language model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Either a JSON object or the raw JSON string the model produced.
    pub arguments: Value,
}

pub struct AgentRuntime {
    registry: ToolRegistry,
}

impl AgentRuntime {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Executes calls in order and records each status line in the session.
    /// Calls run sequentially so a booking made by one call is visible to
    /// the next.
    pub async fn run_tool_calls(
        &self,
        session: &mut ConversationSession,
        calls: Vec<ToolCall>,
    ) -> Vec<ToolCallRecord> {
        let mut records = Vec::with_capacity(calls.len());
        for call in calls {
            let status_line = self.registry.dispatch(&call.name, call.arguments.clone()).await;
            tracing::debug!(
                event_name = "agent.session.tool_call",
                session_id = %session.id(),
                call_id = %call.id,
                tool = %call.name,
                "tool call recorded"
            );
            let record = ToolCallRecord {
                call_id: call.id,
                tool: call.name,
                arguments: call.arguments,
                status_line,
                at: Utc::now(),
            };
            session.record_tool_call(record.clone());
            records.push(record);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentRuntime, ToolCall};
    use crate::session::ConversationSession;
    use crate::tools::test_support::ledger;
    use crate::tools::ToolRegistry;

    fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall { id: id.to_string(), name: name.to_string(), arguments }
    }

    #[tokio::test]
    async fn calls_run_in_order_and_land_in_the_session_log() {
        let runtime = AgentRuntime::new(ToolRegistry::hotel(ledger().await));
        let mut session = ConversationSession::new();

        let records = runtime
            .run_tool_calls(
                &mut session,
                vec![
                    call(
                        "call_1",
                        "finalize_hotel_booking",
                        json!({
                            "name": "Ada",
                            "email": "ada@example.com",
                            "phone": "555-0101",
                            "room_name": "Junior Suite",
                            "check_in": "2026-03-01",
                            "check_out": "2026-03-02"
                        }),
                    ),
                    call(
                        "call_2",
                        "order_service_item",
                        json!(r#"{"room_number": 601, "email": "ada@example.com", "category": "Laundry", "item_name": "Stain Removal"}"#),
                    ),
                    call("call_3", "book_flight", json!({})),
                ],
            )
            .await;

        assert_eq!(records.len(), 3);
        assert!(records[0].succeeded(), "{}", records[0].status_line);
        assert!(records[1].status_line.ends_with("Total: 48688.00"), "{}", records[1].status_line);
        assert!(!records[2].succeeded());
        assert_eq!(session.tool_calls(), records.as_slice());
        assert_eq!(session.last_tool_call().map(|record| record.call_id.as_str()), Some("call_3"));
    }
}
