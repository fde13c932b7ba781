//! Tool boundary consumed by the external conversation orchestrator.
//!
//! Every tool answers with one status line that starts with a fixed outcome
//! token (`SUCCESS`, `ERROR`, `FAILED`, `OCCUPIED`, `NOT_FOUND`). The
//! orchestrator relays success to the guest only on `SUCCESS`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use concierge_core::errors::{EngineError, OutcomeToken};
use concierge_core::rust_decimal::Decimal;
use concierge_db::BookingLedger;

pub mod booking;
pub mod services;

pub use booking::{
    CancelHotelBooking, CheckRoomAvailability, FinalizeHotelBooking, GetAllRoomTypes,
    ModifyHotelBooking,
};
pub use services::{GetServiceMenu, OpenServiceRequest, OrderServiceItem};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;
    /// Returns the status line. `Err` means the arguments were unusable.
    async fn execute(&self, input: Value) -> Result<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry exposing every hotel operation backed by `ledger`.
    pub fn hotel(ledger: Arc<BookingLedger>) -> Self {
        let mut registry = Self::default();
        registry.register(GetAllRoomTypes::new(ledger.clone()));
        registry.register(CheckRoomAvailability::new(ledger.clone()));
        registry.register(FinalizeHotelBooking::new(ledger.clone()));
        registry.register(ModifyHotelBooking::new(ledger.clone()));
        registry.register(CancelHotelBooking::new(ledger.clone()));
        registry.register(GetServiceMenu::new(ledger.clone()));
        registry.register(OrderServiceItem::new(ledger.clone()));
        registry.register(OpenServiceRequest::new(ledger));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Function definitions in the shape chat-completion APIs expect.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                })
            })
            .collect()
    }

    /// Runs a tool by name. Never fails: unknown tools and unusable
    /// arguments come back as `ERROR:` lines.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(event_name = "agent.tool.unknown", tool = name, "unknown tool requested");
            return format!("{}: unknown tool `{name}`", OutcomeToken::Error.as_str());
        };

        let arguments = match arguments {
            Value::String(raw) => match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(error) => {
                    return format!(
                        "{}: arguments for `{name}` are not valid JSON: {error}",
                        OutcomeToken::Error.as_str()
                    )
                }
            },
            Value::Null => json!({}),
            other => other,
        };

        let line = match tool.execute(arguments).await {
            Ok(line) => line,
            Err(error) => {
                format!("{}: invalid arguments for `{name}`: {error:#}", OutcomeToken::Error.as_str())
            }
        };
        tracing::info!(
            event_name = "agent.tool.completed",
            tool = name,
            outcome = line.split(':').next().unwrap_or_default(),
            "tool call completed"
        );
        line
    }
}

pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input).with_context(|| format!("`{tool}` received malformed arguments"))
}

pub(crate) fn success(message: impl std::fmt::Display) -> String {
    format!("{}: {message}", OutcomeToken::Success.as_str())
}

pub(crate) fn failure(error: &EngineError) -> String {
    error.status_line()
}

pub(crate) fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use concierge_db::{connect_with_settings, migrations, BookingLedger, InMemoryBillingMirror, SeedDataset};

    pub async fn ledger() -> Arc<BookingLedger> {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("seed");
        Arc::new(BookingLedger::new(pool, Arc::new(InMemoryBillingMirror::default()), 2026))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::ledger;
    use super::ToolRegistry;

    #[tokio::test]
    async fn hotel_registry_exposes_every_operation() {
        let registry = ToolRegistry::hotel(ledger().await);

        assert_eq!(registry.len(), 8);
        assert_eq!(
            registry.names(),
            vec![
                "cancel_hotel_booking",
                "check_room_availability",
                "finalize_hotel_booking",
                "get_all_room_types",
                "get_service_menu",
                "modify_hotel_booking",
                "open_service_request",
                "order_service_item",
            ]
        );

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 8);
        for definition in &definitions {
            assert_eq!(definition["type"], "function");
            assert_eq!(definition["function"]["parameters"]["type"], "object");
            assert!(definition["function"]["description"].as_str().is_some_and(|d| !d.is_empty()));
        }
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_become_error_lines() {
        let registry = ToolRegistry::hotel(ledger().await);

        let unknown = registry.dispatch("book_flight", json!({})).await;
        assert_eq!(unknown, "ERROR: unknown tool `book_flight`");

        let garbled = registry.dispatch("finalize_hotel_booking", json!("{not json")).await;
        assert!(garbled.starts_with("ERROR: arguments for `finalize_hotel_booking` are not valid JSON"));

        let missing = registry.dispatch("finalize_hotel_booking", json!({ "name": "A" })).await;
        assert!(missing.starts_with("ERROR: invalid arguments for `finalize_hotel_booking`"));
    }

    #[tokio::test]
    async fn string_encoded_arguments_are_accepted() {
        let registry = ToolRegistry::hotel(ledger().await);

        let line = registry
            .dispatch("get_service_menu", json!(r#"{"category": "Laundry"}"#))
            .await;
        assert!(line.starts_with("SUCCESS: "), "{line}");
        assert!(line.contains("Dry Clean Suit"));
    }
}
