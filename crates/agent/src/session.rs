use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exchanges kept for prompt context; older ones fall off the front.
pub const MAX_EXCHANGES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Guest,
    Concierge,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub status_line: String,
    pub at: DateTime<Utc>,
}

impl ToolCallRecord {
    pub fn succeeded(&self) -> bool {
        self.status_line.starts_with("SUCCESS:")
    }
}

/// State of one guest conversation, owned by the orchestrator and passed
/// into every turn. The booking engine never stores it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    exchanges: VecDeque<Exchange>,
    tool_calls: Vec<ToolCallRecord>,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            exchanges: VecDeque::with_capacity(MAX_EXCHANGES),
            tool_calls: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn push_exchange(&mut self, speaker: Speaker, text: impl Into<String>) {
        if self.exchanges.len() == MAX_EXCHANGES {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange { speaker, text: text.into(), at: Utc::now() });
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub(crate) fn record_tool_call(&mut self, record: ToolCallRecord) {
        self.tool_calls.push(record);
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    pub fn last_tool_call(&self) -> Option<&ToolCallRecord> {
        self.tool_calls.last()
    }
}
