use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatusKind {
    Start,
    End,
}

/// Progress of a single tool call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolStatus {
    pub name: String,
    pub status: ToolStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Live progress of a turn, delivered in the order it happens
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Text the model sent alongside tool calls
    AssistantPartial { content: String },
    ToolStatus(ToolStatus),
}

/// Sending half of the turn event stream. A closed or absent receiver is not
/// an error: nobody is watching.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<TurnEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn assistant_partial(&self, content: &str) {
        self.send(TurnEvent::AssistantPartial {
            content: content.to_string(),
        });
    }

    pub fn tool_start(&self, name: &str, args: &Value) {
        self.send(TurnEvent::ToolStatus(ToolStatus {
            name: name.to_string(),
            status: ToolStatusKind::Start,
            args: Some(args.clone()),
            result: None,
        }));
    }

    pub fn tool_end(&self, name: &str, result: &Value) {
        self.send(TurnEvent::ToolStatus(ToolStatus {
            name: name.to_string(),
            status: ToolStatusKind::End,
            args: None,
            result: Some(result.clone()),
        }));
    }

    fn send(&self, event: TurnEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                trace!("Turn event dropped, receiver closed");
            }
        }
    }
}
