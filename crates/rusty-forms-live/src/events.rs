// File: rusty-forms-live/src/events.rs
// Purpose: Per-field validation events and the bus they are emitted on

use tokio::sync::broadcast;

/// Lifecycle notifications for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    /// About to validate; a listener may cancel the run
    Validate { field: String },
    /// The error list changed and is non-empty
    Invalid { field: String, errors: Vec<String> },
    /// The field became clean; carries the errors it had before
    Valid { field: String, previous: Vec<String> },
    /// A run committed its result
    Validated { field: String },
}

impl FieldEvent {
    pub fn field(&self) -> &str {
        match self {
            FieldEvent::Validate { field }
            | FieldEvent::Invalid { field, .. }
            | FieldEvent::Valid { field, .. }
            | FieldEvent::Validated { field } => field,
        }
    }
}

/// Listener verdict; only honoured for [`FieldEvent::Validate`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Propagation {
    #[default]
    Continue,
    Cancel,
}

/// Receives every event the engine emits.
///
/// Events are emitted after the engine releases its field state, so
/// listeners may query the engine.
pub trait EventBus: Send + Sync {
    fn emit(&self, event: &FieldEvent) -> Propagation;
}

impl<F> EventBus for F
where
    F: Fn(&FieldEvent) -> Propagation + Send + Sync,
{
    fn emit(&self, event: &FieldEvent) -> Propagation {
        self(event)
    }
}

/// Fans events out to `tokio::sync::broadcast` subscribers. Never cancels.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    sender: broadcast::Sender<FieldEvent>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for BroadcastBus {
    fn emit(&self, event: &FieldEvent) -> Propagation {
        // No subscribers is fine
        let _ = self.sender.send(event.clone());
        Propagation::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let bus = BroadcastBus::default();
        let mut rx = bus.subscribe();

        let event = FieldEvent::Invalid {
            field: "email".to_string(),
            errors: vec!["taken".to_string()],
        };
        assert_eq!(bus.emit(&event), Propagation::Continue);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
        assert_eq!(received.field(), "email");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = BroadcastBus::new(4);
        let event = FieldEvent::Validated {
            field: "x".to_string(),
        };
        assert_eq!(bus.emit(&event), Propagation::Continue);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn test_closure_bus_can_cancel() {
        let bus = |event: &FieldEvent| match event {
            FieldEvent::Validate { field } if field == "skip" => Propagation::Cancel,
            _ => Propagation::Continue,
        };
        let skip = FieldEvent::Validate {
            field: "skip".to_string(),
        };
        let keep = FieldEvent::Validate {
            field: "keep".to_string(),
        };
        assert_eq!(bus.emit(&skip), Propagation::Cancel);
        assert_eq!(bus.emit(&keep), Propagation::Continue);
    }
}
