//! Store change events and the event bus that carries them.
//!
//! The workspace and the project directory publish a [`StoreEvent`] after
//! every state change. A presentation layer subscribes and re-renders; tests
//! subscribe to assert on notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Which store emitted a loading/error change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Workspace,
    Projects,
}

/// A state change in one of the stores.
///
/// Serialized with a `type` tag, e.g. `{"type":"NotesChanged","count":3}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StoreEvent {
    /// The active PDF was replaced or cleared.
    PdfChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// The current page moved.
    PageChanged { page: u32 },
    /// The notes collection changed.
    NotesChanged { count: usize },
    /// Nodes or edges changed.
    MindMapChanged { nodes: usize, edges: usize },
    /// The workspace was cleared.
    WorkspaceReset,
    /// A store's loading flag flipped.
    LoadingChanged { store: StoreKind, loading: bool },
    /// A store's error field was set or cleared.
    ErrorChanged {
        store: StoreKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The project list changed.
    ProjectsChanged { count: usize },
    /// The current project reference changed.
    CurrentProjectChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        project_id: Option<Uuid>,
    },
}

impl StoreEvent {
    /// Returns the namespaced event type (e.g., `"workspace.notes"`).
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            StoreEvent::PdfChanged { .. } => "workspace.pdf",
            StoreEvent::PageChanged { .. } => "workspace.page",
            StoreEvent::NotesChanged { .. } => "workspace.notes",
            StoreEvent::MindMapChanged { .. } => "workspace.mindmap",
            StoreEvent::WorkspaceReset => "workspace.reset",
            StoreEvent::LoadingChanged { .. } => "store.loading",
            StoreEvent::ErrorChanged { .. } => "store.error",
            StoreEvent::ProjectsChanged { .. } => "projects.list",
            StoreEvent::CurrentProjectChanged { .. } => "projects.current",
        }
    }
}

/// Envelope wrapping each event with an id and timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type.
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Domain-specific event data.
    pub payload: StoreEvent,
}

impl EventEnvelope {
    pub fn new(event: StoreEvent) -> Self {
        Self {
            event_id: crate::new_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast-based event bus.
///
/// Slow receivers that fall behind get a `Lagged` error and miss events; a
/// subscriber that lags should re-read the store state it renders.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: StoreEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::trace!(
            event_type = %envelope.event_type,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
