//! Change notification for models.
//!
//! Every mutation attempt through a model setter produces an
//! [`AttributeChanged`] event, delivered synchronously to each subscriber
//! in registration order. Values are carried as JSON so one listener type
//! serves every field kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A field mutation, with the field's value before and after the attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChanged {
    pub field: String,
    pub previous: Value,
    pub new: Value,
}

impl AttributeChanged {
    /// Whether the stored value actually changed.
    pub fn is_change(&self) -> bool {
        self.previous != self.new
    }
}

/// Handle returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// When setters notify subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyPolicy {
    /// After every attempt, including rejected ones.
    #[default]
    EveryAttempt,
    /// Only after the value was accepted.
    OnSuccess,
}

impl NotifyPolicy {
    pub(crate) fn should_notify(self, accepted: bool) -> bool {
        match self {
            NotifyPolicy::EveryAttempt => true,
            NotifyPolicy::OnSuccess => accepted,
        }
    }
}

/// Per-instance model options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelOptions {
    pub notify: NotifyPolicy,
}

type Listener = Box<dyn FnMut(&AttributeChanged)>;

/// Ordered subscriber list owned by a model.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl Listeners {
    pub fn subscribe(&mut self, listener: impl FnMut(&AttributeChanged) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn emit(&mut self, event: &AttributeChanged) {
        tracing::trace!(
            field = %event.field,
            previous = %event.previous,
            new = %event.new,
            listeners = self.entries.len(),
            "attribute changed"
        );
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }
}
