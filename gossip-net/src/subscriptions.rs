//! The mapping from topic to locally registered delivery callbacks.

use {
  parking_lot::RwLock,
  std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
  },
  tracing::warn,
};

pub type Callback = Arc<dyn Fn(&str, &str) + Send + Sync + 'static>;

#[derive(Clone, Default)]
pub struct Subscriptions {
  inner: Arc<RwLock<HashMap<String, Vec<Callback>>>>,
}

impl Subscriptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends `callback` to `topic`'s list. Returns `true` if this is the
  /// first subscription registered for `topic`, so the caller can add it
  /// to the self-descriptor.
  pub fn subscribe(&self, topic: &str, callback: Callback) -> bool {
    let mut guard = self.inner.write();
    let entry = guard.entry(topic.to_string()).or_default();
    let is_first = entry.is_empty();
    entry.push(callback);
    is_first
  }

  pub fn has_subscribers(&self, topic: &str) -> bool {
    self.inner.read().get(topic).is_some_and(|callbacks| !callbacks.is_empty())
  }

  /// Invokes every callback registered for `topic`, in registration order,
  /// synchronously on the calling task. A panicking callback does not
  /// stop the remaining callbacks from running.
  pub fn deliver(&self, topic: &str, content: &str) {
    let callbacks = self.inner.read().get(topic).cloned();
    let Some(callbacks) = callbacks else { return };
    for callback in callbacks {
      let outcome = catch_unwind(AssertUnwindSafe(|| callback(topic, content)));
      if outcome.is_err() {
        warn!(topic, "subscriber callback panicked, continuing");
      }
    }
  }
}
