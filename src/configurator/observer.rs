//! Change notifications delivered after a change is committed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parts::{Part, PartChange};

/// What produced a `PartsChanged` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// A product configuration was loaded and its defaults applied
    Config,
    /// A single part was set or removed
    Set,
    /// Several parts were set in one call
    Bulk,
    /// The current parts were re-run through the rules without a change
    Resolve,
    Undo,
    Redo,
}

/// The consolidated diff for one committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsChanged {
    pub action: ChangeAction,
    /// The part values that were requested, before resolution
    pub trigger: Vec<Part>,
    /// Every part whose value differs from the pre-change state
    pub changes: Vec<PartChange>,
}

impl PartsChanged {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Receives committed changes.
///
/// Observers only see the event, never the configurator, so a notification
/// cannot start another change while one is being delivered.
pub trait PartsObserver {
    fn name(&self) -> &str {
        "PartsObserver"
    }

    fn on_parts_changed(&mut self, event: &PartsChanged);
}

impl<F> PartsObserver for F
where
    F: FnMut(&PartsChanged),
{
    fn name(&self) -> &str {
        "FnObserver"
    }

    fn on_parts_changed(&mut self, event: &PartsChanged) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Rebuilds an id from the value a host stored, e.g. across an FFI
    /// boundary. Unknown ids are ignored by `unsubscribe`.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObserverId({})", self.0)
    }
}

/// Observers in subscription order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Box<dyn PartsObserver>)>,
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .observers
            .iter()
            .map(|(_, o)| o.name())
            .collect::<Vec<&str>>()
            .join(", ");

        f.debug_struct("ObserverRegistry")
            .field("observers", &names)
            .finish()
    }
}

impl ObserverRegistry {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn PartsObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn notify(&mut self, event: &PartsChanged) {
        for (_, observer) in &mut self.observers {
            observer.on_parts_changed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event() -> PartsChanged {
        PartsChanged {
            action: ChangeAction::Set,
            trigger: vec![Part::new("upper", "nappa", "white")],
            changes: vec![],
        }
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ObserverRegistry::default();

        let first = log.clone();
        registry.subscribe(Box::new(move |_: &PartsChanged| first.borrow_mut().push(1)));
        let second = log.clone();
        registry.subscribe(Box::new(move |_: &PartsChanged| second.borrow_mut().push(2)));

        registry.notify(&event());
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut registry = ObserverRegistry::default();

        let counter = count.clone();
        let id = registry.subscribe(Box::new(move |_: &PartsChanged| *counter.borrow_mut() += 1));

        registry.notify(&event());
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id), "Second unsubscribe should be a no-op");
        registry.notify(&event());

        assert_eq!(*count.borrow(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_raw_id_unsubscribes_and_frees_slot() {
        let mut registry = ObserverRegistry::default();
        let first = registry.subscribe(Box::new(|_: &PartsChanged| {}));
        let second = registry.subscribe(Box::new(|_: &PartsChanged| {}));
        assert_ne!(first.raw(), second.raw());

        for _ in 0..3 {
            let id = registry.subscribe(Box::new(|_: &PartsChanged| {}));
            assert!(registry.unsubscribe(ObserverId::from_raw(id.raw())));
        }
        assert_eq!(registry.len(), 2, "Unsubscribed observers should not linger");
        assert!(!registry.unsubscribe(ObserverId::from_raw(999)));
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeAction::Undo).unwrap();
        assert_eq!(json, r#""undo""#);
    }
}
