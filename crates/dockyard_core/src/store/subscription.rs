//! State change listeners.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::state::WorkspaceState;

/// Called with each committed state.
pub type Listener = Arc<dyn Fn(&Arc<WorkspaceState>) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Registered listeners of one store.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self, listener: Listener) -> Subscription {
        let mut table = self.table.lock();
        table.next_id += 1;
        let id = table.next_id;
        table.entries.push((id, listener));
        Subscription { id, table: Arc::downgrade(&self.table) }
    }

    /// Call every listener. The table is not locked while listeners run, so a
    /// listener may subscribe or unsubscribe.
    pub(crate) fn notify(&self, state: &Arc<WorkspaceState>) {
        let listeners: Vec<Listener> =
            self.table.lock().entries.iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().entries.len()
    }
}

/// Handle returned by [`crate::store::Store::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(table) = self.table.upgrade() else {
            return false;
        };
        let mut table = table.lock();
        let before = table.entries.len();
        table.entries.retain(|(id, _)| *id != self.id);
        table.entries.len() != before
    }
}
