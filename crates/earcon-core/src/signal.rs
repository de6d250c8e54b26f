//! Signal/slot system for Horizon Earcon.
//!
//! Earcons publish their notifications (an episode finished, a configured
//! instrument could not be launched) through a [`Signal`]. Hosts connect
//! slots (callbacks) and get a [`ConnectionId`] back for disconnecting them.
//!
//! # Thread Safety
//!
//! Voices complete on whatever thread their instrument reports from, so
//! signals are emitted from arbitrary threads. Slots always run on the
//! emitting thread. The connection table is snapshotted before any slot runs,
//! so a slot may connect, disconnect or emit on the same signal without
//! deadlocking.
//!
//! # Example
//!
//! ```
//! use earcon_core::Signal;
//!
//! let finished = Signal::<String>::new();
//!
//! let conn_id = finished.connect(|earcon_id| {
//!     println!("Earcon finished: {}", earcon_id);
//! });
//!
//! finished.emit("alert".to_string());
//! finished.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one connected slot.
    ///
    /// Valid until the slot is disconnected or the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A notification with any number of connected slots.
///
/// `Args` is the value handed to every slot by reference.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
    /// Number of unblocked emissions.
    emit_counter: AtomicU64,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
            emit_counter: AtomicU64::new(0),
        }
    }

    /// Connect a slot.
    ///
    /// ```
    /// use earcon_core::Signal;
    ///
    /// let errors = Signal::<String>::new();
    /// let id = errors.connect(|message| eprintln!("{message}"));
    /// errors.emit("instrument 'kazoo' is not registered".to_string());
    /// assert!(errors.disconnect(id));
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connections.lock().insert(Arc::new(slot));
        tracing::trace!(target: targets::SIGNAL, ?id, "slot connected");
        id
    }

    /// Disconnect a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Suppress or resume emission.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Number of times this signal has been emitted while unblocked.
    pub fn emit_count(&self) -> u64 {
        self.emit_counter.load(Ordering::SeqCst)
    }

    /// Invoke every connected slot with `args`.
    ///
    /// Does nothing while blocked. Slots run on the calling thread after the
    /// connection lock has been released.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }
        self.emit_counter.fetch_add(1, Ordering::SeqCst);

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);
