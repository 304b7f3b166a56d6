//! Connection lifecycle state.
//!
//! The transport owns a `ConnectionStateHandle` and is the only writer.
//! Everyone else holds a `ConnectionStateObserver`, which reads the current
//! state lock-free and can wait for transitions (the reconnect flusher uses
//! this to drain the pending queue as soon as the broker is back).

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Connection state of the broker transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the broker
    Disconnected,
    /// Attempting to establish connection
    Connecting,
    /// Successfully connected
    Connected,
    /// Connection lost, attempting to reconnect
    Reconnecting,
    /// Connection failed (max retries exceeded)
    Failed,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::Failed => 4,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Only `Connected` allows sends.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Write side of the connection state, owned by the transport.
///
/// Cloning shares the same underlying state; lifecycle callbacks of the
/// transport call `set` on whichever clone they hold.
#[derive(Clone)]
pub struct ConnectionStateHandle {
    state: Arc<AtomicU8>,
    changes: Arc<watch::Sender<ConnectionState>>,
}

impl ConnectionStateHandle {
    /// Create a handle in the `Disconnected` state.
    pub fn new() -> Self {
        Self::with_state(ConnectionState::Disconnected)
    }

    pub fn with_state(initial: ConnectionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(AtomicU8::new(initial.to_u8())),
            changes: Arc::new(tx),
        }
    }

    /// Record a new state and wake observers if it differs from the
    /// current one. Returns the previous state.
    ///
    /// The atomic is written while the watch channel's value is locked, so
    /// concurrent writers are serialised and `state()` always agrees with
    /// the last value observers were sent.
    pub fn set(&self, new_state: ConnectionState) -> ConnectionState {
        let mut previous = new_state;
        self.changes.send_if_modified(|current| {
            previous = *current;
            self.state.store(new_state.to_u8(), Ordering::SeqCst);
            *current = new_state;
            previous != new_state
        });
        if previous != new_state {
            tracing::debug!(from = %previous, to = %new_state, "Connection state changed");
        }
        previous
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Create a read-only observer of this state.
    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver {
            state: Arc::clone(&self.state),
            changes: self.changes.subscribe(),
        }
    }
}

impl Default for ConnectionStateHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of the connection state.
///
/// Multiple observers can share the same underlying state.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
    changes: watch::Receiver<ConnectionState>,
}

impl ConnectionStateObserver {
    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Wait for the next state transition.
    ///
    /// Returns `None` once every handle has been dropped. Rapid transitions
    /// may be coalesced; the latest state is always reported.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.changes.changed().await.ok()?;
        Some(*self.changes.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_roundtrip() {
        let states = [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
        ];

        for state in states {
            assert_eq!(ConnectionState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn only_connected_counts_as_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[test]
    fn test_observer_reads_state() {
        let handle = ConnectionStateHandle::new();
        let observer = handle.observer();

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(!observer.is_connected());

        let previous = handle.set(ConnectionState::Connected);

        assert_eq!(previous, ConnectionState::Disconnected);
        assert_eq!(observer.state(), ConnectionState::Connected);
        assert!(observer.is_connected());
    }

    #[tokio::test]
    async fn observer_sees_transition() {
        let handle = ConnectionStateHandle::new();
        let mut observer = handle.observer();

        handle.set(ConnectionState::Connected);

        assert_eq!(observer.changed().await, Some(ConnectionState::Connected));
    }

    #[tokio::test]
    async fn observer_ends_when_handle_dropped() {
        let handle = ConnectionStateHandle::new();
        let mut observer = handle.observer();
        drop(handle);

        assert_eq!(observer.changed().await, None);
    }

    #[test]
    fn concurrent_writers_leave_state_and_observers_in_agreement() {
        let handle = ConnectionStateHandle::new();
        let observer = handle.observer();
        let states = [
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Disconnected,
            ConnectionState::Failed,
        ];

        std::thread::scope(|scope| {
            for (i, state) in states.into_iter().enumerate() {
                let handle = handle.clone();
                let other = states[(i + 1) % states.len()];
                scope.spawn(move || {
                    for n in 0..2_000 {
                        let next = if n % 2 == 0 { state } else { other };
                        handle.set(next);
                    }
                });
            }
        });

        assert_eq!(handle.state(), *observer.changes.borrow());
        assert_eq!(observer.state(), *observer.changes.borrow());
    }

    #[tokio::test]
    async fn setting_same_state_does_not_wake() {
        let handle = ConnectionStateHandle::with_state(ConnectionState::Connected);
        let mut observer = handle.observer();

        handle.set(ConnectionState::Connected);
        handle.set(ConnectionState::Reconnecting);

        assert_eq!(
            observer.changed().await,
            Some(ConnectionState::Reconnecting)
        );
    }
}
