//! Seam between the proxy and whatever hosts the sync engine.

use crate::error::BindError;
use crate::proxy::connection_state::{ConnectionState, ConnectionStatus, RemoteEngineHandle};
use crate::{SYNC_SERVICE_CLASS, SYNC_SERVICE_PACKAGE};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the engine service to bind to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub package: String,
    pub class_name: String,
    /// Start the engine if it is not already running.
    pub auto_create: bool,
}

impl Default for BindRequest {
    fn default() -> Self {
        Self {
            package: SYNC_SERVICE_PACKAGE.to_string(),
            class_name: SYNC_SERVICE_CLASS.to_string(),
            auto_create: true,
        }
    }
}

/// Performs bind and unbind on behalf of a proxy.
///
/// `bind` must return without waiting for the engine. The outcome is delivered
/// later through the [`ServiceConnection`]: `on_connected` with a handle once the
/// engine is reachable, `on_disconnected` if it never becomes reachable or goes
/// away. `unbind` releases the binding and must not deliver further callbacks
/// for it.
pub trait ServiceBinder: Send + Sync {
    fn bind(&self, request: BindRequest, connection: ServiceConnection) -> Result<(), BindError>;

    fn unbind(&self, connection: &ServiceConnection) -> Result<(), BindError>;
}

/// Callback intake handed to a [`ServiceBinder`].
///
/// Clones share the same state; the proxy that created it observes every callback.
/// Callbacks apply in arrival order, the last one wins.
#[derive(Clone)]
pub struct ServiceConnection {
    id: u64,
    state: Arc<RwLock<ConnectionState>>,
}

impl ServiceConnection {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            state: Arc::new(RwLock::new(ConnectionState::Unbound)),
        }
    }

    /// Stable identity binders can key their sessions by.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn on_connected(&self, handle: RemoteEngineHandle) {
        let previous = std::mem::replace(&mut *self.write(), ConnectionState::Bound(handle));
        info!(
            "Sync service connection {} bound (was {})",
            self.id,
            previous.status()
        );
    }

    pub fn on_disconnected(&self) {
        let previous = std::mem::replace(&mut *self.write(), ConnectionState::Unbound);
        info!(
            "Sync service connection {} unbound (was {})",
            self.id,
            previous.status()
        );
    }

    pub fn status(&self) -> ConnectionStatus {
        self.read().status()
    }

    /// Clone of the engine handle if bound. The lock is released on return.
    pub(crate) fn bound_handle(&self) -> Option<RemoteEngineHandle> {
        self.read().handle().cloned()
    }

    /// Moves `Unbound` to `BindRequested`. Returns `false` if a bind is already
    /// requested or established.
    pub(crate) fn begin_bind(&self) -> bool {
        let mut state = self.write();
        match *state {
            ConnectionState::Unbound => {
                *state = ConnectionState::BindRequested;
                true
            }
            ref other => {
                debug!(
                    "Bind for connection {} skipped, already {}",
                    self.id,
                    other.status()
                );
                false
            }
        }
    }

    /// Undo [`begin_bind`](Self::begin_bind) unless a callback already moved the state on.
    pub(crate) fn abort_bind(&self) {
        let mut state = self.write();
        if matches!(*state, ConnectionState::BindRequested) {
            *state = ConnectionState::Unbound;
        }
    }

    pub(crate) fn reset(&self) {
        *self.write() = ConnectionState::Unbound;
    }

    fn read(&self) -> RwLockReadGuard<'_, ConnectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConnectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ServiceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConnection")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}
