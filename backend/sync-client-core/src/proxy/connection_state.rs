use crate::engine::SyncEngineInterface;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Shared reference to a bound sync engine.
///
/// Only ever stored inside [`ConnectionState::Bound`]; dropping the state drops the
/// proxy's reference to the engine.
#[derive(Clone)]
pub struct RemoteEngineHandle(Arc<dyn SyncEngineInterface>);

impl RemoteEngineHandle {
    pub fn new(engine: impl SyncEngineInterface + 'static) -> Self {
        Self(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<dyn SyncEngineInterface>) -> Self {
        Self(engine)
    }

    #[inline]
    pub fn engine(&self) -> &dyn SyncEngineInterface {
        self.0.as_ref()
    }
}

impl fmt::Debug for RemoteEngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEngineHandle").finish_non_exhaustive()
    }
}

/// Lifecycle of the binding to the sync engine.
#[derive(Debug, Clone, Default)]
pub enum ConnectionState {
    #[default]
    Unbound,
    BindRequested,
    Bound(RemoteEngineHandle),
}

impl ConnectionState {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            ConnectionState::Unbound => ConnectionStatus::Unbound,
            ConnectionState::BindRequested => ConnectionStatus::BindRequested,
            ConnectionState::Bound(_) => ConnectionStatus::Bound,
        }
    }

    pub fn handle(&self) -> Option<&RemoteEngineHandle> {
        match self {
            ConnectionState::Bound(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Handle-free view of [`ConnectionState`] for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Unbound,
    BindRequested,
    Bound,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Unbound => "unbound",
            ConnectionStatus::BindRequested => "bind_requested",
            ConnectionStatus::Bound => "bound",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
