pub mod bind;
pub mod config;
pub mod ipc;
pub mod launch;
pub mod proxy;
pub mod remote;

pub use bind::BindError;
pub use config::ConfigError;
pub use ipc::IpcError;
pub use launch::LaunchError;
pub use proxy::ProxyError;
pub use remote::RemoteError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
