mod helpers;
mod ipc;
mod proxy;
