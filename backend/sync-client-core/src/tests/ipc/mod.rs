mod frame;
mod peer_auth;
