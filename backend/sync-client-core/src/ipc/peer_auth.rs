//! Per-connection authentication state on the engine host.

/// Tracks whether a peer has presented the expected token.
pub(crate) struct PeerAuth {
    authenticated: bool,
    expected_token: String,
}

impl PeerAuth {
    pub(crate) fn new(token: String) -> Self {
        Self {
            authenticated: false,
            expected_token: token,
        }
    }

    /// Mark the peer authenticated if `token` matches. Returns whether it did.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        if !token.is_empty() && token == self.expected_token {
            self.authenticated = true;
        }
        self.authenticated
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
