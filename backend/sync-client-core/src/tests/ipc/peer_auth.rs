use crate::ipc::peer_auth::PeerAuth;

/// **VALUE**: Verifies that only the exact expected token authenticates a peer.
///
/// **WHY THIS MATTERS**: The token is the only thing keeping other local processes from
/// driving the sync engine.
///
/// **BUG THIS CATCHES**: Would catch prefix matching or case-insensitive comparison.
#[test]
fn given_wrong_tokens_when_validated_then_peer_stays_unauthenticated() {
    // GIVEN: A peer expecting a token
    let mut auth = PeerAuth::new("expected-token".to_string());

    // WHEN/THEN: Near misses are rejected
    for token in ["", "expected", "EXPECTED-TOKEN", "expected-token "] {
        assert!(!auth.validate_token(token), "Should reject {token:?}");
    }
    assert!(!auth.is_authenticated());

    // WHEN/THEN: The exact token is accepted
    assert!(auth.validate_token("expected-token"));
    assert!(auth.is_authenticated());
}

/// **VALUE**: Verifies that an empty expected token never authenticates anyone.
///
/// **BUG THIS CATCHES**: Would catch a host started with an empty token accepting
/// clients that send no token at all.
#[test]
fn given_empty_expected_token_when_empty_token_presented_then_rejected() {
    // GIVEN: A host configured with an empty token
    let mut auth = PeerAuth::new(String::new());

    // WHEN: A client presents an empty token
    let accepted = auth.validate_token("");

    // THEN: Rejected
    assert!(!accepted);
}
