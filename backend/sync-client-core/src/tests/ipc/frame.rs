use crate::ipc::encode_frame;
use crate::proto::{AppRequest, EngineRequest, engine_request};

use prost::Message as ProstMessage;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: Verifies that frames are binary and decode back to the request.
///
/// **WHY THIS MATTERS**: The host ignores text frames, so a request encoded as text would
/// hang the caller until the session ends.
///
/// **BUG THIS CATCHES**: Would catch `encode_frame()` producing a text frame or
/// truncating the buffer.
#[test]
fn given_request_when_encoded_then_binary_frame_decodes_to_same_request() {
    // GIVEN: A status request
    let request = EngineRequest {
        request_id: 7,
        payload: Some(engine_request::Payload::GetSyncStatus(AppRequest {
            app_name: "default".to_string(),
        })),
    };

    // WHEN: Encoding it as a frame
    let frame = encode_frame(&request).expect("encode should succeed");

    // THEN: Binary frame with identical content
    let Message::Binary(data) = frame else {
        panic!("Expected binary frame");
    };
    let decoded = EngineRequest::decode(&data[..]).expect("decode should succeed");
    assert_eq!(decoded, request);
}
