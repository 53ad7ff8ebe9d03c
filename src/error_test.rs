use super::*;

#[test]
fn client_errors_map_to_statuses() {
    assert_eq!(SockJsError::NotOpen.status(), StatusCode::NOT_FOUND);
    assert_eq!(SockJsError::WebSocketDisabled.status(), StatusCode::NOT_FOUND);
    assert_eq!(SockJsError::InvalidJson.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(SockJsError::PayloadExpected.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(SockJsError::BadUpgrade.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn messages_match_wire_text() {
    assert_eq!(SockJsError::InvalidJson.to_string(), "Broken JSON encoding.");
    assert_eq!(SockJsError::NotOpen.to_string(), "Session is not open!");
    assert_eq!(SockJsError::CallbackRequired.to_string(), "\"callback\" parameter required");
}

#[test]
fn error_codes_are_distinct() {
    let all = [
        SockJsError::InvalidJson,
        SockJsError::PayloadExpected,
        SockJsError::NotOpen,
        SockJsError::CallbackRequired,
        SockJsError::InvalidCallback,
        SockJsError::WebSocketDisabled,
        SockJsError::BadUpgrade,
    ];
    let mut codes: Vec<_> = all.iter().map(<SockJsError as ErrorCode>::error_code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), all.len());
}

#[test]
fn into_response_uses_status() {
    let response = SockJsError::NotOpen.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("text/plain; charset=UTF-8")
    );
}
