use super::*;

#[test]
fn polling_transports_end_after_one_frame() {
    assert_eq!(TransportKind::XhrPolling.delivery(), Delivery::Polling);
    assert_eq!(TransportKind::JsonpPolling.delivery(), Delivery::Polling);
}

#[test]
fn http_streaming_transports_are_budgeted() {
    for kind in [TransportKind::XhrStreaming, TransportKind::EventSource, TransportKind::HtmlFile] {
        assert_eq!(kind.delivery(), Delivery::Streaming { budgeted: true });
        assert_eq!(kind.on_peer_gone(), PeerGone::Detach);
    }
}

#[test]
fn websockets_close_when_peer_vanishes() {
    for kind in [TransportKind::WebSocket, TransportKind::RawWebSocket] {
        assert_eq!(kind.delivery(), Delivery::Streaming { budgeted: false });
        assert_eq!(kind.on_peer_gone(), PeerGone::Close);
    }
}

#[test]
fn jsonp_requires_callback() {
    assert_eq!(
        Transport::new(TransportKind::JsonpPolling, None),
        Err(SockJsError::CallbackRequired)
    );
    assert_eq!(
        Transport::new(TransportKind::HtmlFile, Some("")),
        Err(SockJsError::CallbackRequired)
    );
}

#[test]
fn callback_rejects_script_injection() {
    assert_eq!(validate_callback(Some("alert(1)")), Err(SockJsError::InvalidCallback));
    assert_eq!(validate_callback(Some("a b")), Err(SockJsError::InvalidCallback));
    assert_eq!(validate_callback(Some("_jp.a1b2")), Ok("_jp.a1b2"));
}

#[test]
fn transport_picks_framing() {
    let jsonp = Transport::new(TransportKind::JsonpPolling, Some("cb")).unwrap();
    assert_eq!(jsonp.framing(), &Framing::Jsonp("cb".into()));
    assert_eq!(Transport::new(TransportKind::XhrPolling, None).unwrap().framing(), &Framing::Line);
    assert_eq!(Transport::new(TransportKind::RawWebSocket, None).unwrap().framing(), &Framing::Raw);
}

#[test]
fn xhr_streaming_preamble_is_2k_of_h() {
    let pre = preamble(TransportKind::XhrStreaming, None).unwrap();
    assert_eq!(pre.len(), XHR_STREAMING_PREAMBLE_LEN + 1);
    assert!(pre.starts_with("hhhh"));
    assert!(pre.ends_with("h\n"));
}

#[test]
fn htmlfile_prelude_is_padded_and_names_callback() {
    let pre = preamble(TransportKind::HtmlFile, Some("callback")).unwrap();
    assert!(pre.contains("var c = parent.callback;"));
    assert!(pre.len() >= HTMLFILE_PADDED_LEN);
    assert!(pre.ends_with("\r\n\r\n"));
}

#[test]
fn polling_has_no_preamble() {
    assert!(preamble(TransportKind::XhrPolling, None).is_none());
    assert!(preamble(TransportKind::JsonpPolling, Some("cb")).is_none());
}
