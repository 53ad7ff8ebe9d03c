use super::*;

fn messages(items: &[&str]) -> Frame {
    Frame::Messages(items.iter().map(|s| (*s).to_string()).collect())
}

// =============================================================================
// Canonical form
// =============================================================================

#[test]
fn open_and_heartbeat_are_single_characters() {
    assert_eq!(Frame::Open.to_string(), "o");
    assert_eq!(Frame::Heartbeat.to_string(), "h");
}

#[test]
fn message_frame_is_json_array() {
    assert_eq!(messages(&["hello", "world"]).to_string(), r#"a["hello","world"]"#);
}

#[test]
fn message_frame_escapes_quotes() {
    assert_eq!(messages(&["say \"hi\""]).to_string(), r#"a["say \"hi\""]"#);
}

#[test]
fn empty_message_frame_is_empty_array() {
    assert_eq!(messages(&[]).to_string(), "a[]");
}

#[test]
fn close_frame_is_status_tuple() {
    assert_eq!(Frame::Close(CloseStatus::default()).to_string(), r#"c[3000,"Go away!"]"#);
    assert_eq!(
        Frame::Close(CloseStatus::another_connection()).to_string(),
        r#"c[2010,"Another connection still open"]"#
    );
}

#[test]
fn discriminator_matches_first_character() {
    for frame in [Frame::Open, Frame::Heartbeat, messages(&["x"]), Frame::Close(CloseStatus::interrupted())] {
        assert_eq!(frame.to_string().chars().next(), Some(frame.discriminator()));
    }
}

// =============================================================================
// Framings
// =============================================================================

#[test]
fn line_framing_appends_newline() {
    assert_eq!(Framing::Line.encode(&Frame::Open), vec!["o\n".to_string()]);
}

#[test]
fn websocket_framing_is_bare_frame() {
    assert_eq!(Framing::WebSocket.encode(&messages(&["x"])), vec![r#"a["x"]"#.to_string()]);
}

#[test]
fn eventsource_framing_wraps_data_line() {
    assert_eq!(Framing::EventSource.encode(&Frame::Heartbeat), vec!["data: h\r\n\r\n".to_string()]);
}

#[test]
fn htmlfile_framing_double_encodes() {
    let out = Framing::HtmlFile.encode(&messages(&["x"]));
    assert_eq!(out, vec!["<script>\np(\"a[\\\"x\\\"]\");\n</script>\r\n".to_string()]);
}

#[test]
fn jsonp_framing_uses_callback_name() {
    let out = Framing::Jsonp("cb.x".into()).encode(&Frame::Open);
    assert_eq!(out, vec!["cb.x(\"o\");\r\n".to_string()]);
}

#[test]
fn raw_framing_delivers_bare_messages() {
    assert_eq!(Framing::Raw.encode(&messages(&["a", "b"])), vec!["a".to_string(), "b".to_string()]);
    assert!(Framing::Raw.encode(&Frame::Open).is_empty());
    assert!(Framing::Raw.encode(&Frame::Heartbeat).is_empty());
    assert!(Framing::Raw.encode(&Frame::Close(CloseStatus::default())).is_empty());
}

#[test]
fn encoding_is_deterministic() {
    let frame = messages(&["ping", "pong"]);
    for framing in [Framing::Line, Framing::EventSource, Framing::HtmlFile, Framing::Jsonp("f".into())] {
        assert_eq!(framing.encode(&frame), framing.encode(&frame));
    }
}
