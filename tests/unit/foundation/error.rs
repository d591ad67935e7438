use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        WavyteError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        WavyteError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        WavyteError::aborted("x")
            .to_string()
            .contains("render aborted:")
    );
    assert!(
        WavyteError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn hold_timeout_names_label_and_handle() {
    let err = WavyteError::HoldTimeout {
        handle: 7,
        label: "seeking video 'intro.mp4'".to_owned(),
        timeout_ms: 250,
    };
    let msg = err.to_string();
    assert!(msg.contains("render hold 7"));
    assert!(msg.contains("intro.mp4"));
    assert!(msg.contains("250ms"));
    assert!(err.is_fatal_render_error());
}

#[test]
fn frame_timeout_lists_pending_labels() {
    let err = WavyteError::FrameTimeout {
        frame: 12,
        pending: vec!["a".to_owned(), "b".to_owned()],
    };
    assert!(err.to_string().contains("pending holds: a, b"));
}

#[test]
fn unknown_hold_is_not_fatal_to_render() {
    assert!(!WavyteError::UnknownHold(3).is_fatal_render_error());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = WavyteError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
