use super::*;

fn params() -> SequenceParams {
    SequenceParams {
        id: Some("intro".to_owned()),
        name: None,
        from: 30,
        duration_in_frames: FrameSpan::Finite(60),
        playback_rate: 1.0,
        track_index: 2,
        premount_for: 0,
    }
}

#[test]
fn no_overrides_keeps_declared_params() {
    let r = resolve_sequence(&params(), "main/sequence@30", &NoOverrides).unwrap();
    assert_eq!(r.from, 30);
    assert_eq!(r.duration_in_frames, FrameSpan::Finite(60));
    assert_eq!(r.track_index, 2);
    assert_eq!(r.placement, Affine::IDENTITY);
}

#[test]
fn override_replaces_timing_and_placement() {
    let mut store = InMemoryOverrides::new();
    let mut ov = SequenceOverride::timing(45, FrameSpan::Finite(20));
    ov.x = Some(10.0);
    ov.scale_x = Some(2.0);
    ov.track_index = Some(5);
    store.insert("main/sequence@30", ov).unwrap();

    let r = resolve_sequence(&params(), "main/sequence@30", &store).unwrap();
    assert_eq!(r.from, 45);
    assert_eq!(r.duration_in_frames, FrameSpan::Finite(20));
    assert_eq!(r.track_index, 5);
    assert_eq!(r.playback_rate, 1.0);
    let p = r.placement * kurbo::Point::new(1.0, 1.0);
    assert_eq!((p.x, p.y), (12.0, 1.0));

    let other = resolve_sequence(&params(), "main/other@30", &store).unwrap();
    assert_eq!(other.from, 30);
}

#[test]
fn malformed_overrides_are_rejected() {
    let mut store = InMemoryOverrides::new();
    assert!(
        store
            .insert("p", SequenceOverride::timing(0, FrameSpan::Finite(0)))
            .is_err()
    );
    let mut ov = SequenceOverride::timing(0, FrameSpan::Finite(5));
    ov.playback_rate = Some(0.0);
    assert!(store.insert("p", ov).is_err());
    let mut ov = SequenceOverride::timing(0, FrameSpan::Finite(5));
    ov.y = Some(f64::NAN);
    assert!(store.insert("p", ov).is_err());
    assert!(store.is_empty());
}

#[test]
fn overrides_load_from_json() {
    let store = InMemoryOverrides::from_json_str(
        r#"{
            "main/title@30": { "from": 40, "duration_in_frames": 10, "track_index": 1 },
            "main/bg@0": { "from": 0, "duration_in_frames": "infinite", "scale_x": 0.5 }
        }"#,
    )
    .unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.lookup("main/title@30").unwrap().from, 40);
    assert_eq!(
        store.lookup("main/bg@0").unwrap().duration_in_frames,
        FrameSpan::Infinite
    );

    let err = InMemoryOverrides::from_json_str(r#"{ "a": { "from": 0, "duration_in_frames": 0 } }"#)
        .unwrap_err();
    assert!(err.to_string().contains("override for 'a'"));
    assert!(InMemoryOverrides::from_json_str(r#"{ "a": { "from": 0 } }"#).is_err());
}
