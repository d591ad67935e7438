use super::*;
use crate::foundation::time::ManualTime;

fn registry() -> (HoldRegistry, ManualTime) {
    let time = ManualTime::new();
    (HoldRegistry::new(Arc::new(time.clone())), time)
}

#[test]
fn handles_are_strictly_increasing() {
    let (reg, _) = registry();
    let a = reg.hold_render(Some("a"), HoldOpts::default());
    let b = reg.hold_render(Some("b"), HoldOpts::default());
    reg.release_render(a).unwrap();
    let c = reg.hold_render(None, HoldOpts::default());
    assert!(a < b && b < c);

    reg.reset();
    let d = reg.hold_render(None, HoldOpts::default());
    assert!(d > c);
}

#[test]
fn unknown_or_double_release_is_an_error() {
    let (reg, _) = registry();
    assert!(matches!(
        reg.release_render(HoldHandle(42)),
        Err(WavyteError::UnknownHold(42))
    ));
    let h = reg.hold_render(Some("x"), HoldOpts::default());
    reg.release_render(h).unwrap();
    assert!(matches!(
        reg.release_render(h),
        Err(WavyteError::UnknownHold(_))
    ));
}

#[test]
fn pending_count_and_labels_track_holds() {
    let (reg, _) = registry();
    assert_eq!(reg.pending_count(), 0);
    let a = reg.hold_render(Some("load video"), HoldOpts::default());
    let b = reg.hold_render(None, HoldOpts::default());
    assert_eq!(reg.pending_count(), 2);
    assert_eq!(
        reg.pending_labels(),
        vec!["load video".to_owned(), format!("hold #{}", b.0)]
    );
    assert!(reg.is_pending(a));
    reg.release_render(a).unwrap();
    reg.release_render(b).unwrap();
    assert_eq!(reg.pending_count(), 0);
}

#[test]
fn timeout_names_label_and_evicts_token() {
    let (reg, time) = registry();
    let h = reg.hold_render(
        Some("seek clip"),
        HoldOpts::with_timeout(Duration::from_millis(100)),
    );
    time.advance(Duration::from_millis(99));
    reg.poll().unwrap();

    time.advance(Duration::from_millis(1));
    let err = reg.poll().unwrap_err();
    match &err {
        WavyteError::HoldTimeout {
            handle,
            label,
            timeout_ms,
        } => {
            assert_eq!(*handle, h.0);
            assert_eq!(label, "seek clip");
            assert_eq!(*timeout_ms, 100);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("seek clip"));
    assert!(err.is_fatal_render_error());
    assert_eq!(reg.pending_count(), 0);
    assert!(reg.release_render(h).is_err());

    // Sticky until reset.
    assert!(reg.poll().is_err());
    reg.reset();
    reg.poll().unwrap();
}

#[test]
fn release_before_deadline_suppresses_timeout() {
    let (reg, time) = registry();
    let h = reg.hold_render(Some("x"), HoldOpts::with_timeout(Duration::from_millis(50)));
    time.advance(Duration::from_millis(10));
    reg.release_render(h).unwrap();
    time.advance(Duration::from_secs(10));
    reg.poll().unwrap();
}

#[test]
fn oldest_expiry_is_reported() {
    let (reg, time) = registry();
    reg.hold_render(Some("late"), HoldOpts::with_timeout(Duration::from_millis(80)));
    reg.hold_render(Some("early"), HoldOpts::with_timeout(Duration::from_millis(20)));
    assert_eq!(reg.next_deadline(), Some(Duration::from_millis(20)));
    time.advance(Duration::from_millis(100));
    let err = reg.poll().unwrap_err();
    assert!(matches!(err, WavyteError::HoldTimeout { ref label, .. } if label == "early"));
    assert_eq!(reg.next_deadline(), None);
}

#[test]
fn default_timeout_applies_and_can_be_disabled() {
    let (reg, time) = registry();
    reg.hold_render(Some("forever"), HoldOpts::default());
    time.advance(DEFAULT_HOLD_TIMEOUT);
    assert!(reg.poll().is_err());

    let (reg, time) = registry();
    let reg = reg.with_default_timeout(None);
    reg.hold_render(Some("forever"), HoldOpts::default());
    time.advance(Duration::from_secs(3600));
    reg.poll().unwrap();
    assert_eq!(reg.next_deadline(), None);
}

#[test]
fn abort_is_fatal_until_reset() {
    let (reg, _) = registry();
    let err = reg.abort_render("decoder crashed");
    assert_eq!(err.to_string(), "render aborted: decoder crashed");
    assert!(matches!(reg.poll(), Err(WavyteError::Aborted(_))));
    reg.reset();
    reg.poll().unwrap();
}

#[test]
fn reset_clears_pending_holds() {
    let (reg, time) = registry();
    reg.hold_render(Some("a"), HoldOpts::with_timeout(Duration::from_millis(5)));
    reg.reset();
    assert_eq!(reg.pending_count(), 0);
    time.advance(Duration::from_secs(1));
    reg.poll().unwrap();
}

#[test]
fn guard_releases_on_drop_and_explicitly() {
    let (reg, _) = registry();
    {
        let _guard = reg.hold_scoped(Some("scoped"), HoldOpts::default());
        assert_eq!(reg.pending_count(), 1);
    }
    assert_eq!(reg.pending_count(), 0);

    let guard = reg.hold_scoped(Some("explicit"), HoldOpts::default());
    let h = guard.handle();
    guard.release().unwrap();
    assert!(!reg.is_pending(h));

    let guard = reg.hold_scoped(Some("evicted"), HoldOpts::default());
    reg.reset();
    assert!(guard.release().is_err());
}

#[test]
fn clones_share_the_table() {
    let (reg, _) = registry();
    let other = reg.clone();
    let h = other.hold_render(Some("shared"), HoldOpts::default());
    assert_eq!(reg.pending_count(), 1);
    reg.release_render(h).unwrap();
    assert_eq!(other.pending_count(), 0);
}
