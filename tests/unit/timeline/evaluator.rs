use super::*;
use crate::composition::dsl::{
    CompositionBuilder, LoopBuilder, SequenceBuilder, SeriesBuilder, display, freeze,
};
use crate::foundation::core::{Canvas, Fps};
use crate::timeline::mount::MountTracker;
use crate::timeline::overrides::{InMemoryOverrides, NoOverrides, SequenceOverride};

fn builder() -> CompositionBuilder {
    CompositionBuilder::new(
        "main",
        Fps::new(30, 1).unwrap(),
        Canvas {
            width: 320,
            height: 180,
        },
        FrameSpan::Finite(150),
    )
}

fn at(tl: &Timeline, frame: u64) -> EvaluatedFrame {
    Evaluator::eval_frame(tl, FrameClock::paused(FrameIndex(frame)), &NoOverrides).unwrap()
}

fn title_timeline() -> Timeline {
    builder()
        .child(
            SequenceBuilder::new()
                .name("title")
                .from(30)
                .duration(60)
                .child(display("headline"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .timeline()
        .unwrap()
}

#[test]
fn sequence_mounts_child_only_inside_window() {
    let tl = title_timeline();
    assert!(at(&tl, 10).leaves.is_empty());
    assert!(at(&tl, 100).leaves.is_empty());

    let f = at(&tl, 50);
    let leaf = f.leaf("main/title@30/display:headline").unwrap();
    assert_eq!(leaf.local_frame(), 20);
    assert!(leaf.is_visible());
    assert!(!leaf.env.clock.playing);
}

#[test]
fn frame_bounds_are_checked() {
    let tl = title_timeline();
    let err = Evaluator::eval_frame(&tl, FrameClock::paused(FrameIndex(150)), &NoOverrides)
        .unwrap_err();
    assert!(err.to_string().contains("out of bounds"));
    assert!(
        Evaluator::eval_frame(
            &tl,
            FrameClock {
                frame: -1,
                playing: false
            },
            &NoOverrides
        )
        .is_err()
    );
}

#[test]
fn loops_repeat_children_and_stop_after_times() {
    let tl = builder()
        .child(
            LoopBuilder::new(10)
                .times(3)
                .child(display("tick"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .timeline()
        .unwrap();

    let f = at(&tl, 25);
    let leaf = &f.leaves[0];
    assert_eq!(leaf.path, "main/loop:10x3/display:tick");
    assert_eq!(leaf.local_frame(), 5);
    assert_eq!(leaf.env.loop_iteration, Some(2));
    assert!(at(&tl, 30).leaves.is_empty());
}

#[test]
fn freeze_inside_sequence_observes_constant_frame() {
    let tl = builder()
        .child(
            SequenceBuilder::new()
                .from(30)
                .child(freeze(12, vec![display("still")]))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .timeline()
        .unwrap();
    for frame in [30, 60, 149] {
        let f = at(&tl, frame);
        assert_eq!(f.leaves[0].local_frame(), 12, "frame {frame}");
    }
}

#[test]
fn series_entries_overlap_with_negative_offset() {
    let tl = builder()
        .child(
            SeriesBuilder::new()
                .entry(FrameSpan::Finite(10), 0, vec![display("a")])
                .entry(FrameSpan::Finite(20), -5, vec![display("b")])
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .timeline()
        .unwrap();

    let ids = |frame| -> Vec<String> {
        at(&tl, frame)
            .leaves
            .iter()
            .map(|l| l.leaf.id().to_owned())
            .collect()
    };
    assert_eq!(ids(4), vec!["a"]);
    assert_eq!(ids(7), vec!["a", "b"]);
    assert_eq!(ids(12), vec!["b"]);
    assert!(ids(25).is_empty());
    assert_eq!(at(&tl, 7).leaves_with_id("b").next().unwrap().local_frame(), 2);
}

#[test]
fn overrides_are_keyed_by_declared_path() {
    let tl = title_timeline();
    let mut store = InMemoryOverrides::new();
    store
        .insert("main/title@30", SequenceOverride::timing(0, FrameSpan::Finite(10)))
        .unwrap();

    let f = Evaluator::eval_frame(&tl, FrameClock::paused(FrameIndex(5)), &store).unwrap();
    let leaf = f.leaf("main/title@30/display:headline").unwrap();
    assert_eq!(leaf.local_frame(), 5);

    let f = Evaluator::eval_frame(&tl, FrameClock::paused(FrameIndex(50)), &store).unwrap();
    assert!(f.leaves.is_empty());
}

#[test]
fn layered_sequences_at_the_same_start_both_mount() {
    let layer = |id: &str| {
        SequenceBuilder::new()
            .child(display(id))
            .build()
            .unwrap()
    };
    let tl = builder()
        .child(layer("bg"))
        .child(layer("title"))
        .build()
        .unwrap()
        .timeline()
        .unwrap();

    let f = at(&tl, 0);
    let paths: Vec<&str> = f.leaves.iter().map(|l| l.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["main/sequence@0/display:bg", "main/sequence@0#1/display:title"]
    );

    // Both layers answer to the declared path.
    let mut store = InMemoryOverrides::new();
    store
        .insert("main/sequence@0", SequenceOverride::timing(20, FrameSpan::Infinite))
        .unwrap();
    let f = Evaluator::eval_frame(&tl, FrameClock::paused(FrameIndex(25)), &store).unwrap();
    let locals: Vec<i64> = f.leaves.iter().map(|l| l.local_frame()).collect();
    assert_eq!(locals, vec![5, 5]);
    assert!(
        Evaluator::eval_frame(&tl, FrameClock::paused(FrameIndex(10)), &store)
            .unwrap()
            .leaves
            .is_empty()
    );
}

#[test]
fn premounted_leaves_are_reported_hidden() {
    let tl = builder()
        .child(
            SequenceBuilder::new()
                .from(30)
                .premount_for(10)
                .child(display("next"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
        .timeline()
        .unwrap();
    assert!(at(&tl, 19).leaves.is_empty());
    let f = at(&tl, 20);
    assert_eq!(f.leaves.len(), 1);
    assert_eq!(f.visible().count(), 0);
    assert_eq!(f.leaves[0].local_frame(), 0);
    assert_eq!(at(&tl, 30).visible().count(), 1);
}

#[test]
fn parallel_range_matches_sequential() {
    let tl = title_timeline();
    let range = FrameRange::new(FrameIndex(0), FrameIndex(150)).unwrap();
    let seq = Evaluator::eval_range(&tl, range, &NoOverrides, false).unwrap();
    let par = Evaluator::eval_range(&tl, range, &NoOverrides, true).unwrap();
    assert_eq!(seq.len(), 150);
    let counts = |v: &[EvaluatedFrame]| v.iter().map(|f| f.leaves.len()).collect::<Vec<_>>();
    assert_eq!(counts(&seq), counts(&par));
    assert_eq!(counts(&seq).iter().sum::<usize>(), 60);
}

#[test]
fn mount_tracker_reports_enter_and_exit() {
    let tl = title_timeline();
    let mut tracker = MountTracker::new();
    assert!(tracker.update(&at(&tl, 10)).is_empty());

    let d = tracker.update(&at(&tl, 30));
    assert_eq!(d.entered, vec!["main/title@30/display:headline".to_owned()]);
    assert!(d.exited.is_empty());
    assert!(tracker.is_mounted("main/title@30/display:headline"));
    assert!(tracker.update(&at(&tl, 31)).is_empty());

    let d = tracker.update(&at(&tl, 90));
    assert_eq!(d.exited.len(), 1);
    assert!(tracker.is_empty());
}
