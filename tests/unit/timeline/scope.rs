use super::*;
use crate::foundation::core::{Canvas, Fps};

fn descriptor(duration: FrameSpan) -> CompositionDescriptor {
    CompositionDescriptor {
        id: "main".to_owned(),
        canvas: Canvas {
            width: 320,
            height: 180,
        },
        fps: Fps::new(30, 1).unwrap(),
        duration_in_frames: duration,
        default_props: serde_json::Map::new(),
    }
}

fn root_at(frame: i64) -> ScopeEnv {
    ScopeEnv::root(
        &descriptor(FrameSpan::Finite(150)),
        FrameClock {
            frame,
            playing: true,
        },
    )
}

fn seq(from: i64, duration: FrameSpan) -> ResolvedSequence {
    ResolvedSequence {
        id: None,
        from,
        duration_in_frames: duration,
        playback_rate: 1.0,
        track_index: 0,
        premount_for: 0,
        placement: Affine::IDENTITY,
    }
}

#[test]
fn sequence_window_is_half_open() {
    let s = seq(30, FrameSpan::Finite(60));
    assert!(root_at(10).enter_sequence(&s, "sequence@30").is_none());
    assert!(root_at(29).enter_sequence(&s, "sequence@30").is_none());
    assert!(root_at(30).enter_sequence(&s, "sequence@30").is_some());
    assert!(root_at(89).enter_sequence(&s, "sequence@30").is_some());
    assert!(root_at(90).enter_sequence(&s, "sequence@30").is_none());
    assert!(root_at(100).enter_sequence(&s, "sequence@30").is_none());

    let env = root_at(50).enter_sequence(&s, "sequence@30").unwrap();
    assert_eq!(env.local_frame(), 20);
    assert_eq!(env.clock.frame, 50);
    assert!(env.clock.playing);
    assert_eq!(env.scope.name_path, "main/sequence@30");
    assert_eq!(env.scope.from, 30);
    assert_eq!(env.scope.parent_offset, 0);
    assert_eq!(env.scope.local_offset, 30);
}

#[test]
fn nested_sequences_accumulate_offsets() {
    let outer = root_at(55)
        .enter_sequence(&seq(10, FrameSpan::Infinite), "sequence@10")
        .unwrap();
    let inner = outer
        .enter_sequence(&seq(20, FrameSpan::Infinite), "sequence@20")
        .unwrap();
    assert_eq!(inner.scope.accumulated_offset, 30);
    assert_eq!(inner.scope.parent_offset, 10);
    assert_eq!(inner.local_frame(), 25);
    assert_eq!(inner.scope.name_path, "main/sequence@10/sequence@20");
}

#[test]
fn negative_from_starts_mid_content() {
    let env = root_at(0)
        .enter_sequence(&seq(-10, FrameSpan::Finite(40)), "sequence@-10")
        .unwrap();
    assert_eq!(env.local_frame(), 10);
}

#[test]
fn playback_rates_multiply() {
    let mut a = seq(0, FrameSpan::Infinite);
    a.playback_rate = 2.0;
    let mut b = seq(0, FrameSpan::Infinite);
    b.playback_rate = 3.0;
    let env = root_at(5)
        .enter_sequence(&a, "a@0")
        .unwrap()
        .enter_sequence(&b, "b@0")
        .unwrap();
    assert_eq!(env.scope.accumulated_playback_rate, 6.0);
    assert_eq!(env.local_frame(), 30);
}

#[test]
fn rescaled_clock_floors_fractional_frames() {
    let mut s = seq(10, FrameSpan::Finite(20));
    s.playback_rate = 0.5;
    let env = root_at(13).enter_sequence(&s, "sequence@10").unwrap();
    assert_eq!(env.clock.frame, 11);
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Finite(10));

    s.playback_rate = 2.0;
    let env = root_at(15).enter_sequence(&s, "sequence@10").unwrap();
    assert_eq!(env.local_frame(), 10);
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Finite(40));
}

#[test]
fn published_duration_is_clipped_to_parent() {
    let env = root_at(120)
        .enter_sequence(&seq(100, FrameSpan::Finite(100)), "sequence@100")
        .unwrap();
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Finite(50));

    let env = root_at(120)
        .enter_sequence(&seq(100, FrameSpan::Infinite), "sequence@100")
        .unwrap();
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Finite(50));

    let unbounded = ScopeEnv::root(&descriptor(FrameSpan::Infinite), FrameClock::default());
    let env = unbounded
        .enter_sequence(&seq(0, FrameSpan::Infinite), "sequence@0")
        .unwrap();
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Infinite);
}

#[test]
fn premount_window_freezes_children_at_local_zero() {
    let mut s = seq(30, FrameSpan::Finite(60));
    s.premount_for = 5;
    assert_eq!(
        sequence_state(30, s.duration_in_frames, 5, 24),
        SequenceState::NotYetVisible
    );
    assert!(root_at(24).enter_sequence(&s, "sequence@30").is_none());

    let env = root_at(25).enter_sequence(&s, "sequence@30").unwrap();
    assert!(env.premounted);
    assert!(!env.clock.playing);
    assert_eq!(env.local_frame(), 0);

    let nested = env
        .enter_sequence(&seq(0, FrameSpan::Infinite), "sequence@0")
        .unwrap();
    assert!(nested.premounted);

    let env = root_at(30).enter_sequence(&s, "sequence@30").unwrap();
    assert!(!env.premounted);
    assert!(env.clock.playing);
}

#[test]
fn loop_wraps_local_frame_and_tracks_iteration() {
    let root = root_at(25);
    let env = root.enter_loop(10, FrameSpan::Finite(3), "loop:10x3").unwrap();
    assert_eq!(env.local_frame(), 5);
    assert_eq!(env.loop_iteration, Some(2));
    assert_eq!(env.scope.duration_in_frames, FrameSpan::Finite(10));
    assert_eq!(
        env.scope.loop_stack.as_slice(),
        &[LoopLayer {
            duration_in_frames: 10,
            iterations: FrameSpan::Finite(3),
            playback_rate: 1.0,
        }]
    );

    assert!(root_at(30).enter_loop(10, FrameSpan::Finite(3), "l").is_none());
    assert!(root_at(30).enter_loop(10, FrameSpan::Infinite, "l").is_some());
}

#[test]
fn infinite_loop_iterations_follow_parent_duration() {
    let env = root_at(0).enter_loop(10, FrameSpan::Infinite, "l").unwrap();
    assert_eq!(env.scope.loop_stack[0].iterations, FrameSpan::Finite(15));

    let env = root_at(0).enter_loop(40, FrameSpan::Infinite, "l").unwrap();
    assert_eq!(env.scope.loop_stack[0].iterations, FrameSpan::Finite(4));

    let unbounded = ScopeEnv::root(&descriptor(FrameSpan::Infinite), FrameClock::default());
    let env = unbounded.enter_loop(10, FrameSpan::Infinite, "l").unwrap();
    assert_eq!(env.scope.loop_stack[0].iterations, FrameSpan::Infinite);
}

#[test]
fn loop_inside_sequence_is_relative_to_sequence_start() {
    let env = root_at(37)
        .enter_sequence(&seq(20, FrameSpan::Infinite), "sequence@20")
        .unwrap()
        .enter_loop(10, FrameSpan::Infinite, "loop:10xinfinite")
        .unwrap();
    assert_eq!(env.clock.frame, 27);
    assert_eq!(env.local_frame(), 7);
    assert_eq!(env.loop_iteration, Some(1));
    assert!(
        root_at(15)
            .enter_sequence(&seq(20, FrameSpan::Infinite), "s")
            .is_none()
    );
}

#[test]
fn sped_up_scopes_report_composition_placement() {
    let fast = ResolvedSequence {
        playback_rate: 2.0,
        ..seq(0, FrameSpan::Infinite)
    };
    let outer = root_at(12).enter_sequence(&fast, "sequence@0").unwrap();
    assert_eq!(outer.clock.frame, 24);
    assert_eq!(outer.scope.duration_in_frames, FrameSpan::Finite(300));
    assert_eq!(outer.scope.composition_duration, FrameSpan::Finite(150));

    // Twenty fast frames in is ten composition frames in.
    let inner = outer
        .enter_sequence(&seq(20, FrameSpan::Infinite), "sequence@20")
        .unwrap();
    assert_eq!(inner.scope.accumulated_offset, 20);
    assert_eq!(inner.scope.composition_offset, 10.0);
    assert_eq!(inner.scope.composition_duration, FrameSpan::Finite(140));

    let lp = outer.enter_loop(10, FrameSpan::Infinite, "loop:10xinfinite").unwrap();
    assert_eq!(lp.scope.composition_duration, FrameSpan::Finite(5));
    assert_eq!(lp.scope.loop_stack[0].playback_rate, 2.0);
    assert_eq!(lp.scope.loop_stack[0].iterations, FrameSpan::Finite(30));
}

#[test]
fn freeze_pins_local_frame() {
    let env = root_at(100).enter_freeze(12, true, "freeze@12");
    assert_eq!(env.clock.frame, 12);
    assert!(env.clock.playing);
    assert_eq!(env.scope.name_path, "main/freeze@12");

    let env = root_at(50)
        .enter_sequence(&seq(30, FrameSpan::Infinite), "sequence@30")
        .unwrap()
        .enter_freeze(12, true, "freeze@12");
    assert_eq!(env.local_frame(), 12);
    assert_eq!(env.clock.frame, 42);

    let env = root_at(50).enter_freeze(12, false, "freeze@12");
    assert_eq!(env.clock.frame, 50);
}
