use super::*;

fn layer(d: u64, n: FrameSpan) -> LoopLayer {
    rated(d, n, 1.0)
}

fn rated(d: u64, n: FrameSpan, playback_rate: f64) -> LoopLayer {
    LoopLayer {
        duration_in_frames: d,
        iterations: n,
        playback_rate,
    }
}

#[test]
fn no_loops_yields_base_only() {
    assert_eq!(loop_offsets(12, &[], FrameSpan::Finite(100)).unwrap(), vec![12]);
    assert!(loop_offsets(100, &[], FrameSpan::Finite(100)).unwrap().is_empty());
}

#[test]
fn single_loop_is_cut_at_composition_end() {
    let l = [layer(10, FrameSpan::Finite(3))];
    assert_eq!(
        loop_offsets(0, &l, FrameSpan::Finite(25)).unwrap(),
        vec![0, 10, 20]
    );
    assert_eq!(loop_offsets(0, &l, FrameSpan::Finite(20)).unwrap(), vec![0, 10]);
    assert_eq!(loop_offsets(0, &l, FrameSpan::Finite(21)).unwrap(), vec![0, 10, 20]);
    assert_eq!(loop_offsets(5, &l, FrameSpan::Finite(25)).unwrap(), vec![5, 15]);
}

#[test]
fn nested_loops_take_the_product() {
    let l = [layer(20, FrameSpan::Finite(2)), layer(5, FrameSpan::Finite(2))];
    assert_eq!(
        loop_offsets(0, &l, FrameSpan::Finite(100)).unwrap(),
        vec![0, 5, 20, 25]
    );
}

#[test]
fn overlapping_products_are_deduplicated() {
    let l = [layer(10, FrameSpan::Finite(2)), layer(5, FrameSpan::Finite(3))];
    assert_eq!(
        loop_offsets(0, &l, FrameSpan::Finite(100)).unwrap(),
        vec![0, 5, 10, 15, 20]
    );
}

#[test]
fn infinite_layer_is_bounded_by_finite_composition() {
    let l = [layer(30, FrameSpan::Infinite)];
    assert_eq!(
        loop_offsets(0, &l, FrameSpan::Finite(100)).unwrap(),
        vec![0, 30, 60, 90]
    );
    assert_eq!(loop_offsets(0, &l, FrameSpan::Finite(90)).unwrap(), vec![0, 30, 60]);
}

#[test]
fn infinite_layer_in_infinite_composition_is_rejected() {
    let l = [layer(30, FrameSpan::Infinite)];
    assert!(loop_offsets(0, &l, FrameSpan::Infinite).is_err());

    let finite = [layer(30, FrameSpan::Finite(2))];
    assert_eq!(loop_offsets(0, &finite, FrameSpan::Infinite).unwrap(), vec![0, 30]);
}

#[test]
fn periods_are_measured_in_composition_frames() {
    let doubled = [rated(10, FrameSpan::Finite(8), 2.0)];
    assert_eq!(
        loop_offsets(0, &doubled, FrameSpan::Finite(40)).unwrap(),
        vec![0, 5, 10, 15, 20, 25, 30, 35]
    );

    let slowed = [rated(10, FrameSpan::Infinite, 0.5)];
    assert_eq!(
        loop_offsets(3, &slowed, FrameSpan::Finite(50)).unwrap(),
        vec![3, 23, 43]
    );

    let thirds = [rated(10, FrameSpan::Finite(3), 3.0)];
    assert_eq!(
        loop_offsets(0, &thirds, FrameSpan::Finite(30)).unwrap(),
        vec![0, 3, 7]
    );
}

#[test]
fn non_positive_layer_rate_is_rejected() {
    let stalled = [rated(10, FrameSpan::Finite(2), 0.0)];
    assert!(loop_offsets(0, &stalled, FrameSpan::Finite(40)).is_err());
}
