//! Element-map contract: sentinel interpretation, incremental drains,
//! stateful transforms, and failure replay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rillflow::{
    Emit, RunError, Scheduler, Stream, map_element, map_element_with_state, try_map_element,
};

#[tokio::test]
async fn suppress_drops_elements_without_placeholders() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<i64> = Stream::new("y");
    map_element(
        &sched,
        |v| if v % 2 == 0 { Emit::suppress() } else { Emit::one(v) },
        &x,
        &y,
    );

    x.extend(0..10);
    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![1, 3, 5, 7, 9]);
}

#[tokio::test]
async fn fan_out_appends_each_value_in_order() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<i64> = Stream::new("y");
    map_element(&sched, |v| Emit::many([v, v + 100]), &x, &y);

    x.extend(0..3);
    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![0, 100, 1, 101, 2, 102]);
}

#[tokio::test]
async fn a_vec_is_a_single_value_unless_fanned_out() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let w: Stream<Vec<i64>> = Stream::new("w");
    // Same shape as the fan-out above, but wrapped with `one`: the Vec
    // lands as one structured element, not two scalars.
    map_element(&sched, |v| Emit::one(vec![v, v + 100]), &x, &w);

    x.extend(0..3);
    sched.run().await.expect("drain");
    assert_eq!(
        w.recent_values(),
        vec![vec![0, 100], vec![1, 101], vec![2, 102]]
    );
}

#[tokio::test]
async fn none_is_a_value_not_a_sentinel() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<Option<i64>> = Stream::new("y");
    map_element(
        &sched,
        |v| Emit::one(if v % 2 == 0 { Some(v) } else { None }),
        &x,
        &y,
    );

    x.extend(0..4);
    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![Some(0), None, Some(2), None]);
}

#[tokio::test]
async fn incremental_appends_extend_the_output() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<i64> = Stream::new("y");
    map_element(&sched, |v| Emit::one(v * 10), &x, &y);

    x.extend(0..3);
    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![0, 10, 20]);

    x.extend(3..5);
    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![0, 10, 20, 30, 40]);
}

#[tokio::test]
async fn values_present_before_wiring_are_processed() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    x.extend(0..3);

    let y: Stream<i64> = Stream::new("y");
    map_element(&sched, Emit::one, &x, &y);

    sched.run().await.expect("drain");
    assert_eq!(y.recent_values(), vec![0, 1, 2]);
}

#[tokio::test]
async fn state_threads_through_successive_elements_and_drains() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let sums: Stream<i64> = Stream::new("sums");
    map_element_with_state(
        &sched,
        |total: &mut i64, v| {
            *total += v;
            Emit::one(*total)
        },
        0i64,
        &x,
        &sums,
    );

    x.extend([1, 2, 3]);
    sched.run().await.expect("drain");
    assert_eq!(sums.recent_values(), vec![1, 3, 6]);

    // State survives between drains.
    x.extend([4, 5]);
    sched.run().await.expect("drain");
    assert_eq!(sums.recent_values(), vec![1, 3, 6, 10, 15]);
}

#[derive(Debug, thiserror::Error)]
#[error("refusing element {0}")]
struct Rejected(i64);

#[tokio::test]
async fn failure_stops_before_the_element_and_replays_it() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("x");
    let y: Stream<i64> = Stream::new("y");

    let healed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&healed);
    let handle = try_map_element(
        &sched,
        move |v| {
            if v == 3 && !flag.load(Ordering::SeqCst) {
                Err(Rejected(v))
            } else {
                Ok(Emit::one(v * 10))
            }
        },
        &x,
        &y,
    );

    x.extend(0..6);
    let err = sched.run().await.expect_err("element 3 must fail");
    match err {
        RunError::Agent { agent, .. } => assert_eq!(agent, handle.name()),
        other => panic!("expected RunError::Agent, got: {other:?}"),
    }

    // Output from elements before the failure stands; the cursor stopped
    // exactly before the failing element and the agent is still pending.
    assert_eq!(y.recent_values(), vec![0, 10, 20]);
    assert_eq!(handle.cursors()[0].position, 3);
    assert_eq!(sched.pending_len(), 1);

    // Fix the cause and drain again: element 3 is replayed, not skipped.
    healed.store(true, Ordering::SeqCst);
    sched.run().await.expect("replay succeeds");
    assert_eq!(y.recent_values(), vec![0, 10, 20, 30, 40, 50]);
    assert_eq!(handle.cursors()[0].position, 6);
    assert!(sched.is_idle());
}

#[tokio::test]
async fn transform_error_reports_stream_and_index() {
    let sched = Scheduler::new();
    let x: Stream<i64> = Stream::new("readings");
    let y: Stream<i64> = Stream::new("y");
    try_map_element(
        &sched,
        |v| if v < 0 { Err(Rejected(v)) } else { Ok(Emit::one(v)) },
        &x,
        &y,
    );

    x.extend([5, 6, -1, 7]);
    let err = sched.run().await.expect_err("negative reading fails");
    let RunError::Agent { source, .. } = err else {
        panic!("expected RunError::Agent");
    };
    let rillflow::AgentError::Transform { stream, index, .. } = source;
    assert_eq!(stream, "readings");
    assert_eq!(index, 2);
}
