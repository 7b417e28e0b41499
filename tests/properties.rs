//! Property tests for the dataflow invariants that must hold for any input:
//! output equivalence with a reference flattening, cursor monotonicity, and
//! drain idempotence.

use proptest::collection::vec;
use proptest::prelude::*;

use rillflow::{Emit, Scheduler, Stream, map_element};

fn block_on<F: std::future::Future<Output = ()>>(fut: F) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(fut);
}

/// The policy used across these properties: the emit arity is determined by
/// the value itself, so a closure and a plain function can mirror each other.
fn classify(v: i64) -> Emit<i64> {
    // Wrapping arithmetic: generated inputs include the i64 extremes, and
    // the policy must stay total over them.
    match v.rem_euclid(3) {
        0 => Emit::suppress(),
        1 => Emit::one(v.wrapping_mul(2)),
        _ => Emit::many([v, v.wrapping_neg()]),
    }
}

fn classify_reference(values: &[i64]) -> Vec<i64> {
    values
        .iter()
        .flat_map(|&v| classify(v).into_values())
        .collect()
}

#[test]
fn extreme_values_flow_through_the_policy() {
    let input = [i64::MIN, i64::MIN + 1, -1, 0, 1, i64::MAX - 1, i64::MAX];
    block_on(async move {
        let sched = Scheduler::new();
        let x: Stream<i64> = Stream::new("x");
        let y: Stream<i64> = Stream::new("y");
        map_element(&sched, classify, &x, &y);

        x.extend(input);
        sched.run().await.expect("drain");
        assert_eq!(y.recent_values(), classify_reference(&input));
    });
}

proptest! {
    /// Draining an element-map agent produces exactly the reference
    /// flattening of the emit policy, regardless of input values.
    #[test]
    fn output_equals_reference_flattening(input in vec(any::<i64>(), 0..200)) {
        block_on(async move {
            let sched = Scheduler::new();
            let x: Stream<i64> = Stream::new("x");
            let y: Stream<i64> = Stream::new("y");
            map_element(&sched, classify, &x, &y);

            let expected = classify_reference(&input);
            x.extend(input);
            sched.run().await.expect("drain");
            assert_eq!(y.recent_values(), expected);
        });
    }

    /// However the input is chopped into batches, with a drain after each
    /// batch, the final output is the same as one big batch - and the cursor
    /// never moves backward or past the end of the input.
    #[test]
    fn batched_drains_match_a_single_drain(
        input in vec(any::<i64>(), 0..120),
        cuts in vec(0usize..120, 0..6),
    ) {
        block_on(async move {
            let sched = Scheduler::new();
            let x: Stream<i64> = Stream::new("x");
            let y: Stream<i64> = Stream::new("y");
            let handle = map_element(&sched, classify, &x, &y);

            let expected = classify_reference(&input);

            let mut bounds: Vec<usize> = cuts.into_iter().map(|c| c % (input.len() + 1)).collect();
            bounds.push(input.len());
            bounds.sort_unstable();

            let mut last_cursor = 0;
            let mut start = 0;
            for end in bounds {
                x.extend(input[start..end].to_vec());
                start = end;
                sched.run().await.expect("drain");

                let cursor = handle.cursors()[0].position;
                assert!(cursor >= last_cursor, "cursor moved backward");
                assert!(cursor <= x.len(), "cursor past end of stream");
                last_cursor = cursor;
            }

            assert_eq!(y.recent_values(), expected);
            assert_eq!(last_cursor, input.len());
        });
    }

    /// A drain with no new input is a no-op: zero invocations, no output.
    #[test]
    fn redundant_drains_change_nothing(input in vec(any::<i64>(), 0..100)) {
        block_on(async move {
            let sched = Scheduler::new();
            let x: Stream<i64> = Stream::new("x");
            let y: Stream<i64> = Stream::new("y");
            map_element(&sched, classify, &x, &y);

            x.extend(input);
            sched.run().await.expect("drain");
            let settled = y.recent_values();

            let again = sched.run().await.expect("drain");
            assert!(again.is_noop());
            assert_eq!(y.recent_values(), settled);
        });
    }
}
