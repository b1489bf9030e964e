// ABOUTME: Property tests for the handle registry.
// ABOUTME: Checks handle monotonicity and kind/order guarantees of "most recent" queries.

use lookat_core::{ObjectKind, Payload, Registry};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Tree,
    Histogram,
    Allocate,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Tree), Just(Op::Histogram), Just(Op::Allocate)]
}

fn build(ops: &[Op]) -> (Registry<usize, usize>, Vec<lookat_core::Handle>) {
    let mut reg = Registry::new();
    let mut handles = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        let handle = match op {
            Op::Tree => reg.register(format!("t{i}"), "tree", Payload::Tree(i)),
            Op::Histogram => reg.register(format!("h{i}"), "expr", Payload::Histogram(i)),
            Op::Allocate => reg.allocate(),
        };
        handles.push(handle);
    }
    (reg, handles)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn handles_strictly_increase(ops in prop::collection::vec(op(), 0..60)) {
        let (_, handles) = build(&ops);
        for pair in handles.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn most_recent_is_ordered_and_single_kind(
        ops in prop::collection::vec(op(), 0..60),
        n in 0usize..10,
    ) {
        let (reg, _) = build(&ops);
        for kind in [ObjectKind::Tree, ObjectKind::Histogram] {
            let window = reg.most_recent(kind, n);
            prop_assert_eq!(window.len(), n.min(reg.count(kind)));
            prop_assert!(window.iter().all(|o| o.kind() == kind));
            for pair in window.windows(2) {
                prop_assert!(pair[0].created_at_index() < pair[1].created_at_index());
                prop_assert!(pair[0].handle() < pair[1].handle());
            }
            // The window is the tail of that kind's history
            let all: Vec<_> = reg.of_kind(kind).map(|o| o.handle()).collect();
            let tail: Vec<_> = window.iter().map(|o| o.handle()).collect();
            prop_assert!(all.ends_with(&tail));
        }
    }

    #[test]
    fn every_registered_handle_resolves(ops in prop::collection::vec(op(), 0..60)) {
        let (reg, _) = build(&ops);
        for object in reg.iter() {
            prop_assert_eq!(reg.resolve(object.handle()).unwrap().handle(), object.handle());
        }
    }
}
