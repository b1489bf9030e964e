// ABOUTME: Property tests for pad re-flow.
// ABOUTME: Pads never move to an earlier row-major index and the grid always fits them.

use lookat_core::{GridFlow, Handle};
use lookat_layout::{GridShape, LayoutManager};
use proptest::prelude::*;

fn flow() -> impl Strategy<Value = GridFlow> {
    prop_oneof![Just(GridFlow::Square), Just(GridFlow::Row), Just(GridFlow::Column)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn grid_fits_all_pads(k in 1usize..200, flow in flow()) {
        let grid = GridShape::for_pads(k, flow);
        prop_assert!(grid.cells() >= k);
        // No empty trailing row
        prop_assert!((grid.rows - 1) * grid.columns < k);
    }

    #[test]
    fn pads_keep_their_index(draws in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut layout = LayoutManager::new(GridFlow::Square);
        let mut next = 0u64;
        let mut placed = Vec::new();

        for on_current in draws {
            let pad = layout.new_pad(on_current, || {
                next += 1;
                Handle(next)
            });
            next += 1;
            layout.draw_into(pad, Handle(next)).unwrap();
            placed.push((pad, Handle(next)));

            for (pad, object) in &placed {
                let canvas = layout.canvas(pad.canvas).unwrap();
                prop_assert_eq!(canvas.pad(pad.index).unwrap().contents(), Some(*object));
                prop_assert!(canvas.position(pad.index).is_some());
            }
        }
    }
}
