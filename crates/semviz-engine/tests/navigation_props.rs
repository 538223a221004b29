//! Property tests for the zoom navigation stack.

use proptest::prelude::*;
use semviz_engine::NavigationStack;
use semviz_types::trace::TraceId;

const ROOT: TraceId = TraceId(0);

#[derive(Debug, Clone)]
enum Op {
    ZoomIn(u32),
    ZoomOut(u32),
    PreviewEnter(u32),
    PreviewExit,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u32..12).prop_map(Op::ZoomIn),
        2 => (0u32..12).prop_map(Op::ZoomOut),
        1 => (0u32..12).prop_map(Op::PreviewEnter),
        1 => Just(Op::PreviewExit),
        1 => Just(Op::Reset),
    ]
}

fn apply(nav: &mut NavigationStack, op: &Op) {
    match *op {
        Op::ZoomIn(n) => {
            nav.zoom_in(TraceId(n));
        }
        Op::ZoomOut(n) => {
            nav.zoom_out(TraceId(n));
        }
        Op::PreviewEnter(n) => nav.preview_enter(TraceId(n)),
        Op::PreviewExit => nav.preview_exit(),
        Op::Reset => nav.reset(),
    }
}

fn targets(nav: &NavigationStack) -> Vec<TraceId> {
    nav.frames().iter().map(|f| f.target).collect()
}

proptest! {
    #[test]
    fn frame_zero_is_always_the_root(ops in prop::collection::vec(op(), 0..40)) {
        let mut nav = NavigationStack::new(ROOT);
        for op in &ops {
            apply(&mut nav, op);
            prop_assert!(nav.depth() >= 1);
            prop_assert_eq!(nav.root(), ROOT);
        }
    }

    #[test]
    fn zoom_in_then_out_restores_frames(
        ops in prop::collection::vec(op(), 0..30),
        node in 1u32..12,
    ) {
        let mut nav = NavigationStack::new(ROOT);
        for op in &ops {
            apply(&mut nav, op);
        }
        let before = targets(&nav);
        if nav.zoom_in(TraceId(node)) {
            prop_assert!(nav.zoom_out(TraceId(node)));
        }
        prop_assert_eq!(targets(&nav), before);
    }

    #[test]
    fn reset_leaves_depth_one(ops in prop::collection::vec(op(), 0..40)) {
        let mut nav = NavigationStack::new(ROOT);
        for op in &ops {
            apply(&mut nav, op);
        }
        nav.reset();
        prop_assert_eq!(nav.depth(), 1);
        prop_assert_eq!(nav.focus(), ROOT);
        prop_assert!(nav.preview().is_none());
    }

    #[test]
    fn focus_is_preview_or_top(ops in prop::collection::vec(op(), 0..40)) {
        let mut nav = NavigationStack::new(ROOT);
        for op in &ops {
            apply(&mut nav, op);
            let expected = nav.preview().unwrap_or(nav.top().target);
            prop_assert_eq!(nav.focus(), expected);
        }
    }
}
