//! Zoom navigation: which trace subtree the next walk starts from.
//!
//! The stack always holds at least one frame, the whole match. Zooming in
//! pushes a frame; zooming out pops back past a frame. A preview pointer
//! temporarily overrides the focus without touching the frames.

use semviz_types::trace::TraceId;
use serde::Serialize;
use tracing::debug;

/// One committed zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub target: TraceId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStack {
    frames: Vec<Frame>,
    preview: Option<TraceId>,
}

impl NavigationStack {
    /// A stack focused on `root`, the top-level result.
    pub fn new(root: TraceId) -> Self {
        Self {
            frames: vec![Frame { target: root }],
            preview: None,
        }
    }

    pub fn root(&self) -> TraceId {
        self.frames[0].target
    }

    pub fn top(&self) -> Frame {
        self.frames[self.frames.len() - 1]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_zoomed(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn preview(&self) -> Option<TraceId> {
        self.preview
    }

    /// The node the next walk starts from.
    pub fn focus(&self) -> TraceId {
        self.preview.unwrap_or_else(|| self.top().target)
    }

    /// The committed zoom target, if zoomed.
    pub fn zoom_target(&self) -> Option<TraceId> {
        self.is_zoomed().then(|| self.top().target)
    }

    /// Push a frame for `node`. Returns `false` when `node` is already the
    /// focus or is the whole match.
    pub fn zoom_in(&mut self, node: TraceId) -> bool {
        if node == self.top().target || node == self.root() {
            return false;
        }
        self.frames.push(Frame { target: node });
        debug!(node = %node, depth = self.depth(), "zoom in");
        true
    }

    /// Pop frames down to and including the topmost one for `node`.
    /// Returns `false` when no zoomed frame targets `node`.
    pub fn zoom_out(&mut self, node: TraceId) -> bool {
        let Some(at) = self.frames.iter().rposition(|f| f.target == node) else {
            return false;
        };
        if at == 0 {
            return false;
        }
        self.frames.truncate(at);
        debug!(node = %node, depth = self.depth(), "zoom out");
        true
    }

    pub fn preview_enter(&mut self, node: TraceId) {
        self.preview = Some(node);
    }

    pub fn preview_exit(&mut self) {
        self.preview = None;
    }

    /// Back to the whole match with no preview.
    pub fn reset(&mut self) {
        self.frames.truncate(1);
        self.preview = None;
        debug!("zoom reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> TraceId {
        TraceId(n)
    }

    #[test]
    fn test_zoom_in_noops() {
        let mut nav = NavigationStack::new(id(9));
        assert!(!nav.zoom_in(id(9)));
        assert!(nav.zoom_in(id(3)));
        assert!(!nav.zoom_in(id(3)));
        assert_eq!(nav.depth(), 2);
        assert_eq!(nav.focus(), id(3));
        assert_eq!(nav.zoom_target(), Some(id(3)));
    }

    #[test]
    fn test_zoom_out_pops_through_node() {
        let mut nav = NavigationStack::new(id(9));
        nav.zoom_in(id(5));
        nav.zoom_in(id(3));
        nav.zoom_in(id(1));
        assert!(nav.zoom_out(id(3)));
        assert_eq!(nav.frames(), &[Frame { target: id(9) }, Frame { target: id(5) }]);
        assert!(!nav.zoom_out(id(1)));
        assert!(!nav.zoom_out(id(9)));
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn test_preview_overrides_focus_only() {
        let mut nav = NavigationStack::new(id(9));
        nav.zoom_in(id(4));
        nav.preview_enter(id(9));
        assert_eq!(nav.focus(), id(9));
        assert_eq!(nav.zoom_target(), Some(id(4)));
        nav.preview_exit();
        assert_eq!(nav.focus(), id(4));
    }

    #[test]
    fn test_reset() {
        let mut nav = NavigationStack::new(id(9));
        nav.zoom_in(id(4));
        nav.preview_enter(id(2));
        nav.reset();
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.focus(), id(9));
        assert!(nav.preview().is_none());
    }
}
