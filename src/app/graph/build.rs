use tracing::info;

use crate::layout::{Canvas, layout_snapshot};

use super::super::{LayoutCache, ViewModel};

impl ViewModel {
    /// Recomputes positions only when the node/edge structure or the canvas
    /// size changed; driver and task deltas reuse the cached layout.
    pub(in crate::app) fn ensure_layout(&mut self, canvas: Canvas) {
        let Some(snapshot) = self.sync.snapshot() else {
            return;
        };

        let topology = snapshot.topology();
        if let Some(cache) = &self.layout
            && cache.graph.canvas == canvas
            && cache.topology == topology
        {
            return;
        }

        let graph = layout_snapshot(snapshot, canvas, &self.config.layout);
        info!(
            strategy = graph.strategy.label(),
            nodes = graph.nodes.len(),
            width = canvas.width,
            height = canvas.height,
            "layout rebuilt"
        );

        self.layout = Some(LayoutCache { topology, graph });
        self.layout_revision = self.layout_revision.wrapping_add(1);
        self.search_match_cache = None;
    }
}
