use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};

use crate::interpolate::interpolate_drivers;
use crate::layout::{Canvas, footprint_radius};
use crate::sim::NodeRole;

use super::super::highlight::{build_highlight_state, search_matches};
use super::super::render_utils::{
    blend_color, dim_color, draw_background, driver_color, edge_visible, role_color,
    world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel};

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.layout_revision == self.layout_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let cache = self.layout.as_ref()?;
        let matches = Arc::new(search_matches(&cache.graph, query));
        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            layout_revision: self.layout_revision,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        self.ensure_layout(Canvas::new(rect.width().round(), rect.height().round()));
        let pseudo_matches = self.cached_search_matches();

        let (Some(cache), Some(snapshot)) = (self.layout.as_ref(), self.sync.snapshot()) else {
            return;
        };
        let graph = &cache.graph;
        if graph.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "The simulation has no nodes yet.",
                FontId::proportional(15.0),
                Color32::from_gray(200),
            );
            return;
        }

        let highlight = build_highlight_state(
            graph,
            snapshot,
            self.selected_task.as_deref(),
            self.flashes.keys(),
        );

        let pan = self.pan;
        let zoom = self.zoom;
        let zoom_sqrt = zoom.sqrt();
        let screen_positions = graph
            .nodes
            .iter()
            .map(|node| world_to_screen(rect, pan, zoom, node.center))
            .collect::<Vec<_>>();
        let screen_radii = graph
            .nodes
            .iter()
            .map(|node| (node.radius * zoom_sqrt).clamp(4.0, 48.0))
            .collect::<Vec<_>>();

        let hovered = Self::hovered_index(ui, &screen_positions, &screen_radii);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pseudo_active = pseudo_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let dim_others = highlight.is_active() || pseudo_active;

        for edge in &graph.edges {
            let (Some(&start), Some(&end)) = (
                screen_positions.get(edge.source),
                screen_positions.get(edge.target),
            ) else {
                continue;
            };
            if !edge_visible(rect, start, end, 4.0) {
                continue;
            }

            let on_route =
                highlight.route.contains(&edge.source) && highlight.route.contains(&edge.target);
            let stroke = if on_route {
                Stroke::new((2.6 * zoom_sqrt).clamp(1.4, 4.6), Color32::from_rgb(241, 146, 94))
            } else if dim_others {
                Stroke::new(
                    (0.9 * zoom_sqrt).clamp(0.5, 2.0),
                    Color32::from_rgba_unmultiplied(80, 90, 104, 140),
                )
            } else {
                Stroke::new(
                    (1.4 * zoom_sqrt).clamp(0.7, 3.2),
                    Color32::from_rgba_unmultiplied(120, 126, 134, 200),
                )
            };
            painter.line_segment([start, end], stroke);

            if edge.show_weight
                && let Some(weight) = edge.weight
            {
                painter.text(
                    start + (end - start) * 0.5,
                    Align2::CENTER_BOTTOM,
                    format!("{weight:.1}"),
                    FontId::proportional(11.0),
                    Color32::from_gray(200),
                );
            }
        }

        let pulse = ((ui.input(|input| input.time) * 6.0).sin() * 0.5 + 0.5) as f32;
        let selected_color = Color32::from_rgb(245, 206, 93);

        for (index, node) in graph.nodes.iter().enumerate() {
            let position = screen_positions[index];
            let radius = screen_radii[index];

            let is_hovered = hovered == Some(index);
            let is_anchor = highlight.anchor == Some(index);
            let on_route = highlight.route.contains(&index);
            let is_pseudo_match = pseudo_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let base_color = role_color(node.role);
            let color = if is_anchor {
                blend_color(base_color, selected_color, 0.8)
            } else if is_hovered {
                Color32::from_rgb(255, 164, 101)
            } else if on_route {
                blend_color(base_color, Color32::from_rgb(246, 137, 92), 0.6)
            } else if is_pseudo_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
            } else if dim_others {
                dim_color(base_color, 0.45)
            } else {
                base_color
            };

            if highlight.flashing.contains(&index) {
                painter.circle_filled(
                    position,
                    radius + 6.0 + pulse * 6.0,
                    Color32::from_rgba_unmultiplied(250, 226, 120, (60.0 + pulse * 110.0) as u8),
                );
            }

            painter.circle_filled(position, radius, color);
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(
                    if is_anchor || is_pseudo_match { 2.0 } else { 1.0 },
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                ),
            );

            if is_anchor || is_hovered || is_pseudo_match || zoom > 0.6 {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    &node.label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        let driver_radius =
            (footprint_radius(NodeRole::Driver, self.config.layout.node_radius) * zoom_sqrt).clamp(3.0, 24.0);
        for marker in interpolate_drivers(&snapshot.drivers, graph) {
            let position = world_to_screen(rect, pan, zoom, marker.position);
            let is_selected = self.selected_driver.as_deref() == Some(marker.id.as_str());

            painter.circle_filled(position, driver_radius, driver_color(marker.moving));
            painter.circle_stroke(
                position,
                driver_radius,
                if is_selected {
                    Stroke::new(2.4, selected_color)
                } else {
                    Stroke::new(1.0, Color32::from_gray(20))
                },
            );
            painter.text(
                position,
                Align2::CENTER_CENTER,
                &marker.id,
                FontId::monospace(10.0),
                Color32::from_gray(16),
            );
        }

        if let Some(index) = hovered
            && let Some(node) = graph.nodes.get(index)
        {
            let mut panel_text = format!("{}  |  {}  |  id {}", node.label, node.role.label(), node.id);
            if let Some(probability) = snapshot.node(&node.id).and_then(|node| node.order_probability()) {
                panel_text.push_str(&format!("  |  order p {probability:.2}"));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if !highlight.flashing.is_empty() || response.dragged() {
            ui.ctx().request_repaint();
        }
    }

    pub(in crate::app) fn node_count_text(&self) -> Option<String> {
        let cache = self.layout.as_ref()?;
        Some(format!(
            "{} nodes  |  {} edges  |  {}",
            cache.graph.nodes.len(),
            cache.graph.edges.len(),
            cache.graph.strategy.label()
        ))
    }
}
