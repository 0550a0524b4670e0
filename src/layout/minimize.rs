use eframe::egui::Pos2;

use super::Canvas;
use crate::config::LayoutConfig;
use crate::geometry::{perpendicular, project_onto_line, segment_intersects_circle};

/// Nudges nodes off edges that pass through them. Returns the number of
/// rounds that found at least one intersection.
///
/// Relaxation only: dense graphs may keep some overlaps.
pub fn minimize_intersections(
    positions: &mut [Pos2],
    edges: &[(usize, usize)],
    canvas: Canvas,
    config: &LayoutConfig,
) -> usize {
    let n = positions.len();
    let radius = config.node_radius;
    let hit_radius = radius * config.collision_inflation;
    let push_distance = radius * 2.0;
    let mut busy_rounds = 0;

    for _ in 0..config.minimizer_rounds {
        let mut found = false;

        for &(from, to) in edges {
            if from >= n || to >= n || from == to {
                continue;
            }

            for node in 0..n {
                if node == from || node == to {
                    continue;
                }

                let start = positions[from];
                let end = positions[to];
                let center = positions[node];
                if !segment_intersects_circle(start, end, center, hit_radius) {
                    continue;
                }
                found = true;

                let projection = project_onto_line(center, start, end);
                let offset = center - projection;
                let distance = offset.length();
                if distance >= push_distance {
                    continue;
                }

                let normal = perpendicular(end - start).normalized();
                if !normal.x.is_finite() || !normal.y.is_finite() {
                    continue;
                }
                let side = if normal.dot(offset) < 0.0 { -1.0 } else { 1.0 };
                let nudged = center + normal * side * (push_distance - distance) * config.nudge_fraction;
                positions[node] = canvas.clamp(nudged, radius);
            }
        }

        if !found {
            break;
        }
        busy_rounds += 1;
    }

    busy_rounds
}
