use eframe::egui::{Pos2, pos2};

use super::{Canvas, circle_position};
use crate::config::LayoutConfig;
use crate::sim::Node;

/// Maps positions given in the reference frame onto `canvas`, spreading
/// them by the spacing factor around the canvas center. Nodes without a
/// position take their circle slot.
pub fn scale_supplied(nodes: &[Node], canvas: Canvas, config: &LayoutConfig) -> Vec<Pos2> {
    let count = nodes.len();
    let spacing = config.spacing_factor;
    let scale_x = canvas.width / config.reference_width.max(1.0) * spacing;
    let scale_y = canvas.height / config.reference_height.max(1.0) * spacing;
    let offset_x = (canvas.width - canvas.width * spacing) / 2.0;
    let offset_y = (canvas.height - canvas.height * spacing) / 2.0;

    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| match node.supplied_position() {
            Some(supplied) => canvas.clamp(
                pos2(
                    supplied.x * scale_x + offset_x,
                    supplied.y * scale_y + offset_y,
                ),
                config.node_radius,
            ),
            None => {
                let slot = node.id.trim().parse::<usize>().unwrap_or(index);
                canvas.clamp(circle_position(slot, count, canvas), config.node_radius)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Attributes, NodeRole};

    fn node(id: &str, position: Option<(f32, f32)>) -> Node {
        Node {
            id: id.to_owned(),
            role: NodeRole::Location,
            x: position.map(|(x, _)| x),
            y: position.map(|(_, y)| y),
            label: None,
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn reference_center_maps_to_canvas_center() {
        let config = LayoutConfig::default();
        let canvas = Canvas::new(1600.0, 1200.0);
        let nodes = [node("0", Some((400.0, 300.0)))];
        let scaled = scale_supplied(&nodes, canvas, &config);
        assert!((scaled[0].x - 800.0).abs() < 1e-3);
        assert!((scaled[0].y - 600.0).abs() < 1e-3);
    }

    #[test]
    fn spacing_spreads_points_and_clamps_to_canvas() {
        let config = LayoutConfig::default();
        let canvas = Canvas::new(800.0, 600.0);
        let nodes = [
            node("a", Some((300.0, 300.0))),
            node("b", Some((500.0, 300.0))),
            node("c", Some((0.0, 0.0))),
        ];
        let scaled = scale_supplied(&nodes, canvas, &config);

        assert!((scaled[1].x - scaled[0].x - 260.0).abs() < 1e-3);
        assert_eq!(scaled[2], pos2(config.node_radius, config.node_radius));
    }

    #[test]
    fn scaling_is_repeatable() {
        let config = LayoutConfig::default();
        let canvas = Canvas::new(1024.0, 700.0);
        let nodes = [
            node("0", Some((120.0, 80.0))),
            node("1", None),
            node("hub", Some((640.0, 410.0))),
        ];
        assert_eq!(
            scale_supplied(&nodes, canvas, &config),
            scale_supplied(&nodes, canvas, &config)
        );
    }

    #[test]
    fn unpositioned_nodes_use_numeric_id_slot() {
        let config = LayoutConfig::default();
        let canvas = Canvas::new(800.0, 600.0);
        let nodes = [
            node("2", None),
            node("x", Some((100.0, 100.0))),
            node("depot", None),
        ];
        let scaled = scale_supplied(&nodes, canvas, &config);
        assert_eq!(scaled[0], circle_position(2, 3, canvas));
        assert_eq!(scaled[2], circle_position(2, 3, canvas));
    }

    #[test]
    fn unpositioned_nodes_stay_inside_a_small_canvas() {
        let config = LayoutConfig::default();
        let canvas = Canvas::new(60.0, 300.0);
        let nodes = [node("0", None), node("1", Some((400.0, 300.0))), node("2", None)];
        let scaled = scale_supplied(&nodes, canvas, &config);

        assert!(circle_position(0, 3, canvas).x > canvas.width - config.node_radius);
        for point in scaled {
            assert!(point.x >= config.node_radius && point.x <= canvas.width - config.node_radius);
            assert!(point.y >= config.node_radius && point.y <= canvas.height - config.node_radius);
        }
    }
}
