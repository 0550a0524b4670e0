use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::geometry::segments_intersect;
use crate::sim::NodeRole;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(22, 26, 31));

    let step = (50.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.left_top() + pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 60));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let padded = rect.expand(padding);
    if padded.contains(start) || padded.contains(end) {
        return true;
    }

    let corners = [
        padded.left_top(),
        padded.right_top(),
        padded.right_bottom(),
        padded.left_bottom(),
    ];
    (0..4).any(|side| segments_intersect(start, end, corners[side], corners[(side + 1) % 4]))
}

/// Canvas space has its origin at the panel's top-left corner.
pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Pos2) -> Pos2 {
    rect.left_top() + pan + world.to_vec2() * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Pos2 {
    ((screen - rect.left_top() - pan) / zoom).to_pos2()
}

pub(super) fn role_color(role: NodeRole) -> Color32 {
    match role {
        NodeRole::Location => Color32::from_rgb(82, 145, 214),
        NodeRole::Task => Color32::from_rgb(232, 167, 72),
        NodeRole::Driver => Color32::from_rgb(96, 196, 128),
    }
}

pub(super) fn driver_color(moving: bool) -> Color32 {
    if moving {
        Color32::from_rgb(112, 224, 146)
    } else {
        Color32::from_rgb(150, 160, 152)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn screen_and_world_transforms_invert() {
        let rect = Rect::from_min_size(pos2(40.0, 30.0), vec2(800.0, 600.0));
        let pan = vec2(-25.0, 12.5);
        let world = pos2(310.0, 122.0);
        let screen = world_to_screen(rect, pan, 1.75, world);
        let back = screen_to_world(rect, pan, 1.75, screen);
        assert!((back.x - world.x).abs() < 1e-3);
        assert!((back.y - world.y).abs() < 1e-3);
    }

    #[test]
    fn edges_crossing_the_panel_are_visible() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 0.0));
        assert!(edge_visible(rect, pos2(10.0, 10.0), pos2(500.0, 500.0), 0.0));
        assert!(!edge_visible(rect, pos2(-50.0, -10.0), pos2(150.0, -10.0), 2.0));
    }

    #[test]
    fn identity_view_maps_canvas_onto_panel() {
        let rect = Rect::from_min_size(pos2(200.0, 50.0), vec2(640.0, 480.0));
        assert_eq!(
            world_to_screen(rect, Vec2::ZERO, 1.0, pos2(0.0, 0.0)),
            rect.left_top()
        );
    }
}
