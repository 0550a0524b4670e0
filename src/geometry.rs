use eframe::egui::{Pos2, Vec2, pos2, vec2};

pub fn perpendicular(direction: Vec2) -> Vec2 {
    vec2(-direction.y, direction.x)
}

/// Exact at both ends: `t == 0` returns `from`, `t == 1` returns `to`.
pub fn lerp_point(from: Pos2, to: Pos2, t: f32) -> Pos2 {
    let mixed = from.to_vec2() * (1.0 - t) + to.to_vec2() * t;
    pos2(mixed.x, mixed.y)
}

/// Projection of `point` onto the infinite line through `start` and `end`.
pub fn project_onto_line(point: Pos2, start: Pos2, end: Pos2) -> Pos2 {
    let direction = end - start;
    let length_sq = direction.length_sq();
    if length_sq <= f32::EPSILON {
        return start;
    }

    let t = (point - start).dot(direction) / length_sq;
    start + direction * t
}

pub fn closest_point_on_segment(point: Pos2, start: Pos2, end: Pos2) -> Pos2 {
    let direction = end - start;
    let length_sq = direction.length_sq();
    if length_sq <= f32::EPSILON {
        return start;
    }

    let t = ((point - start).dot(direction) / length_sq).clamp(0.0, 1.0);
    start + direction * t
}

pub fn segment_intersects_circle(start: Pos2, end: Pos2, center: Pos2, radius: f32) -> bool {
    let closest = closest_point_on_segment(center, start, end);
    closest.distance_sq(center) < radius * radius
}

pub fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let a_min_x = a1.x.min(a2.x);
    let a_max_x = a1.x.max(a2.x);
    let a_min_y = a1.y.min(a2.y);
    let a_max_y = a1.y.max(a2.y);
    let b_min_x = b1.x.min(b2.x);
    let b_max_x = b1.x.max(b2.x);
    let b_min_y = b1.y.min(b2.y);
    let b_max_y = b1.y.max(b2.y);

    if a_max_x < b_min_x || b_max_x < a_min_x || a_max_y < b_min_y || b_max_y < a_min_y {
        return false;
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

/// Keeps `value` inside `[margin, extent - margin]`, collapsing to the middle
/// when the extent is too small to hold the margin on both sides.
pub fn clamp_axis(value: f32, margin: f32, extent: f32) -> f32 {
    if extent <= margin * 2.0 {
        return extent * 0.5;
    }
    value.clamp(margin, extent - margin)
}
