use eframe::egui::{Pos2, Vec2};

use super::{Canvas, circle_position};
use crate::config::LayoutConfig;

/// Spring-repulsion layout with a cooling temperature.
///
/// Every node starts on the canvas circle in the order given, so identical
/// input always yields identical output. Positions are node centers.
pub fn force_layout(
    node_count: usize,
    edges: &[(usize, usize)],
    canvas: Canvas,
    config: &LayoutConfig,
) -> Vec<Pos2> {
    let n = node_count;
    if n == 0 {
        return Vec::new();
    }

    let mut positions = (0..n)
        .map(|slot| circle_position(slot, n, canvas))
        .collect::<Vec<_>>();

    let k = (canvas.width * canvas.height / n as f32).sqrt();
    if !k.is_finite() || k <= 0.0 {
        return positions;
    }

    let mut temperature = canvas.min_side() / config.initial_temperature_divisor.max(1.0);

    for _ in 0..config.iterations {
        let mut disp = vec![Vec2::ZERO; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                if distance <= f32::EPSILON {
                    continue;
                }

                let direction = delta / distance;
                let force = k * k / distance;
                disp[i] += direction * force;
                disp[j] -= direction * force;
            }
        }

        for &(from, to) in edges {
            if from >= n || to >= n || from == to {
                continue;
            }

            let delta = positions[from] - positions[to];
            let distance = delta.length();
            if distance <= f32::EPSILON {
                continue;
            }

            let direction = delta / distance;
            let force = distance * distance / k;
            disp[from] -= direction * force;
            disp[to] += direction * force;
        }

        for (position, d) in positions.iter_mut().zip(&disp) {
            let length = d.length();
            if length > 0.0 {
                *position += *d / length * length.min(temperature);
            }
            *position = canvas.clamp(*position, config.node_radius);
        }

        temperature *= config.cooling_factor;
    }

    positions
}
