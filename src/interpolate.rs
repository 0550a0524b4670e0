use eframe::egui::Pos2;

use crate::geometry::lerp_point;
use crate::layout::PositionedGraph;
use crate::sim::Driver;

#[derive(Clone, Debug, PartialEq)]
pub struct DriverMarker {
    pub id: String,
    pub position: Pos2,
    pub moving: bool,
}

/// Where a driver is drawn: its current node's center, or a point on the
/// way to its next node when it is moving. `None` only when the current
/// node itself is not placed.
pub fn driver_position(driver: &Driver, graph: &PositionedGraph) -> Option<(Pos2, bool)> {
    let current = graph.center_of(&driver.current_node)?;
    if driver.is_idle() {
        return Some((current, false));
    }

    let (Some(next_id), Some(progress)) = (driver.next_node.as_deref(), driver.progress) else {
        return Some((current, false));
    };
    if !progress.is_finite() {
        return Some((current, false));
    }
    let Some(next) = graph.center_of(next_id) else {
        return Some((current, false));
    };

    Some((lerp_point(current, next, progress.clamp(0.0, 1.0)), true))
}

pub fn interpolate_drivers(drivers: &[Driver], graph: &PositionedGraph) -> Vec<DriverMarker> {
    drivers
        .iter()
        .filter_map(|driver| {
            let (position, moving) = driver_position(driver, graph)?;
            Some(DriverMarker {
                id: driver.id.clone(),
                position,
                moving,
            })
        })
        .collect()
}
