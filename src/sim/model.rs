use eframe::egui::{Pos2, pos2};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Attributes = Map<String, Value>;

fn id_from_value(value: Value) -> Result<String, String> {
    match value {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(format!("expected a string or numeric id, found {other}")),
    }
}

pub(super) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(value).map_err(serde::de::Error::custom)
}

pub(super) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => id_from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Display fields below decode leniently: an off-type value degrades to the
// default instead of rejecting the whole snapshot.

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value
        .filter(|value| value.is_finite() && *value >= 0.0)
        .map(|value| value.ceil().min(f64::from(u32::MAX)) as u32))
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    #[serde(alias = "order")]
    Task,
    Driver,
    #[default]
    #[serde(other)]
    Location,
}

impl NodeRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Task => "task",
            Self::Driver => "driver",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "type")]
    pub role: NodeRole,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Node {
    pub fn supplied_position(&self) -> Option<Pos2> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(pos2(x, y)),
            _ => None,
        }
    }

    pub fn has_non_origin_position(&self) -> bool {
        self.supplied_position()
            .is_some_and(|position| position != Pos2::ZERO)
    }

    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or_else(|| self.attributes.get("name").and_then(Value::as_str))
            .unwrap_or(&self.id)
    }

    pub fn order_probability(&self) -> Option<f64> {
        self.attributes
            .get("order_probability")
            .and_then(Value::as_f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub source: String,
    #[serde(deserialize_with = "de_id")]
    pub target: String,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default, alias = "showWeight", deserialize_with = "de_flag")]
    pub show_weight: bool,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(alias = "location", deserialize_with = "de_id")]
    pub current_node: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub next_node: Option<String>,
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub delay: Option<u32>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Driver {
    pub fn is_idle(&self) -> bool {
        self.delay == Some(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(alias = "picked_up")]
    InTransit,
    Delivered,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in transit",
            Self::Delivered => "delivered",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(deserialize_with = "de_id")]
    pub pickup_node: String,
    #[serde(deserialize_with = "de_id")]
    pub dropoff_node: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Task {
    pub fn anchor_node(&self) -> &str {
        match self.status {
            TaskStatus::Pending | TaskStatus::InTransit => &self.pickup_node,
            TaskStatus::Delivered => &self.dropoff_node,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardStats {
    #[serde(default)]
    pub episode_reward: f64,
    #[serde(default)]
    pub num_delivered: u64,
    #[serde(default)]
    pub avg_delivery_time: f64,
    #[serde(flatten)]
    pub extra: Attributes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub timestep: u64,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default, alias = "orders")]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub stats: RewardStats,
}

/// Node ids, supplied positions and edge endpoints in arrival order; two
/// snapshots with equal topology keep the same layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
    pub node_ids: Vec<String>,
    pub positions: Vec<Option<Pos2>>,
    pub edges: Vec<(String, String)>,
}

impl Snapshot {
    pub fn topology(&self) -> Topology {
        Topology {
            node_ids: self.nodes.iter().map(|node| node.id.clone()).collect(),
            positions: self.nodes.iter().map(Node::supplied_position).collect(),
            edges: self
                .edges
                .iter()
                .map(|edge| (edge.source.clone(), edge.target.clone()))
                .collect(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numeric_ids_and_keeps_unknown_keys() {
        let raw = r#"{
            "timestep": 12,
            "nodes": [
                {"id": 0, "type": "location", "x": 10.5, "y": 20.0, "order_probability": 0.25},
                {"id": "1", "label": "Depot", "highlight": true}
            ],
            "edges": [{"source": 0, "target": 1, "weight": 3.0, "showWeight": true}],
            "drivers": [{"id": 7, "location": 0, "next_node": 1, "progress": 0.5, "delay": 2}],
            "orders": [{"id": 3, "status": "picked_up", "pickup_node": 0, "dropoff_node": 1}],
            "stats": {"episode_reward": -1.5, "num_delivered": 4, "avg_delivery_time": 9.0}
        }"#;

        let snapshot: Snapshot = serde_json::from_str(raw).expect("snapshot decodes");
        assert_eq!(snapshot.timestep, 12);
        assert_eq!(snapshot.nodes[0].id, "0");
        assert_eq!(snapshot.nodes[0].order_probability(), Some(0.25));
        assert_eq!(snapshot.nodes[1].role, NodeRole::Location);
        assert_eq!(snapshot.nodes[1].display_label(), "Depot");
        assert_eq!(snapshot.nodes[1].attributes.get("highlight"), Some(&Value::Bool(true)));
        assert!(snapshot.edges[0].show_weight);
        assert_eq!(snapshot.drivers[0].current_node, "0");
        assert_eq!(snapshot.drivers[0].next_node.as_deref(), Some("1"));
        assert_eq!(snapshot.tasks[0].status, TaskStatus::InTransit);
        assert_eq!(snapshot.stats.num_delivered, 4);
    }

    #[test]
    fn unknown_role_falls_back_to_location() {
        let node: Node = serde_json::from_str(r#"{"id": "a", "role": "warehouse"}"#)
            .expect("node decodes");
        assert_eq!(node.role, NodeRole::Location);
    }

    #[test]
    fn anchor_follows_task_status() {
        let mut task = Task {
            id: "t".to_owned(),
            status: TaskStatus::Pending,
            pickup_node: "p".to_owned(),
            dropoff_node: "d".to_owned(),
            attributes: Attributes::new(),
        };
        assert_eq!(task.anchor_node(), "p");
        task.status = TaskStatus::InTransit;
        assert_eq!(task.anchor_node(), "p");
        task.status = TaskStatus::Delivered;
        assert_eq!(task.anchor_node(), "d");
    }

    #[test]
    fn origin_is_not_a_supplied_layout_hint() {
        let node: Node = serde_json::from_str(r#"{"id": "a", "x": 0.0, "y": 0.0}"#)
            .expect("node decodes");
        assert_eq!(node.supplied_position(), Some(Pos2::ZERO));
        assert!(!node.has_non_origin_position());
    }

    #[test]
    fn moved_supplied_positions_change_the_topology() {
        let before: Snapshot = serde_json::from_str(
            r#"{"nodes":[{"id":0,"x":10,"y":20},{"id":1,"x":30,"y":40}],"edges":[{"source":0,"target":1}]}"#,
        )
        .expect("snapshot decodes");
        let after: Snapshot = serde_json::from_str(
            r#"{"nodes":[{"id":0,"x":790,"y":580},{"id":1,"x":30,"y":40}],"edges":[{"source":0,"target":1}]}"#,
        )
        .expect("snapshot decodes");

        assert_eq!(before.topology(), before.clone().topology());
        assert_ne!(before.topology(), after.topology());
    }

    #[test]
    fn off_type_display_fields_do_not_reject_the_snapshot() {
        let raw = r#"{
            "nodes": [{"id": "a", "label": 42}, {"id": "b", "label": ["x"]}],
            "edges": [{"source": "a", "target": "b", "show_weight": null},
                      {"source": "b", "target": "a", "showWeight": 1}],
            "drivers": [{"id": 1, "current_node": "a", "delay": 0.4},
                        {"id": 2, "current_node": "b", "delay": "soon"},
                        {"id": 3, "current_node": "b", "delay": 0}]
        }"#;

        let snapshot: Snapshot = serde_json::from_str(raw).expect("snapshot decodes");
        assert_eq!(snapshot.nodes[0].display_label(), "42");
        assert_eq!(snapshot.nodes[1].display_label(), "b");
        assert!(!snapshot.edges[0].show_weight);
        assert!(snapshot.edges[1].show_weight);
        assert_eq!(snapshot.drivers[0].delay, Some(1));
        assert!(!snapshot.drivers[0].is_idle());
        assert_eq!(snapshot.drivers[1].delay, None);
        assert!(snapshot.drivers[2].is_idle());
    }
}
