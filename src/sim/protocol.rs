use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Attributes, Snapshot, de_id};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Simulation,
    Training,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Training => "training",
        }
    }
}

/// One line on the push channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StateUpdate {
        #[serde(default)]
        mode: Mode,
        data: Box<Snapshot>,
        #[serde(default)]
        timestep: Option<u64>,
    },
    TrainingStart {
        #[serde(default)]
        timestep: u64,
    },
    TrainingEnd {
        #[serde(default)]
        timestep: u64,
        #[serde(default)]
        data: Option<Box<Snapshot>>,
    },
    Error {
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    RequestState,
}

pub fn parse_server_message(raw: &str) -> Result<ServerMessage> {
    serde_json::from_str(raw.trim()).context("invalid message on push channel")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub num_nodes: usize,
    pub num_drivers: usize,
    pub num_edges: usize,
    pub arrival_rate: f32,
    #[serde(default)]
    pub init_optimizer: bool,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_nodes: 6,
            num_drivers: 2,
            num_edges: 7,
            arrival_rate: 0.1,
            init_optimizer: false,
            extra: Attributes::new(),
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_nodes == 0 {
            return Err("a simulation needs at least one node".to_owned());
        }
        let min_edges = self.num_nodes - 1;
        if self.num_edges < min_edges {
            return Err(format!(
                "{} nodes need at least {min_edges} edges to stay connected, got {}",
                self.num_nodes, self.num_edges
            ));
        }
        if !self.arrival_rate.is_finite() || self.arrival_rate < 0.0 {
            return Err(format!(
                "arrival rate must be a non-negative number, got {}",
                self.arrival_rate
            ));
        }
        Ok(())
    }
}

/// One request/response exchange on the command endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    CreateSimulation {
        params: SimulationParams,
    },
    StartTraining {
        timesteps: u64,
    },
    Pause,
    Resume,
    SetSpeed {
        speed: f64,
    },
    AssignTask {
        #[serde(deserialize_with = "de_id")]
        task_id: String,
        #[serde(deserialize_with = "de_id")]
        driver_id: String,
    },
    Optimizer {
        initialize: bool,
    },
    GetState,
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSimulation { .. } => "create_simulation",
            Self::StartTraining { .. } => "start_training",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::SetSpeed { .. } => "set_speed",
            Self::AssignTask { .. } => "assign_task",
            Self::Optimizer { .. } => "optimizer",
            Self::GetState => "get_state",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::CreateSimulation { params } => params.validate(),
            Self::StartTraining { timesteps } if *timesteps == 0 => {
                Err("training needs a positive timestep budget".to_owned())
            }
            Self::SetSpeed { speed } if !speed.is_finite() || *speed <= 0.0 => Err(format!(
                "speed must be a positive number of timesteps per second, got {speed}"
            )),
            Self::AssignTask { task_id, driver_id } if task_id.is_empty() || driver_id.is_empty() => {
                Err("pick both a task and a driver".to_owned())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Response {
    pub fn snapshot(&self) -> Result<Option<Snapshot>> {
        let Some(data) = self.data.as_ref() else {
            return Ok(None);
        };
        if data.is_null() {
            return Ok(None);
        }

        let snapshot =
            Snapshot::deserialize(data).context("response data is not a simulation snapshot")?;
        Ok(Some(snapshot))
    }

    pub fn optimizer_ready(&self) -> Option<bool> {
        self.data
            .as_ref()
            .and_then(|data| data.get("ready"))
            .and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_push_message() {
        let update = parse_server_message(
            r#"{"type":"state_update","mode":"training","data":{"timestep":3},"timestep":3}"#,
        )
        .expect("state update decodes");
        assert!(matches!(
            update,
            ServerMessage::StateUpdate {
                mode: Mode::Training,
                timestep: Some(3),
                ..
            }
        ));

        let start = parse_server_message(r#"{"type":"training_start","timestep":40}"#)
            .expect("training start decodes");
        assert_eq!(start, ServerMessage::TrainingStart { timestep: 40 });

        let end = parse_server_message(r#"{"type":"training_end","timestep":90}"#)
            .expect("training end decodes");
        assert_eq!(
            end,
            ServerMessage::TrainingEnd {
                timestep: 90,
                data: None
            }
        );

        let error = parse_server_message(r#"{"type":"error","message":"boom"}"#)
            .expect("error decodes");
        assert_eq!(
            error,
            ServerMessage::Error {
                message: "boom".to_owned()
            }
        );
    }

    #[test]
    fn rejects_unknown_and_truncated_frames() {
        assert!(parse_server_message(r#"{"type":"mystery"}"#).is_err());
        assert!(parse_server_message(r#"{"type":"state_update","data":{"nodes":[{"#).is_err());
    }

    #[test]
    fn request_wire_shape() {
        let encoded = serde_json::to_value(Request::SetSpeed { speed: 2.5 }).expect("encodes");
        assert_eq!(encoded, serde_json::json!({"type": "set_speed", "speed": 2.5}));

        let hello = serde_json::to_string(&ClientMessage::RequestState).expect("encodes");
        assert_eq!(hello, r#"{"type":"request_state"}"#);
    }

    #[test]
    fn validation_rules() {
        assert!(Request::SetSpeed { speed: 0.0 }.validate().is_err());
        assert!(Request::SetSpeed { speed: -1.0 }.validate().is_err());
        assert!(Request::SetSpeed { speed: f64::NAN }.validate().is_err());
        assert!(Request::SetSpeed { speed: 0.5 }.validate().is_ok());

        let sparse = SimulationParams {
            num_nodes: 10,
            num_edges: 8,
            ..SimulationParams::default()
        };
        assert!(Request::CreateSimulation { params: sparse }.validate().is_err());

        let tree = SimulationParams {
            num_nodes: 10,
            num_edges: 9,
            ..SimulationParams::default()
        };
        assert!(Request::CreateSimulation { params: tree }.validate().is_ok());
        assert!(Request::StartTraining { timesteps: 0 }.validate().is_err());
    }

    #[test]
    fn response_carries_snapshot_and_readiness() {
        let response: Response = serde_json::from_str(
            r#"{"success":true,"data":{"timestep":5,"nodes":[{"id":1}],"ready":true}}"#,
        )
        .expect("response decodes");
        let snapshot = response
            .snapshot()
            .expect("snapshot decodes")
            .expect("snapshot present");
        assert_eq!(snapshot.timestep, 5);
        assert_eq!(response.optimizer_ready(), Some(true));

        let bare: Response = serde_json::from_str(r#"{"success":false,"message":"nope"}"#)
            .expect("response decodes");
        assert_eq!(bare.snapshot().expect("no data is fine"), None);
        assert_eq!(bare.message.as_deref(), Some("nope"));
    }
}
