mod commands;
mod model;
mod protocol;
mod transport;

pub use commands::{CommandOutcome, CommandRunner};
pub use model::{Driver, Node, NodeRole, Snapshot, TaskStatus, Topology};
pub use protocol::{ClientMessage, Mode, Request, ServerMessage, SimulationParams, parse_server_message};
pub(crate) use transport::connect_stream;
pub use transport::TcpTransport;

#[cfg(test)]
pub(crate) use commands::CommandError;
#[cfg(test)]
pub(crate) use model::Attributes;
#[cfg(test)]
pub(crate) use protocol::Response;
#[cfg(test)]
pub(crate) use transport::Transport;
