use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::protocol::{Request, Response};
use super::transport::Transport;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0}")]
    Rejected(String),
    #[error("request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

pub fn execute(transport: &dyn Transport, request: &Request) -> Result<Response, CommandError> {
    request.validate().map_err(CommandError::Validation)?;

    let response = transport.round_trip(request)?;
    if !response.success {
        let message = response
            .message
            .clone()
            .unwrap_or_else(|| format!("{} was refused", request.kind()));
        return Err(CommandError::Rejected(message));
    }

    Ok(response)
}

pub struct CommandOutcome {
    pub request: Request,
    pub result: Result<Response, CommandError>,
}

struct InFlight {
    request: Request,
    rx: Receiver<Result<Response, CommandError>>,
}

/// Runs each command on its own worker thread; results are collected by
/// `poll` from the UI thread.
pub struct CommandRunner {
    transport: Arc<dyn Transport>,
    in_flight: Vec<InFlight>,
}

impl CommandRunner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            in_flight: Vec::new(),
        }
    }

    /// Returns `Ok(false)` when an identical request is still in flight.
    pub fn submit(&mut self, request: Request) -> Result<bool, CommandError> {
        if let Err(reason) = request.validate() {
            warn!(command = request.kind(), %reason, "command rejected before sending");
            return Err(CommandError::Validation(reason));
        }

        if self.in_flight.iter().any(|entry| entry.request == request) {
            debug!(command = request.kind(), "identical command already in flight");
            return Ok(false);
        }

        info!(command = request.kind(), "sending command");
        let (tx, rx) = mpsc::channel();
        let transport = Arc::clone(&self.transport);
        let worker_request = request.clone();
        thread::spawn(move || {
            let result = execute(transport.as_ref(), &worker_request);
            let _ = tx.send(result);
        });

        self.in_flight.push(InFlight { request, rx });
        Ok(true)
    }

    pub fn poll(&mut self) -> Vec<CommandOutcome> {
        let mut finished = Vec::new();
        let mut pending = Vec::with_capacity(self.in_flight.len());

        for entry in self.in_flight.drain(..) {
            match entry.rx.try_recv() {
                Ok(result) => finished.push(CommandOutcome {
                    request: entry.request,
                    result,
                }),
                Err(TryRecvError::Empty) => pending.push(entry),
                Err(TryRecvError::Disconnected) => finished.push(CommandOutcome {
                    request: entry.request,
                    result: Err(CommandError::Transport(anyhow::anyhow!(
                        "command worker disconnected"
                    ))),
                }),
            }
        }

        self.in_flight = pending;
        for outcome in &finished {
            match &outcome.result {
                Ok(_) => info!(command = outcome.request.kind(), "command succeeded"),
                Err(error) => warn!(command = outcome.request.kind(), %error, "command failed"),
            }
        }
        finished
    }

    pub fn is_pending(&self, kind: &str) -> bool {
        self.in_flight
            .iter()
            .any(|entry| entry.request.kind() == kind)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
