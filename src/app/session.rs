use std::collections::HashMap;
use std::time::{Duration, Instant};

use eframe::egui::Vec2;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::sim::{CommandOutcome, CommandRunner, Request, SimulationParams, Snapshot, TaskStatus};
use crate::sync::{Deadlines, Synchronizer};

use super::{Notice, NoticeKind, ViewModel};

const MAX_NOTICES: usize = 6;

/// Anchor nodes of tasks that appeared or were delivered since `previous`.
pub(super) fn flash_anchors(
    previous: &HashMap<String, TaskStatus>,
    snapshot: &Snapshot,
) -> Vec<String> {
    let mut anchors = Vec::new();
    for task in &snapshot.tasks {
        let flashes = match previous.get(&task.id) {
            None => true,
            Some(before) => *before != TaskStatus::Delivered && task.status == TaskStatus::Delivered,
        };
        if flashes && !anchors.iter().any(|anchor| anchor == task.anchor_node()) {
            anchors.push(task.anchor_node().to_owned());
        }
    }
    anchors
}

impl ViewModel {
    pub(in crate::app) fn new(config: Config, sync: Synchronizer, commands: CommandRunner) -> Self {
        Self {
            config,
            sync,
            commands,
            layout: None,
            layout_revision: 0,
            applied_revision: 0,
            task_statuses: HashMap::new(),
            flashes: Deadlines::default(),
            search: String::new(),
            search_match_cache: None,
            selected_task: None,
            selected_driver: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            create_params: SimulationParams::default(),
            training_timesteps: 10_000,
            speed_input: "1.0".to_owned(),
            speed: None,
            paused: false,
            optimizer_ready: None,
            notices: Vec::new(),
            next_notice_id: 0,
        }
    }

    pub(in crate::app) fn start(&mut self) {
        self.sync.start();
        self.submit(Request::GetState);
    }

    pub(in crate::app) fn teardown(&mut self) {
        self.flashes.cancel_all();
        self.sync.disconnect();
    }

    pub(in crate::app) fn reconnect(&mut self) {
        info!(endpoint = %self.sync.endpoint(), "manual reconnect");
        self.sync.restart();
        self.submit(Request::GetState);
    }

    pub(in crate::app) fn submit(&mut self, request: Request) {
        let kind = request.kind();
        match self.commands.submit(request) {
            Ok(true) => {}
            Ok(false) => debug!(command = kind, "ignored duplicate submission"),
            Err(error) => self.push_notice(NoticeKind::Error, format!("{kind}: {error}")),
        }
    }

    /// One cooperative turn: push events, command results, then timers.
    pub(in crate::app) fn pump(&mut self, now: Instant) {
        self.sync.poll(now);
        if let Some(message) = self.sync.take_remote_error() {
            self.push_notice(NoticeKind::Error, format!("server: {message}"));
        }

        for outcome in self.commands.poll() {
            self.apply_outcome(outcome);
        }

        if self.sync.revision() != self.applied_revision {
            self.applied_revision = self.sync.revision();
            self.on_snapshot_changed(now);
        }

        for node in self.flashes.take_due(now) {
            debug!(node = %node, "flash finished");
        }
    }

    fn on_snapshot_changed(&mut self, now: Instant) {
        let Some(snapshot) = self.sync.snapshot().cloned() else {
            return;
        };

        let topology_changed = self
            .layout
            .as_ref()
            .is_none_or(|cache| cache.topology != snapshot.topology());
        if topology_changed {
            self.flashes.cancel_all();
            self.task_statuses.clear();
        } else {
            let until = now + Duration::from_millis(self.config.view.flash_ms);
            for anchor in flash_anchors(&self.task_statuses, &snapshot) {
                self.flashes.cancel_where(|node| *node == anchor);
                self.flashes.schedule(anchor, until);
            }
        }

        self.task_statuses = snapshot
            .tasks
            .iter()
            .map(|task| (task.id.clone(), task.status))
            .collect();

        if let Some(task) = &self.selected_task
            && snapshot.task(task).is_none()
        {
            self.selected_task = None;
        }
        if let Some(driver) = &self.selected_driver
            && !snapshot.drivers.iter().any(|candidate| candidate.id == *driver)
        {
            self.selected_driver = None;
        }
    }

    fn apply_outcome(&mut self, outcome: CommandOutcome) {
        let CommandOutcome { request, result } = outcome;
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                self.push_notice(NoticeKind::Error, format!("{}: {error}", request.kind()));
                return;
            }
        };

        let created = matches!(request, Request::CreateSimulation { .. });
        match request {
            Request::GetState | Request::CreateSimulation { .. } => {
                match response.snapshot() {
                    Ok(Some(snapshot)) => {
                        if !self.sync.apply_fetched(snapshot) {
                            debug!("fetched state ignored while training");
                        }
                    }
                    Ok(None) if created => self.submit(Request::GetState),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(error = %format!("{error:#}"), "fetched state did not decode");
                        self.push_notice(NoticeKind::Error, format!("{error:#}"));
                    }
                }
                if created {
                    self.paused = false;
                    self.pan = Vec2::ZERO;
                    self.zoom = 1.0;
                    self.push_notice(
                        NoticeKind::Info,
                        response
                            .message
                            .unwrap_or_else(|| "Simulation created".to_owned()),
                    );
                }
            }
            Request::Pause => self.paused = true,
            Request::Resume => self.paused = false,
            Request::SetSpeed { speed } => self.speed = Some(speed),
            Request::StartTraining { timesteps } => self.push_notice(
                NoticeKind::Info,
                response
                    .message
                    .unwrap_or_else(|| format!("Training started for {timesteps} timesteps")),
            ),
            Request::AssignTask { task_id, driver_id } => self.push_notice(
                NoticeKind::Info,
                response
                    .message
                    .unwrap_or_else(|| format!("Task {task_id} assigned to driver {driver_id}")),
            ),
            Request::Optimizer { .. } => {
                self.optimizer_ready = response.optimizer_ready();
            }
        }
    }

    pub(in crate::app) fn push_notice(&mut self, kind: NoticeKind, text: String) {
        if kind == NoticeKind::Error {
            warn!(%text, "surfacing error");
        }

        self.next_notice_id += 1;
        self.notices.push(Notice {
            id: self.next_notice_id,
            kind,
            text,
        });
        if self.notices.len() > MAX_NOTICES {
            let overflow = self.notices.len() - MAX_NOTICES;
            self.notices.drain(..overflow);
        }
    }

    pub(in crate::app) fn dismiss_notice(&mut self, id: u64) {
        self.notices.retain(|notice| notice.id != id);
    }

    pub(in crate::app) fn next_wakeup(&self) -> Option<Duration> {
        let now = Instant::now();
        let flash = self
            .flashes
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));
        match (self.sync.reconnect_in(now), flash) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
