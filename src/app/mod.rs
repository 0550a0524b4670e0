use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{Context, Vec2};

use crate::config::Config;
use crate::layout::PositionedGraph;
use crate::sim::{CommandRunner, SimulationParams, TaskStatus, TcpTransport, Topology};
use crate::sync::{Backoff, Deadlines, Synchronizer, TcpConnector};

mod graph;
mod highlight;
mod render_utils;
mod session;
mod ui;

pub struct CourierViewApp {
    model: ViewModel,
}

struct ViewModel {
    config: Config,
    sync: Synchronizer,
    commands: CommandRunner,
    layout: Option<LayoutCache>,
    layout_revision: u64,
    applied_revision: u64,
    task_statuses: HashMap<String, TaskStatus>,
    flashes: Deadlines<String>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    selected_task: Option<String>,
    selected_driver: Option<String>,
    pan: Vec2,
    zoom: f32,
    create_params: SimulationParams,
    training_timesteps: u64,
    speed_input: String,
    speed: Option<f64>,
    paused: bool,
    optimizer_ready: Option<bool>,
    notices: Vec<Notice>,
    next_notice_id: u64,
}

struct LayoutCache {
    topology: Topology,
    graph: PositionedGraph,
}

struct SearchMatchCache {
    query: String,
    layout_revision: u64,
    matches: Arc<HashSet<usize>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NoticeKind {
    Info,
    Error,
}

struct Notice {
    id: u64,
    kind: NoticeKind,
    text: String,
}

impl CourierViewApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let transport = TcpTransport::new(
            config.server.command_addr.clone(),
            config.server.connect_timeout(),
            config.server.command_timeout(),
        );
        let connector = TcpConnector::new(
            config.server.push_addr.clone(),
            config.server.connect_timeout(),
        );
        let sync = Synchronizer::new(Box::new(connector), Backoff::from_config(&config.sync));

        let mut model = ViewModel::new(config, sync, CommandRunner::new(Arc::new(transport)));
        model.start();
        Self { model }
    }
}

impl eframe::App for CourierViewApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.show(ctx);

        let repaint = Duration::from_millis(self.model.config.view.repaint_ms.max(16));
        ctx.request_repaint_after(self.model.next_wakeup().map_or(repaint, |due| due.min(repaint)));
    }
}

impl Drop for CourierViewApp {
    fn drop(&mut self) {
        self.model.teardown();
    }
}
