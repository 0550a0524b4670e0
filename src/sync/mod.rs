mod backoff;
mod channel;
mod timers;

use std::sync::Arc;
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::sim::{Mode, ServerMessage, Snapshot, parse_server_message};

pub use backoff::Backoff;
use channel::ChannelEvent;
pub(crate) use channel::{Channel, Connector};
pub use channel::TcpConnector;
#[cfg(test)]
pub(crate) use channel::ShutdownHandle;
pub use timers::Deadlines;
use timers::TimerHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

/// Owns the push connection and the authoritative snapshot.
///
/// All mutation happens inside `poll` (or the explicit lifecycle calls), on
/// the thread that owns the synchronizer. Snapshots are applied in arrival
/// order and only while the mode is `Simulation`, except for the final
/// snapshot carried by `training_end`.
pub struct Synchronizer {
    connector: Box<dyn Connector>,
    backoff: Backoff,
    channel: Option<Channel>,
    state: ConnectionState,
    attempts: u32,
    reconnect: Deadlines<()>,
    reconnect_timer: Option<TimerHandle>,
    mode: Mode,
    training_since: Option<u64>,
    snapshot: Option<Arc<Snapshot>>,
    revision: u64,
    remote_error: Option<String>,
    failure: Option<String>,
    torn_down: bool,
}

impl Synchronizer {
    pub fn new(connector: Box<dyn Connector>, backoff: Backoff) -> Self {
        Self {
            connector,
            backoff,
            channel: None,
            state: ConnectionState::Closed,
            attempts: 0,
            reconnect: Deadlines::default(),
            reconnect_timer: None,
            mode: Mode::Simulation,
            training_since: None,
            snapshot: None,
            revision: 0,
            remote_error: None,
            failure: None,
            torn_down: true,
        }
    }

    /// Opens the channel unless one is already live.
    pub fn start(&mut self) {
        if self.channel.is_some() {
            return;
        }

        self.torn_down = false;
        self.failure = None;
        self.reconnect.cancel_all();
        self.open_channel();
    }

    /// Manual restart after the retry budget ran out.
    pub fn restart(&mut self) {
        self.disconnect();
        self.attempts = 0;
        self.start();
    }

    /// Intentional teardown: cancels any pending reconnect and closes the
    /// socket. No reconnect follows.
    pub fn disconnect(&mut self) {
        self.torn_down = true;
        if let Some(handle) = self.reconnect_timer.take() {
            self.reconnect.cancel(handle);
        }
        if self.channel.take().is_some() {
            info!(addr = %self.connector.describe(), "push channel closed on request");
        }
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
    }

    fn open_channel(&mut self) {
        info!(
            addr = %self.connector.describe(),
            attempt = self.attempts,
            "connecting push channel"
        );
        self.channel = Some(self.connector.connect());
        self.state = ConnectionState::Connecting;
    }

    /// Drains channel events in arrival order and fires a due reconnect.
    /// Returns true when the visible snapshot changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let revision_before = self.revision;

        loop {
            let Some(channel) = self.channel.as_ref() else {
                break;
            };
            let event = match channel.events().try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    ChannelEvent::Closed(Some("push worker stopped".to_owned()))
                }
            };
            self.handle_event(event, now);
        }

        if !self.torn_down && !self.reconnect.take_due(now).is_empty() {
            self.reconnect_timer = None;
            if self.channel.is_none() {
                self.open_channel();
            }
        }

        self.revision != revision_before
    }

    pub fn handle_event(&mut self, event: ChannelEvent, now: Instant) {
        match event {
            ChannelEvent::Opened => {
                info!(addr = %self.connector.describe(), "push channel open");
                self.state = ConnectionState::Open;
                self.attempts = 0;
                self.failure = None;
            }
            ChannelEvent::Frame(raw) => match parse_server_message(&raw) {
                Ok(message) => self.apply_message(message),
                Err(error) => warn!(error = %format!("{error:#}"), "dropping malformed frame"),
            },
            ChannelEvent::Closed(reason) => self.handle_close(reason, now),
        }
    }

    fn handle_close(&mut self, reason: Option<String>, now: Instant) {
        self.channel = None;
        if self.torn_down {
            return;
        }

        let reason = reason.unwrap_or_else(|| "connection closed".to_owned());
        if !self.backoff.allows(self.attempts + 1) {
            let message = format!(
                "Lost connection to {} after {} reconnect attempts ({reason}). Reconnect manually.",
                self.connector.describe(),
                self.backoff.max_attempts()
            );
            error!(%message, "giving up on push channel");
            self.state = ConnectionState::Failed;
            self.failure = Some(message);
            return;
        }

        self.attempts += 1;
        let delay = self.backoff.delay_for(self.attempts);
        warn!(
            %reason,
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "push channel lost, reconnect scheduled"
        );
        self.state = ConnectionState::Closed;
        self.reconnect_timer = Some(self.reconnect.schedule((), now + delay));
    }

    pub fn apply_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::StateUpdate {
                mode,
                data,
                timestep,
            } => {
                if self.mode == Mode::Simulation {
                    self.replace_snapshot(*data);
                } else {
                    debug!(
                        tagged = mode.label(),
                        timestep = timestep.unwrap_or(data.timestep),
                        "state update discarded during training"
                    );
                }
            }
            ServerMessage::TrainingStart { timestep } => {
                info!(timestep, "training window started");
                self.mode = Mode::Training;
                self.training_since = Some(timestep);
            }
            ServerMessage::TrainingEnd { timestep, data } => {
                info!(timestep, "training window ended");
                self.mode = Mode::Simulation;
                self.training_since = None;
                if let Some(data) = data {
                    self.replace_snapshot(*data);
                }
            }
            ServerMessage::Error { message } => {
                warn!(%message, "remote reported an error");
                self.remote_error = Some(message);
            }
        }
    }

    /// Snapshot obtained outside the push channel (startup / after create);
    /// gated the same way as a pushed update.
    pub fn apply_fetched(&mut self, snapshot: Snapshot) -> bool {
        if self.mode != Mode::Simulation {
            debug!("fetched snapshot discarded during training");
            return false;
        }
        self.replace_snapshot(snapshot);
        true
    }

    fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(Arc::new(snapshot));
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn training_since(&self) -> Option<u64> {
        self.training_since
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_in(&self, now: Instant) -> Option<Duration> {
        self.reconnect
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn take_remote_error(&mut self) -> Option<String> {
        self.remote_error.take()
    }

    pub fn endpoint(&self) -> String {
        self.connector.describe()
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc::{self, Sender};

    use super::*;

    #[derive(Clone, Default)]
    struct ScriptedConnector {
        senders: Rc<RefCell<Vec<Sender<ChannelEvent>>>>,
        handles: Rc<RefCell<Vec<ShutdownHandle>>>,
    }

    impl ScriptedConnector {
        fn connects(&self) -> usize {
            self.senders.borrow().len()
        }

        fn latest(&self) -> Sender<ChannelEvent> {
            self.senders
                .borrow()
                .last()
                .cloned()
                .expect("a channel was opened")
        }

        fn latest_handle(&self) -> ShutdownHandle {
            self.handles
                .borrow()
                .last()
                .cloned()
                .expect("a channel was opened")
        }
    }

    impl Connector for ScriptedConnector {
        fn connect(&self) -> Channel {
            let (tx, rx) = mpsc::channel();
            let shutdown = ShutdownHandle::default();
            self.senders.borrow_mut().push(tx);
            self.handles.borrow_mut().push(shutdown.clone());
            Channel::new(rx, shutdown)
        }

        fn describe(&self) -> String {
            "scripted".to_owned()
        }
    }

    fn synchronizer(max_attempts: u32) -> (Synchronizer, ScriptedConnector) {
        let connector = ScriptedConnector::default();
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1_000), max_attempts);
        let mut sync = Synchronizer::new(Box::new(connector.clone()), backoff);
        sync.start();
        (sync, connector)
    }

    fn update_frame(mode: &str, timestep: u64) -> String {
        format!(
            r#"{{"type":"state_update","mode":"{mode}","timestep":{timestep},"data":{{"timestep":{timestep},"nodes":[{{"id":"a"}}]}}}}"#
        )
    }

    fn send(connector: &ScriptedConnector, event: ChannelEvent) {
        connector.latest().send(event).expect("channel is live");
    }

    #[test]
    fn single_channel_on_start() {
        let (mut sync, connector) = synchronizer(3);
        sync.start();
        assert_eq!(connector.connects(), 1);
        assert_eq!(sync.state(), ConnectionState::Connecting);

        send(&connector, ChannelEvent::Opened);
        sync.poll(Instant::now());
        assert_eq!(sync.state(), ConnectionState::Open);
    }

    #[test]
    fn simulation_updates_apply_in_arrival_order() {
        let (mut sync, connector) = synchronizer(3);
        send(&connector, ChannelEvent::Opened);
        send(&connector, ChannelEvent::Frame(update_frame("simulation", 1)));
        send(&connector, ChannelEvent::Frame(update_frame("simulation", 2)));

        assert!(sync.poll(Instant::now()));
        assert_eq!(sync.revision(), 2);
        assert_eq!(sync.snapshot().map(|s| s.timestep), Some(2));
    }

    #[test]
    fn training_mode_discards_updates_until_training_end() {
        let (mut sync, connector) = synchronizer(3);
        send(&connector, ChannelEvent::Opened);
        send(&connector, ChannelEvent::Frame(update_frame("simulation", 1)));
        sync.poll(Instant::now());

        send(
            &connector,
            ChannelEvent::Frame(r#"{"type":"training_start","timestep":1}"#.to_owned()),
        );
        send(&connector, ChannelEvent::Frame(update_frame("training", 50)));
        assert!(!sync.poll(Instant::now()));
        assert_eq!(sync.mode(), Mode::Training);
        assert_eq!(sync.training_since(), Some(1));
        assert_eq!(sync.snapshot().map(|s| s.timestep), Some(1));
        assert!(!sync.apply_fetched(Snapshot::default()));

        send(
            &connector,
            ChannelEvent::Frame(
                r#"{"type":"training_end","timestep":900,"data":{"timestep":900}}"#.to_owned(),
            ),
        );
        assert!(sync.poll(Instant::now()));
        assert_eq!(sync.mode(), Mode::Simulation);
        assert_eq!(sync.snapshot().map(|s| s.timestep), Some(900));
    }

    #[test]
    fn training_end_without_snapshot_keeps_previous_state() {
        let (mut sync, connector) = synchronizer(3);
        send(&connector, ChannelEvent::Frame(update_frame("simulation", 4)));
        send(
            &connector,
            ChannelEvent::Frame(r#"{"type":"training_start","timestep":4}"#.to_owned()),
        );
        send(
            &connector,
            ChannelEvent::Frame(r#"{"type":"training_end","timestep":10}"#.to_owned()),
        );
        sync.poll(Instant::now());
        assert_eq!(sync.mode(), Mode::Simulation);
        assert_eq!(sync.revision(), 1);
        assert_eq!(sync.snapshot().map(|s| s.timestep), Some(4));
    }

    #[test]
    fn malformed_frames_leave_state_untouched() {
        let (mut sync, connector) = synchronizer(3);
        send(&connector, ChannelEvent::Frame(update_frame("simulation", 7)));
        send(&connector, ChannelEvent::Frame("{not json".to_owned()));
        send(
            &connector,
            ChannelEvent::Frame(r#"{"type":"state_update","data":{"nodes":"oops"}}"#.to_owned()),
        );
        sync.poll(Instant::now());
        assert_eq!(sync.revision(), 1);
        assert_eq!(sync.snapshot().map(|s| s.timestep), Some(7));
    }

    #[test]
    fn remote_errors_are_surfaced_once() {
        let (mut sync, connector) = synchronizer(3);
        send(
            &connector,
            ChannelEvent::Frame(r#"{"type":"error","message":"optimizer crashed"}"#.to_owned()),
        );
        sync.poll(Instant::now());
        assert_eq!(sync.take_remote_error().as_deref(), Some("optimizer crashed"));
        assert_eq!(sync.take_remote_error(), None);
    }

    #[test]
    fn backoff_grows_then_gives_up() {
        let max_attempts = 4;
        let (mut sync, connector) = synchronizer(max_attempts);
        let mut now = Instant::now();
        let mut delays = Vec::new();

        for _ in 0..max_attempts {
            send(&connector, ChannelEvent::Closed(Some("refused".to_owned())));
            sync.poll(now);
            assert_eq!(sync.state(), ConnectionState::Closed);
            let delay = sync.reconnect_in(now).expect("reconnect scheduled");
            delays.push(delay);

            let connects_before = connector.connects();
            sync.poll(now + delay - Duration::from_millis(1));
            assert_eq!(connector.connects(), connects_before);

            now += delay;
            sync.poll(now);
            assert_eq!(connector.connects(), connects_before + 1);
            assert_eq!(sync.state(), ConnectionState::Connecting);
        }

        for pair in delays.windows(2) {
            assert!(pair[1] > pair[0], "delays must grow: {delays:?}");
        }

        send(&connector, ChannelEvent::Closed(None));
        sync.poll(now);
        assert_eq!(sync.state(), ConnectionState::Failed);
        assert!(sync.failure().is_some());
        assert_eq!(sync.reconnect_in(now), None);

        let connects = connector.connects();
        sync.poll(now + Duration::from_secs(3_600));
        assert_eq!(connector.connects(), connects);
    }

    #[test]
    fn successful_open_resets_the_attempt_counter() {
        let (mut sync, connector) = synchronizer(2);
        let now = Instant::now();
        send(&connector, ChannelEvent::Closed(None));
        sync.poll(now);
        assert_eq!(sync.attempts(), 1);

        sync.poll(now + Duration::from_secs(5));
        send(&connector, ChannelEvent::Opened);
        sync.poll(now + Duration::from_secs(5));
        assert_eq!(sync.attempts(), 0);
        assert_eq!(sync.state(), ConnectionState::Open);
    }

    #[test]
    fn teardown_cancels_pending_reconnect() {
        let (mut sync, connector) = synchronizer(5);
        let now = Instant::now();
        send(&connector, ChannelEvent::Closed(None));
        sync.poll(now);
        assert!(sync.reconnect_in(now).is_some());

        sync.disconnect();
        assert_eq!(sync.reconnect_in(now), None);
        sync.poll(now + Duration::from_secs(60));
        assert_eq!(connector.connects(), 1);
        assert_eq!(sync.state(), ConnectionState::Closed);
    }

    #[test]
    fn teardown_closes_live_socket_without_reconnecting() {
        let (mut sync, connector) = synchronizer(5);
        send(&connector, ChannelEvent::Opened);
        sync.poll(Instant::now());
        let handle = connector.latest_handle();

        sync.disconnect();
        assert!(handle.is_closed());
        sync.poll(Instant::now() + Duration::from_secs(60));
        assert_eq!(connector.connects(), 1);
    }

    #[test]
    fn manual_restart_after_failure() {
        let (mut sync, connector) = synchronizer(0);
        send(&connector, ChannelEvent::Closed(None));
        sync.poll(Instant::now());
        assert_eq!(sync.state(), ConnectionState::Failed);

        sync.restart();
        assert_eq!(connector.connects(), 2);
        assert_eq!(sync.state(), ConnectionState::Connecting);
        assert!(sync.failure().is_none());
    }
}
