use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use crate::sim::{ClientMessage, connect_stream};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Frame(String),
    Closed(Option<String>),
}

/// Shared between a channel and its worker; closing it shuts the socket
/// down and silences the worker.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    closed: Arc<AtomicBool>,
    stream: Arc<Mutex<Option<TcpStream>>>,
}

impl ShutdownHandle {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.stream.lock()
            && let Some(stream) = slot.take()
        {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn attach(&self, stream: &TcpStream) -> bool {
        let Ok(mut slot) = self.stream.lock() else {
            return false;
        };
        if self.is_closed() {
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }
        match stream.try_clone() {
            Ok(clone) => {
                *slot = Some(clone);
                true
            }
            Err(error) => {
                warn!(%error, "failed to keep a handle on the push socket");
                false
            }
        }
    }
}

/// One logical connection. Dropping it closes the underlying socket.
pub struct Channel {
    events: Receiver<ChannelEvent>,
    shutdown: ShutdownHandle,
}

impl Channel {
    pub fn new(events: Receiver<ChannelEvent>, shutdown: ShutdownHandle) -> Self {
        Self { events, shutdown }
    }

    pub(super) fn events(&self) -> &Receiver<ChannelEvent> {
        &self.events
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.shutdown.close();
    }
}

pub trait Connector {
    fn connect(&self) -> Channel;

    fn describe(&self) -> String;
}

pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: String, connect_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> Channel {
        let (tx, rx) = mpsc::channel();
        let shutdown = ShutdownHandle::default();
        let worker_shutdown = shutdown.clone();
        let addr = self.addr.clone();
        let connect_timeout = self.connect_timeout;

        thread::spawn(move || {
            let reason = run_push_worker(&addr, connect_timeout, &worker_shutdown, &tx);
            if !worker_shutdown.is_closed() {
                let _ = tx.send(ChannelEvent::Closed(reason));
            }
        });

        Channel::new(rx, shutdown)
    }

    fn describe(&self) -> String {
        self.addr.clone()
    }
}

fn run_push_worker(
    addr: &str,
    connect_timeout: Duration,
    shutdown: &ShutdownHandle,
    tx: &Sender<ChannelEvent>,
) -> Option<String> {
    let mut stream = match connect_stream(addr, connect_timeout) {
        Ok(stream) => stream,
        Err(error) => return Some(format!("{error:#}")),
    };

    if !shutdown.attach(&stream) {
        return None;
    }
    if tx.send(ChannelEvent::Opened).is_err() {
        return None;
    }

    let hello = serde_json::to_string(&ClientMessage::RequestState)
        .context("failed to encode state request");
    let hello = match hello {
        Ok(line) => line,
        Err(error) => return Some(format!("{error:#}")),
    };
    if let Err(error) = stream
        .write_all(hello.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
    {
        return Some(format!("failed to request initial state: {error}"));
    }

    read_frames(BufReader::new(stream), shutdown, tx)
}

/// Forwards each non-blank line as a frame. Lines that are not UTF-8 are
/// dropped; only I/O errors and end of stream end the loop.
fn read_frames<R: BufRead>(
    mut reader: R,
    shutdown: &ShutdownHandle,
    tx: &Sender<ChannelEvent>,
) -> Option<String> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = match reader.read_until(b'\n', &mut buf) {
            Ok(read) => read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Some(format!("push channel read failed: {error}")),
        };
        if shutdown.is_closed() {
            return None;
        }
        if read == 0 {
            break;
        }

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(error) => {
                warn!(bytes = read, %error, "dropping push frame that is not UTF-8");
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if tx.send(ChannelEvent::Frame(line.to_owned())).is_err() {
            return None;
        }
    }

    debug!("push channel reached end of stream");
    Some("server closed the push channel".to_owned())
}
