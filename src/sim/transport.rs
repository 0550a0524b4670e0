use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use super::protocol::{Request, Response};

pub trait Transport: Send + Sync {
    fn round_trip(&self, request: &Request) -> Result<Response>;
}

pub(crate) fn connect_stream(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;
    for socket_addr in addr
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {addr}"))?
    {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }

    match last_error {
        Some(error) => Err(error).with_context(|| format!("failed to connect to {addr}")),
        None => Err(anyhow!("{addr} did not resolve to any socket address")),
    }
}

pub struct TcpTransport {
    addr: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpTransport {
    pub fn new(addr: String, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            addr,
            connect_timeout,
            read_timeout,
        }
    }
}

impl Transport for TcpTransport {
    fn round_trip(&self, request: &Request) -> Result<Response> {
        let mut stream = connect_stream(&self.addr, self.connect_timeout)?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .context("failed to set command read timeout")?;

        let mut line = serde_json::to_string(request).context("failed to encode request")?;
        line.push('\n');
        stream
            .write_all(line.as_bytes())
            .with_context(|| format!("failed to send {} to {}", request.kind(), self.addr))?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        let read = reader
            .read_line(&mut response_line)
            .with_context(|| format!("no response to {} from {}", request.kind(), self.addr))?;
        if read == 0 {
            return Err(anyhow!(
                "{} closed the connection before answering {}",
                self.addr,
                request.kind()
            ));
        }

        serde_json::from_str(response_line.trim())
            .with_context(|| format!("invalid response to {}", request.kind()))
    }
}
