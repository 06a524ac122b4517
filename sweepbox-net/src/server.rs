//! TCP command server.
//!
//! One accept loop, one service thread per connection. Requests are handled
//! synchronously in connection order; shared-state consistency comes from
//! the record locks underneath the handler, not from anything here.

use std::io::{self, BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use sweepbox_types::{CommandError, Reply, Request};

use crate::framing::{read_line, write_line};
use crate::protocol::{parse_request, render_response};

/// Legacy clients prefix request lines with this marker.
const CMD_PREFIX: &str = "CMD: ";

/// The daemon side of the wire: one typed request in, one result out.
pub trait CommandHandler: Send + Sync + 'static {
    fn handle(&self, request: Request) -> Result<Reply, CommandError>;
}

impl<F> CommandHandler for F
where
    F: Fn(Request) -> Result<Reply, CommandError> + Send + Sync + 'static,
{
    fn handle(&self, request: Request) -> Result<Reply, CommandError> {
        self(request)
    }
}

pub struct CommandServer {
    listener: TcpListener,
}

impl CommandServer {
    pub fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!(target: "net", "command server listening on {}", addr);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, spawning a service thread per client.
    pub fn serve(self, handler: Arc<dyn CommandHandler>) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept()?;
            info!(target: "net", "client connected from {}", peer);
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                if let Err(e) = serve_client(stream, handler.as_ref()) {
                    if e.kind() != io::ErrorKind::UnexpectedEof {
                        warn!(target: "net", "client {} error: {}", peer, e);
                    }
                }
                info!(target: "net", "client {} disconnected", peer);
            });
        }
    }
}

fn serve_client(stream: TcpStream, handler: &dyn CommandHandler) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    while let Some(line) = read_line(&mut reader)? {
        let line = line.strip_prefix(CMD_PREFIX).unwrap_or(&line).trim();
        if line.is_empty() {
            continue;
        }

        let result = parse_request(line).and_then(|request| handler.handle(request));
        write_line(&mut writer, &render_response(&result))?;
    }
    Ok(())
}
