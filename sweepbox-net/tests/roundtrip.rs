//! Socket-level round trips against a live server.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sweepbox_net::framing::{read_line, write_line};
use sweepbox_net::{CommandHandler, CommandServer};
use sweepbox_types::{CommandError, Reply, Request};

struct EchoHandler;

impl CommandHandler for EchoHandler {
    fn handle(&self, request: Request) -> Result<Reply, CommandError> {
        match request {
            Request::Ping => Ok(Reply::line("pong")),
            Request::Start => Ok(Reply::Ack),
            Request::Speed(ms) => Ok(Reply::Line(format!("SPEED {ms}"))),
            _ => Err(CommandError::Invalid("unhandled in test".into())),
        }
    }
}

fn start_server() -> std::net::SocketAddr {
    let server = CommandServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        let _ = server.serve(Arc::new(EchoHandler));
    });
    addr
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        Self {
            reader,
            writer: BufWriter::new(stream),
        }
    }

    fn request(&mut self, line: &str) -> String {
        write_line(&mut self.writer, line).unwrap();
        read_line(&mut self.reader).unwrap().unwrap()
    }
}

#[test]
fn requests_get_matching_response_lines() {
    let addr = start_server();
    let mut client = Client::connect(addr);

    assert_eq!(client.request("PING"), "OK pong");
    assert_eq!(client.request("START"), "OK");
    assert_eq!(client.request("SPEED 250"), "OK SPEED 250");
    assert_eq!(client.request("WARP 9"), "ERR unknown command");
}

#[test]
fn legacy_prefix_and_blank_lines_are_tolerated() {
    let addr = start_server();
    let mut client = Client::connect(addr);

    assert_eq!(client.request("CMD: PING"), "OK pong");

    // A blank line produces no response; the next real request answers.
    write_line(&mut client.writer, "").unwrap();
    assert_eq!(client.request("PING"), "OK pong");
}

#[test]
fn connections_are_independent() {
    let addr = start_server();
    let mut first = Client::connect(addr);
    let mut second = Client::connect(addr);

    assert_eq!(first.request("PING"), "OK pong");
    assert_eq!(second.request("PING"), "OK pong");
    drop(first);
    assert_eq!(second.request("SPEED 50"), "OK SPEED 50");
}
