//! The Session Server: accepts up to `max_clients` concurrent control
//! connections and runs each one's request/response loop on its own thread.
//!
//! Grounded in `original_source/server/server.py`.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::dispatcher::Dispatcher;
use crate::protocol::{parse_request, FrameReader, Response};

const FRAME_CAP_BYTES: usize = 1024 * 1024;
const RECV_BUF_SIZE: usize = 1024;

pub struct SessionServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    max_clients: usize,
    client_count: Arc<AtomicUsize>,
}

impl SessionServer {
    pub fn bind(port: u16, dispatcher: Arc<Dispatcher>, max_clients: usize) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        log::info!("control server listening on 0.0.0.0:{port}");
        Ok(Self {
            listener,
            dispatcher,
            max_clients,
            client_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The port actually bound (useful when constructed with port 0).
    pub fn listener_port(&self) -> u16 {
        self.listener.local_addr().expect("bound listener must have a local address").port()
    }

    /// Accepts connections forever, spawning a handler thread per client and
    /// immediately closing any connection past `max_clients`.
    pub fn run(&self) -> std::io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("accept error: {e}");
                    continue;
                }
            };

            if self.client_count.fetch_add(1, Ordering::AcqRel) >= self.max_clients {
                self.client_count.fetch_sub(1, Ordering::AcqRel);
                log::warn!("max clients reached; rejecting connection from {:?}", stream.peer_addr());
                drop(stream);
                continue;
            }

            let dispatcher = self.dispatcher.clone();
            let client_count = self.client_count.clone();
            thread::spawn(move || {
                handle_client(stream, &dispatcher);
                client_count.fetch_sub(1, Ordering::AcqRel);
            });
        }
        Ok(())
    }
}

fn handle_client(mut stream: TcpStream, dispatcher: &Dispatcher) {
    let peer = stream.peer_addr().ok();
    log::info!("client connected: {peer:?}");
    let mut reader = FrameReader::new(FRAME_CAP_BYTES);
    let mut recv_buf = vec![0u8; RECV_BUF_SIZE];

    loop {
        use std::io::Read;
        let n = match stream.read(&mut recv_buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                log::warn!("read error from {peer:?}: {e}");
                break;
            }
        };

        let value = match reader.push(&recv_buf[..n]) {
            Ok(Some(v)) => v,
            Ok(None) => continue,
            Err(e) => {
                let response = Response::from(&e);
                if write_response(&mut stream, &response).is_err() {
                    break;
                }
                continue;
            }
        };

        let response = match parse_request(value) {
            Ok(request) => match dispatcher.dispatch(request) {
                Ok(result) => Response::ok(result),
                Err(e) => Response::from(&e),
            },
            Err(e) => Response::from(&e),
        };

        if write_response(&mut stream, &response).is_err() {
            break;
        }
    }

    log::info!("client disconnected: {peer:?}");
}

fn write_response(stream: &mut TcpStream, response: &Response) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(response).expect("response must serialize");
    stream.write_all(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySongLibrary, SilentSink};
    use crate::buffer::RecordingStrip;
    use std::io::Read;
    use std::net::TcpStream as ClientStream;

    fn spawn_test_server(max_clients: usize) -> (u16, Arc<AtomicUsize>) {
        let dispatcher = Arc::new(
            Dispatcher::new(
                4,
                Box::new(RecordingStrip::new(4)),
                0,
                Box::new(SilentSink::default()),
                Box::new(InMemorySongLibrary::default()),
            )
            .unwrap(),
        );
        let server = SessionServer::bind(0, dispatcher, max_clients).unwrap();
        let port = server.listener.local_addr().unwrap().port();
        let count = server.client_count.clone();
        thread::spawn(move || {
            let _ = server.run();
        });
        (port, count)
    }

    #[test]
    fn unknown_method_round_trips_over_the_wire() {
        let (port, _count) = spawn_test_server(100);
        let mut stream = ClientStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(br#"{"method":"nope","params":{}}"#).unwrap();
        stream.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.contains("\"error\""));
        assert!(text.contains("-32601"));
    }

    #[test]
    fn solid_color_round_trips_over_the_wire() {
        let (port, _count) = spawn_test_server(100);
        let mut stream = ClientStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(br#"{"method":"set_light","params":{"color":"0xFF0000"}}"#).unwrap();
        stream.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.contains("\"result\":true"));
    }
}
