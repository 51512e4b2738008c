//! Unix-socket node publisher
//!
//! Each registered minor is published as a Unix domain socket at
//! `<dir>/razer<minor>`. Callers connect and speak the wire protocol;
//! every connection gets its own serving thread so one slow caller
//! cannot stall another device's node.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};
use zerocopy::{FromBytes, IntoBytes};

use razer_mux::{node_name, DeviceSession, Minor, MuxError, NodePublisher};

use crate::wire::{self, RequestHeader, ResponseHeader};

struct PublishedNode {
    path: PathBuf,
    shutdown: Arc<AtomicBool>,
    accept_thread: JoinHandle<()>,
}

/// Publishes sessions as Unix sockets under one runtime directory.
pub struct SocketPublisher {
    dir: PathBuf,
    nodes: Mutex<HashMap<Minor, PublishedNode>>,
}

impl SocketPublisher {
    /// Create the publisher, claiming the runtime directory.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            nodes: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl NodePublisher for SocketPublisher {
    fn publish(&self, minor: Minor, session: DeviceSession) -> Result<(), MuxError> {
        let path = self.dir.join(node_name(minor));
        // A stale node from an unclean shutdown would make the bind fail.
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path)
            .map_err(|e| MuxError::PublicationFault(format!("{}: {e}", path.display())))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_thread = {
            let shutdown = shutdown.clone();
            let path = path.clone();
            std::thread::Builder::new()
                .name(node_name(minor))
                .spawn(move || accept_loop(listener, session, shutdown, path))
                .map_err(|e| MuxError::PublicationFault(e.to_string()))?
        };

        self.nodes.lock().unwrap().insert(
            minor,
            PublishedNode {
                path: path.clone(),
                shutdown,
                accept_thread,
            },
        );
        info!("published {}", path.display());
        Ok(())
    }

    fn unpublish(&self, minor: Minor) {
        let Some(node) = self.nodes.lock().unwrap().remove(&minor) else {
            return;
        };

        // Wake the accept loop, then take the name away.
        node.shutdown.store(true, Ordering::SeqCst);
        let _ = UnixStream::connect(&node.path);
        let _ = std::fs::remove_file(&node.path);

        if node.accept_thread.join().is_err() {
            warn!("accept thread for minor {} panicked", minor);
        }
        info!("unpublished {}", node.path.display());
    }
}

impl Drop for SocketPublisher {
    fn drop(&mut self) {
        let minors: Vec<Minor> = self.nodes.lock().unwrap().keys().copied().collect();
        for minor in minors {
            self.unpublish(minor);
        }
    }
}

fn accept_loop(
    listener: UnixListener,
    session: DeviceSession,
    shutdown: Arc<AtomicBool>,
    path: PathBuf,
) {
    for conn in listener.incoming() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match conn {
            Ok(stream) => {
                let session = session.clone();
                std::thread::spawn(move || {
                    if let Err(e) = serve_connection(stream, &session) {
                        debug!("connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                warn!("accept failed on {}: {}", path.display(), e);
                break;
            }
        }
    }
    debug!("accept loop for {} stopped", path.display());
}

enum ReportReply {
    Data(Vec<u8>),
    Written(usize),
}

/// Serve wire-protocol requests until the caller hangs up.
fn serve_connection(mut stream: UnixStream, session: &DeviceSession) -> std::io::Result<()> {
    loop {
        let mut hdr_buf = [0u8; wire::REQUEST_HEADER_LEN];
        if let Err(e) = stream.read_exact(&mut hdr_buf) {
            // EOF between requests is a normal hang-up.
            return match e.kind() {
                std::io::ErrorKind::UnexpectedEof => Ok(()),
                _ => Err(e),
            };
        }
        let header = match RequestHeader::read_from_bytes(&hdr_buf[..]) {
            Ok(h) => h,
            Err(_) => {
                respond(
                    &mut stream,
                    Err(MuxError::InvalidRequest("malformed header".into())),
                )?;
                return Ok(());
            }
        };
        let req = header.to_io_request();

        let result = match header.op {
            wire::op::READ => session.read(&req).map(ReportReply::Data),
            wire::op::WRITE => {
                let count = header.count.get() as usize;
                if count > wire::MAX_PAYLOAD {
                    // Don't drain absurd payloads; reject and drop the
                    // connection so the stream cannot desynchronize.
                    respond(
                        &mut stream,
                        Err(MuxError::InvalidRequest(format!(
                            "count={count} exceeds maximum payload"
                        ))),
                    )?;
                    return Ok(());
                }
                let mut payload = vec![0u8; count];
                if let Err(e) = stream.read_exact(&mut payload) {
                    warn!("{}", MuxError::FaultyCopy(e.to_string()));
                    return Err(e);
                }
                session.write(&req, &payload).map(ReportReply::Written)
            }
            other => Err(MuxError::InvalidRequest(format!("unknown op {other}"))),
        };

        respond(&mut stream, result)?;
    }
}

fn respond(stream: &mut UnixStream, result: Result<ReportReply, MuxError>) -> std::io::Result<()> {
    match result {
        Ok(ReportReply::Data(data)) => {
            stream.write_all(ResponseHeader::ok(data.len() as u32).as_bytes())?;
            stream.write_all(&data)?;
        }
        Ok(ReportReply::Written(n)) => {
            stream.write_all(ResponseHeader::ok(n as u32).as_bytes())?;
        }
        Err(e) => {
            stream.write_all(ResponseHeader::error(wire::status_of(&e)).as_bytes())?;
        }
    }
    stream.flush()
}
