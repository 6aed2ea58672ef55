// Long-lived socket client for the PhotoBox push protocol.
//
// The receive loop only parses and logs; downloads run on a separate worker
// fed through a queue, so a slow transfer never starves protocol reception.
// Log order still equals physical arrival order because each line is mirrored
// to the sink before anything else happens.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::TAKE_PHOTO_COMMAND;
use crate::device::protocol::{self, ArtifactKind, DeviceMessage};
use crate::download::{unpack, Downloader};
use crate::error::ConnectorError;
use crate::log::SharedSink;
use crate::store::readiness::ReadinessDetector;

/// Invoked exactly once per session when its artifact set is complete.
pub trait SessionDispatch: Send + Sync {
    fn session_ready(&self, session_id: &str, dir: &Path);
}

struct DownloadJob {
    kind: ArtifactKind,
    session_id: String,
    url: String,
}

/// One TCP connection to the device. `connect` starts the receive loop and the
/// download worker; `disconnect` cancels both without relying on a forced
/// kill — the cancellation token unblocks the pending read.
pub struct DeviceClient {
    host: String,
    port: u16,
    sink: SharedSink,
    downloader: Arc<Downloader>,
    readiness: Arc<ReadinessDetector>,
    dispatch: Arc<dyn SessionDispatch>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl DeviceClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        downloader: Arc<Downloader>,
        readiness: Arc<ReadinessDetector>,
        dispatch: Arc<dyn SessionDispatch>,
        sink: SharedSink,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            sink,
            downloader,
            readiness,
            dispatch,
            writer: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    /// Open the socket, send the handshake and start the receive loop.
    pub async fn connect(&self) -> Result<()> {
        self.sink
            .log(&format!("Connecting to {}:{}", self.host, self.port));

        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                self.sink.log(&format!("Connection failed: {e}"));
                anyhow!(ConnectorError::Transport(e.to_string()))
            })?;
        let (read_half, mut write_half) = stream.into_split();

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        write_half
            .write_all(format!("time:{millis}\n").as_bytes())
            .await?;

        let cancel = CancellationToken::new();
        let (job_tx, job_rx) = mpsc::unbounded_channel();

        tokio::spawn(receive_loop(
            read_half,
            job_tx,
            self.sink.clone(),
            cancel.clone(),
        ));
        tokio::spawn(download_worker(
            job_rx,
            self.downloader.clone(),
            self.readiness.clone(),
            self.dispatch.clone(),
            self.sink.clone(),
            cancel.clone(),
        ));

        *self.writer.lock().await = Some(write_half);
        *self.cancel.lock().await = Some(cancel);
        Ok(())
    }

    /// Send the capture-trigger command word.
    pub async fn take_photo(&self) -> Result<()> {
        self.send(TAKE_PHOTO_COMMAND).await
    }

    async fn send(&self, message: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| anyhow!("not connected"))?;
        writer.write_all(message.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Stop the receive loop and close the socket. Safe to call while the loop
    /// is blocked in a read.
    pub async fn disconnect(&self) {
        self.sink
            .log(&format!("Disconnecting from {}:{}", self.host, self.port));
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        // Dropping the write half closes our side of the socket.
        self.writer.lock().await.take();
    }
}

async fn receive_loop(
    read_half: OwnedReadHalf,
    job_tx: mpsc::UnboundedSender<DownloadJob>,
    sink: SharedSink,
    cancel: CancellationToken,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                sink.log("Connection closed by device");
                break;
            }
            Err(e) => {
                // Transport errors end the session; reconnecting is an
                // explicit user action.
                sink.log(&format!("Read error: {e}"));
                error!("device read error: {e}");
                break;
            }
        };

        // Mirrored before any dispatch so the log reflects receipt order.
        sink.log(&format!("Received: {line}"));

        match protocol::parse_line(&line) {
            DeviceMessage::Heartbeat => {}
            DeviceMessage::Artifact {
                kind,
                session_id,
                url,
            } => {
                let noun = match kind {
                    ArtifactKind::PhotoZip => "Photos",
                    ArtifactKind::Aruco => "Aruco",
                    ArtifactKind::Marker => "Marker",
                    ArtifactKind::Meta => "Meta",
                };
                sink.log(&format!("{noun} downloading: {session_id}"));
                if job_tx
                    .send(DownloadJob {
                        kind,
                        session_id,
                        url,
                    })
                    .is_err()
                {
                    break;
                }
            }
            DeviceMessage::Unknown(raw) => {
                sink.log(&format!("Unknown message: {raw}"));
            }
        }
    }
    debug!("receive loop stopped");
}

async fn download_worker(
    mut job_rx: mpsc::UnboundedReceiver<DownloadJob>,
    downloader: Arc<Downloader>,
    readiness: Arc<ReadinessDetector>,
    dispatch: Arc<dyn SessionDispatch>,
    sink: SharedSink,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = job_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        if let Err(e) = run_job(&job, &downloader, &readiness, &dispatch).await {
            sink.log(&format!(
                "{}: failed to fetch {}: {e}",
                job.session_id, job.url
            ));
        }
    }
    debug!("download worker stopped");
}

async fn run_job(
    job: &DownloadJob,
    downloader: &Downloader,
    readiness: &ReadinessDetector,
    dispatch: &Arc<dyn SessionDispatch>,
) -> crate::error::Result<()> {
    let filename = protocol::filename_from_url(&job.url);
    let path = downloader
        .download(&job.url, &job.session_id, filename)
        .await?;
    if job.kind.is_archive() {
        unpack::unpack(&path)?;
    }

    let dir = downloader.store().session_dir(&job.session_id)?;
    if readiness.check(&job.session_id, &dir) {
        dispatch.session_ready(&job.session_id, &dir);
    }
    Ok(())
}
