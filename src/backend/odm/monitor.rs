// Job monitoring — a webhook listener and a polling fallback race toward the
// same job; the terminal transition is guarded so only one path fires it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ConnectorError, Result};
use crate::log::SharedSink;

use super::api::OdmApi;
use super::status::{JobState, TaskStatus};

/// How many ports above the preferred one the listener will try.
const BIND_ATTEMPTS: u16 = 32;

#[derive(Debug, Deserialize)]
struct WebhookStatus {
    code: i64,
}

/// POST body of the backend's completion callback.
#[derive(Debug, Deserialize)]
struct WebhookBody {
    uuid: String,
    status: WebhookStatus,
}

#[derive(Deserialize)]
struct PollStatus {
    #[serde(default)]
    code: i64,
}

/// Response of `GET /task/{uuid}/info?with_output={n}`.
#[derive(Deserialize)]
struct TaskInfo {
    #[serde(default)]
    status: Option<PollStatus>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    output: Vec<String>,
}

struct MonitorInner {
    uuid: String,
    state: JobState,
    sink: SharedSink,
    cancel: CancellationToken,
    /// Count of output lines already consumed; sent as the poll watermark.
    output_watermark: AtomicUsize,
}

impl MonitorInner {
    /// Shared by both notification paths. Returns once the job reaches a
    /// terminal state; the winning path logs and stops the poller.
    fn observe(&self, status: TaskStatus) {
        if !self.state.try_finish(status) {
            return;
        }
        match status {
            TaskStatus::Completed => self.sink.log(&format!("Task {} is done", self.uuid)),
            TaskStatus::Canceled => self.sink.log(&format!("Task {} was canceled", self.uuid)),
            _ => self.sink.log(&format!("Task {} failed", self.uuid)),
        }
        self.cancel.cancel();
    }
}

/// Tracks one submitted job until a terminal status arrives over either path.
pub struct JobMonitor {
    inner: Arc<MonitorInner>,
    webhook_port: u16,
}

impl JobMonitor {
    /// Start the webhook listener (walking up from `preferred_port` on bind
    /// conflicts) and the 1 Hz status poller.
    pub async fn start(
        api: Arc<OdmApi>,
        uuid: String,
        preferred_port: u16,
        poll_period: Duration,
        sink: SharedSink,
    ) -> Result<Self> {
        let inner = Arc::new(MonitorInner {
            uuid,
            state: JobState::new(),
            sink,
            cancel: CancellationToken::new(),
            output_watermark: AtomicUsize::new(0),
        });

        let (listener, webhook_port) = bind_webhook(preferred_port).await?;
        inner
            .sink
            .log(&format!("Webhook listening on port {webhook_port}"));

        let app = Router::new()
            .route("/webhook", post(handle_webhook))
            .with_state(inner.clone());
        let cancel = inner.cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                })
                .await
                .ok();
        });

        tokio::spawn(poll_loop(api, inner.clone(), poll_period));

        Ok(Self {
            inner,
            webhook_port,
        })
    }

    pub fn webhook_port(&self) -> u16 {
        self.webhook_port
    }

    pub fn uuid(&self) -> &str {
        &self.inner.uuid
    }

    /// Terminal status, once one was observed.
    pub fn finished(&self) -> Option<TaskStatus> {
        self.inner.state.finished()
    }

    /// Wait until a terminal status stops the monitor.
    pub async fn done(&self) {
        self.inner.cancel.cancelled().await;
    }

    /// Stop both notification paths without a terminal status.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

async fn bind_webhook(preferred_port: u16) -> Result<(TcpListener, u16)> {
    let mut port = preferred_port;
    for _ in 0..BIND_ATTEMPTS {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => {
                let bound = listener.local_addr()?.port();
                return Ok((listener, bound));
            }
            Err(e) => {
                debug!(port, "webhook bind failed: {e}");
                port = port.wrapping_add(1);
            }
        }
    }
    Err(ConnectorError::Transport(format!(
        "no free webhook port in {preferred_port}..{port}"
    )))
}

async fn handle_webhook(
    State(inner): State<Arc<MonitorInner>>,
    Json(body): Json<WebhookBody>,
) -> &'static str {
    inner.sink.log("Received webhook");
    if body.uuid != inner.uuid {
        inner
            .sink
            .log(&format!("Webhook for unknown task {}", body.uuid));
        return "ok";
    }
    let status = TaskStatus::from_code(body.status.code);
    if status.is_terminal() {
        inner.observe(status);
    } else {
        inner
            .sink
            .log(&format!("Task {}: status code {}", body.uuid, body.status.code));
    }
    "ok"
}

async fn poll_loop(api: Arc<OdmApi>, inner: Arc<MonitorInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if let Err(e) = poll_once(&api, &inner).await {
            // Transient poll failures are logged; the webhook path and the
            // next tick still cover us.
            inner
                .sink
                .log(&format!("Task {}: poll failed: {e}", inner.uuid));
        }
    }
    debug!(uuid = %inner.uuid, "poller stopped");
}

async fn poll_once(api: &OdmApi, inner: &MonitorInner) -> Result<()> {
    let consumed = inner.output_watermark.load(Ordering::Relaxed);
    let value = api
        .get_json(&format!(
            "/task/{}/info?with_output={consumed}",
            inner.uuid
        ))
        .await?;
    let info: TaskInfo = serde_json::from_value(value)
        .map_err(|e| ConnectorError::Protocol(format!("bad task info: {e}")))?;

    // Only lines past the watermark come back; log them and advance.
    for line in &info.output {
        inner.sink.log(line);
    }
    inner
        .output_watermark
        .fetch_add(info.output.len(), Ordering::Relaxed);

    if let Some(status) = info.status {
        let status = TaskStatus::from_code(status.code);
        if status == TaskStatus::Running {
            if let Some(progress) = info.progress {
                inner.sink.log(&format!("Progress: {progress}%"));
            }
        }
        if status.is_terminal() {
            inner.observe(status);
        }
    }
    Ok(())
}
