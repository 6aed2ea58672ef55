// Job monitor behavior: status polling with an output watermark, and the
// webhook listener's port walk on bind conflicts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use photobox_connector::backend::odm::api::OdmApi;
use photobox_connector::backend::odm::monitor::JobMonitor;
use photobox_connector::backend::odm::status::TaskStatus;
use photobox_connector::log::MemorySink;

struct NodeState {
    status_code: AtomicI64,
    output: Mutex<Vec<String>>,
    watermarks: Mutex<Vec<usize>>,
}

async fn task_info(
    State(state): State<Arc<NodeState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let consumed: usize = params
        .get("with_output")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    state.watermarks.lock().push(consumed);

    let output = state.output.lock();
    let fresh: Vec<String> = output.iter().skip(consumed).cloned().collect();
    Json(json!({
        "status": {"code": state.status_code.load(Ordering::Relaxed)},
        "progress": 10.0,
        "output": fresh,
    }))
}

async fn start_node(state: Arc<NodeState>) -> u16 {
    let app = Router::new()
        .route("/task/{uuid}/info", get(task_info))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    port
}

#[tokio::test]
async fn poller_logs_each_output_line_once_and_stops_on_terminal_status() {
    let node = Arc::new(NodeState {
        status_code: AtomicI64::new(20),
        output: Mutex::new(vec!["stage 1".to_string(), "stage 2".to_string()]),
        watermarks: Mutex::new(Vec::new()),
    });
    let port = start_node(node.clone()).await;

    let api = Arc::new(OdmApi::new(format!("http://127.0.0.1:{port}")));
    let sink = Arc::new(MemorySink::new());
    let monitor = JobMonitor::start(
        api,
        "job-9".to_string(),
        0,
        Duration::from_millis(50),
        sink.clone(),
    )
    .await
    .unwrap();

    // Let a few polls drain the first two lines, then append one more and
    // flip the node to completed.
    tokio::time::sleep(Duration::from_millis(200)).await;
    node.output.lock().push("stage 3".to_string());
    node.status_code.store(40, Ordering::Relaxed);

    tokio::time::timeout(Duration::from_secs(2), monitor.done())
        .await
        .expect("terminal poll status must stop the monitor");
    assert_eq!(monitor.finished(), Some(TaskStatus::Completed));

    // Every line shows up exactly once even though it was polled repeatedly.
    let log = sink.lines();
    for line in ["stage 1", "stage 2", "stage 3"] {
        assert_eq!(
            log.iter().filter(|l| l.as_str() == line).count(),
            1,
            "{line} logged more than once"
        );
    }
    assert!(sink.contains("Progress: 10%"));
    assert!(sink.contains("Task job-9 is done"));

    // The watermark advanced with the consumed output.
    let marks = node.watermarks.lock();
    assert_eq!(marks[0], 0);
    assert!(marks.iter().any(|&m| m >= 2));
}

#[tokio::test]
async fn webhook_listener_walks_past_an_occupied_port() {
    let node = Arc::new(NodeState {
        status_code: AtomicI64::new(20),
        output: Mutex::new(Vec::new()),
        watermarks: Mutex::new(Vec::new()),
    });
    let port = start_node(node).await;

    // Occupy a port, then ask the monitor to bind exactly there.
    let blocker = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let taken = blocker.local_addr().unwrap().port();

    let api = Arc::new(OdmApi::new(format!("http://127.0.0.1:{port}")));
    let sink = Arc::new(MemorySink::new());
    let monitor = JobMonitor::start(
        api,
        "job-10".to_string(),
        taken,
        Duration::from_secs(3600),
        sink.clone(),
    )
    .await
    .unwrap();

    assert_ne!(monitor.webhook_port(), taken);
    assert!(sink.contains(&format!("Webhook listening on port {}", monitor.webhook_port())));

    // The walked-to port serves the webhook; mismatched uuids are ignored,
    // the right uuid finishes the job.
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/webhook", monitor.webhook_port());
    client
        .post(&url)
        .json(&json!({"uuid": "someone-else", "status": {"code": 40}}))
        .send()
        .await
        .unwrap();
    assert!(monitor.finished().is_none());

    client
        .post(&url)
        .json(&json!({"uuid": "job-10", "status": {"code": 50}}))
        .send()
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(2), monitor.done())
        .await
        .expect("terminal webhook must stop the monitor");
    assert_eq!(monitor.finished(), Some(TaskStatus::Canceled));
    assert!(sink.contains("Task job-10 was canceled"));
}
