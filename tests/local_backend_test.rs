// Local backend pipeline against a recording engine fake.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use photobox_connector::backend::local::{LocalBackend, LocalEngine, PhotoIds};
use photobox_connector::backend::SfmBackend;
use photobox_connector::error::{ConnectorError, Result};
use photobox_connector::log::MemorySink;
use photobox_connector::model::SessionModel;

#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<String>>,
    /// Image backend ids as seen by `add_markers`.
    ids_at_markers: Mutex<Vec<Option<i32>>>,
    fail_on_solve: bool,
}

#[async_trait]
impl LocalEngine for RecordingEngine {
    async fn create_project(&self, name: &str) -> Result<()> {
        self.calls.lock().push(format!("create_project {name}"));
        Ok(())
    }

    async fn add_photos(&self, model: &SessionModel) -> Result<PhotoIds> {
        self.calls.lock().push("add_photos".to_string());
        Ok(PhotoIds {
            cameras: (100..).take(model.cameras.len()).collect(),
            images: (200..).take(model.images.len()).collect(),
        })
    }

    async fn add_markers(&self, model: &SessionModel) -> Result<()> {
        self.calls.lock().push("add_markers".to_string());
        *self.ids_at_markers.lock() = model.images.iter().map(|i| i.backend_id).collect();
        Ok(())
    }

    async fn solve(&self) -> Result<()> {
        self.calls.lock().push("solve".to_string());
        if self.fail_on_solve {
            return Err(ConnectorError::data("solve", "bundle adjustment diverged"));
        }
        Ok(())
    }

    async fn export(&self, target: &Path) -> Result<()> {
        self.calls.lock().push(format!("export {}", target.display()));
        Ok(())
    }
}

fn write_session(dir: &Path) {
    for name in ["rpi01_0001.jpg", "rpi01_0002.jpg"] {
        fs::write(dir.join(name), b"jpegdata").unwrap();
    }
    fs::write(dir.join("meta.json"), r#"{"rpi01_0001": {"LensPosition": 0.0}}"#).unwrap();
    fs::write(dir.join("marker.json"), r#"{"3": {"2": [1.0, 2.0, 0.5]}}"#).unwrap();
    fs::write(
        dir.join("aruco.json"),
        r#"{"rpi01": [{"id": 3, "corner": 2, "x": 100.0, "y": 200.0}]}"#,
    )
    .unwrap();
}

#[tokio::test]
async fn drives_the_engine_in_pipeline_order() {
    let tmp = tempfile::tempdir().unwrap();
    let session = tmp.path().join("s1");
    fs::create_dir(&session).unwrap();
    write_session(&session);

    let engine = Arc::new(RecordingEngine::default());
    let sink = Arc::new(MemorySink::new());
    let backend = LocalBackend::new(engine.clone(), sink.clone());

    backend.connect().await.unwrap();
    assert!(sink.contains("Local engine ready"));

    backend.process_photos(&session).await.unwrap();

    let calls = engine.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            "create_project s1".to_string(),
            "add_photos".to_string(),
            "add_markers".to_string(),
            "solve".to_string(),
            format!("export {}", session.join("model").display()),
        ]
    );

    // The photo ids handed out by the engine are on the model by the time
    // markers are attached.
    assert_eq!(*engine.ids_at_markers.lock(), vec![Some(200), Some(201)]);
    assert!(sink.contains("Exported model to"));
}

#[tokio::test]
async fn engine_failure_aborts_before_export() {
    let tmp = tempfile::tempdir().unwrap();
    let session = tmp.path().join("s2");
    fs::create_dir(&session).unwrap();
    write_session(&session);

    let engine = Arc::new(RecordingEngine {
        fail_on_solve: true,
        ..RecordingEngine::default()
    });
    let sink = Arc::new(MemorySink::new());
    let backend = LocalBackend::new(engine.clone(), sink);

    let err = backend.process_photos(&session).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Data { .. }), "{err:?}");

    let calls = engine.calls.lock().clone();
    assert_eq!(calls.last().unwrap(), "solve");
    assert!(!calls.iter().any(|c| c.starts_with("export")));
}
