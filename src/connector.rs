// Connector orchestration — owns the device client and the active backend,
// and wires session readiness to reconstruction runs.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::error;

use crate::backend::SfmBackend;
use crate::config::ConnectorConfig;
use crate::device::client::{DeviceClient, SessionDispatch};
use crate::download::Downloader;
use crate::log::SharedSink;
use crate::store::artifacts::ArtifactStore;
use crate::store::readiness::ReadinessDetector;

/// Hands a ready session to the backend on a detached worker, so a long
/// reconstruction never blocks protocol reception.
struct BackendDispatch {
    backend: Arc<dyn SfmBackend>,
    sink: SharedSink,
}

impl SessionDispatch for BackendDispatch {
    fn session_ready(&self, session_id: &str, dir: &Path) {
        let backend = self.backend.clone();
        let sink = self.sink.clone();
        let session_id = session_id.to_string();
        let dir = dir.to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = backend.process_photos(&dir).await {
                sink.log(&format!("{session_id}: reconstruction failed: {e}"));
                error!(%session_id, "reconstruction failed: {e}");
            }
        });
    }
}

/// Top-level coordination: connect/disconnect both sides, trigger captures,
/// and allow manual reprocessing of an existing session folder.
pub struct Connector {
    config: ConnectorConfig,
    sink: SharedSink,
    backend: Arc<dyn SfmBackend>,
    readiness: Arc<ReadinessDetector>,
    device: Mutex<Option<Arc<DeviceClient>>>,
}

impl Connector {
    pub fn new(config: ConnectorConfig, backend: Arc<dyn SfmBackend>, sink: SharedSink) -> Self {
        Self {
            readiness: Arc::new(ReadinessDetector::new(sink.clone())),
            config,
            sink,
            backend,
            device: Mutex::new(None),
        }
    }

    /// Connect the device first, then the backend; a backend failure tears
    /// the device connection down again. A repeated connect replaces the
    /// previous device session.
    pub async fn connect(&self) -> Result<()> {
        if let Some(previous) = self.device.lock().await.take() {
            previous.disconnect().await;
        }

        let store = ArtifactStore::new(&self.config.artifact_root);
        let downloader = Arc::new(Downloader::new(
            store,
            self.config.device_host.clone(),
            self.sink.clone(),
        ));
        let dispatch = Arc::new(BackendDispatch {
            backend: self.backend.clone(),
            sink: self.sink.clone(),
        });

        let device = Arc::new(DeviceClient::new(
            self.config.device_host.clone(),
            self.config.device_port,
            downloader,
            self.readiness.clone(),
            dispatch,
            self.sink.clone(),
        ));
        device.connect().await?;

        if let Err(e) = self.backend.connect().await {
            device.disconnect().await;
            return Err(e.into());
        }

        *self.device.lock().await = Some(device);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        if let Some(device) = self.device.lock().await.take() {
            device.disconnect().await;
        }
        self.backend.disconnect().await?;
        Ok(())
    }

    /// Ask the rig for a capture.
    pub async fn take_photo(&self) -> Result<()> {
        let guard = self.device.lock().await;
        match guard.as_ref() {
            Some(device) => device.take_photo().await,
            None => {
                self.sink.log("Not connected");
                Ok(())
            }
        }
    }

    /// Manually run reconstruction for an existing session directory.
    pub async fn process_session(&self, dir: &Path) -> Result<()> {
        self.backend.process_photos(dir).await?;
        Ok(())
    }
}
