// Remote REST backend (OpenDroneMap node) — task submission and monitoring.

pub mod api;
pub mod exif;
pub mod files;
pub mod monitor;
pub mod status;
pub mod submit;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::ConnectorConfig;
use crate::error::Result;
use crate::log::SharedSink;
use crate::model::reconcile;

use api::OdmApi;
use monitor::JobMonitor;
use submit::JobSubmitter;

use super::SfmBackend;

pub struct OdmBackend {
    api: Arc<OdmApi>,
    config: ConnectorConfig,
    sink: SharedSink,
    monitors: Mutex<Vec<Arc<JobMonitor>>>,
}

impl OdmBackend {
    pub fn new(config: ConnectorConfig, sink: SharedSink) -> Self {
        Self {
            api: Arc::new(OdmApi::new(config.backend_url.clone())),
            config,
            sink,
            monitors: Mutex::new(Vec::new()),
        }
    }

    /// Monitors of jobs still in flight.
    pub fn active_jobs(&self) -> usize {
        self.monitors
            .lock()
            .iter()
            .filter(|m| m.finished().is_none())
            .count()
    }

    /// Monitor handle for a submitted job, if one is running.
    pub fn monitor_for(&self, uuid: &str) -> Option<Arc<JobMonitor>> {
        self.monitors
            .lock()
            .iter()
            .find(|m| m.uuid() == uuid)
            .cloned()
    }
}

#[async_trait]
impl SfmBackend for OdmBackend {
    async fn connect(&self) -> Result<()> {
        let info = self.api.get_json("/info").await.map_err(|e| {
            self.sink.log("Failed to connect to OpenDroneMap");
            e
        })?;
        self.sink.log("Connected to OpenDroneMap");
        if let Some(version) = info["version"].as_str() {
            self.sink
                .log(&format!("OpenDroneMap version: {version}"));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        for monitor in self.monitors.lock().drain(..) {
            monitor.shutdown();
        }
        self.sink.log("Disconnected from OpenDroneMap");
        Ok(())
    }

    /// Reconcile the session folder, submit the job and start monitoring it.
    /// A failed submission leaves no monitor behind.
    async fn process_photos(&self, dir: &Path) -> Result<()> {
        self.sink.log("Processing photos");
        let model = reconcile::read_folder(dir, &self.sink)?;

        let submitter = JobSubmitter::new(
            &self.api,
            &self.config.remap,
            &self.config.webhook_url,
            &self.sink,
        );
        let uuid = submitter.run(&model).await?;

        let monitor = JobMonitor::start(
            self.api.clone(),
            uuid,
            self.config.webhook_port,
            Duration::from_millis(self.config.poll_period_ms),
            self.sink.clone(),
        )
        .await?;
        self.monitors.lock().push(Arc::new(monitor));
        Ok(())
    }
}
