use serde::Deserialize;

/// Default TCP port the PhotoBox pushes notifications on.
pub const DEVICE_PORT: u16 = 50267;

/// Capture-trigger command word sent to the device.
pub const TAKE_PHOTO_COMMAND: &str = "photo";

/// Preferred port for the job-monitor webhook listener. On a bind conflict the
/// listener walks up to the next free port.
pub const WEBHOOK_PORT: u16 = 3001;

/// Period of the job-status poll timer in milliseconds.
pub const POLL_PERIOD_MS: u64 = 1000;

/// CRS declaration emitted as the first line of the GCP and geo files.
pub const CRS_HEADER: &str =
    "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs";

/// Which reconstruction backend a connector drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote REST engine (OpenDroneMap node).
    Remote,
    /// Native SDK engine behind the `LocalEngine` collaborator.
    Local,
}

/// Affine remap from local project coordinates into the pseudo-projected space
/// the backend expects. The constants look like UTM but are placeholders, so
/// they stay configurable.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordRemap {
    pub scale: f64,
    pub east_offset: f64,
    pub north_offset: f64,
}

impl Default for CoordRemap {
    fn default() -> Self {
        Self {
            scale: 100.0,
            east_offset: 500_000.0,
            north_offset: 5_900_000.0,
        }
    }
}

impl CoordRemap {
    /// Map a local (x, y, z) into the projected frame.
    pub fn apply(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        (
            x * self.scale + self.east_offset,
            y * self.scale + self.north_offset,
            z * self.scale,
        )
    }
}

/// Top-level configuration for the connector. Loading this from disk is the
/// host application's job.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Hostname or IP of the PhotoBox.
    pub device_host: String,
    /// TCP port of the PhotoBox push socket.
    pub device_port: u16,
    /// Root directory of the artifact store.
    pub artifact_root: String,
    /// Which backend reconstruction jobs go to.
    pub backend: BackendKind,
    /// Base URL of the remote REST engine.
    pub backend_url: String,
    /// Callback URL the backend posts job status to.
    pub webhook_url: String,
    /// Preferred local port for the webhook listener.
    pub webhook_port: u16,
    /// Poll period for job status, in milliseconds.
    pub poll_period_ms: u64,
    /// Local-frame → projected-frame remap for GCP/geo files.
    pub remap: CoordRemap,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            device_host: "192.168.1.1".to_string(),
            device_port: DEVICE_PORT,
            artifact_root: String::new(),
            backend: BackendKind::Remote,
            backend_url: "http://localhost:3000".to_string(),
            webhook_url: "http://host.docker.internal:3001/webhook".to_string(),
            webhook_port: WEBHOOK_PORT,
            poll_period_ms: POLL_PERIOD_MS,
            remap: CoordRemap::default(),
        }
    }
}
