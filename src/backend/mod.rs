// Reconstruction backends — capability trait plus the two variants. Selection
// is a configuration choice, not object identity.

pub mod local;
pub mod odm;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, ConnectorConfig};
use crate::error::Result;
use crate::log::SharedSink;

/// What every reconstruction backend can do. `process_photos` consumes a
/// complete session directory and runs a reconstruction job end to end.
#[async_trait]
pub trait SfmBackend: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    async fn process_photos(&self, dir: &Path) -> Result<()>;
}

/// Build the backend the configuration selects. The engine collaborator is
/// only driven when the local kind is chosen.
pub fn from_config(
    config: &ConnectorConfig,
    engine: Arc<dyn local::LocalEngine>,
    sink: SharedSink,
) -> Arc<dyn SfmBackend> {
    match config.backend {
        BackendKind::Remote => Arc::new(odm::OdmBackend::new(config.clone(), sink)),
        BackendKind::Local => Arc::new(local::LocalBackend::new(engine, sink)),
    }
}
