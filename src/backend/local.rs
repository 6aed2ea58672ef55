// Local reconstruction backend — thin adapter over the native SDK, which is
// an external collaborator behind the `LocalEngine` trait.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConnectorError, Result};
use crate::log::SharedSink;
use crate::model::{reconcile, SessionModel};

use super::SfmBackend;

/// Ids the engine assigns when a session's photos are registered, parallel to
/// `SessionModel::cameras` and `SessionModel::images`.
#[derive(Debug, Clone, Default)]
pub struct PhotoIds {
    pub cameras: Vec<i32>,
    pub images: Vec<i32>,
}

/// Opaque native photogrammetry engine. The real implementation wraps the
/// vendor SDK; tests substitute a recording fake.
#[async_trait]
pub trait LocalEngine: Send + Sync {
    async fn create_project(&self, name: &str) -> Result<()>;
    /// Register the session's cameras and photos. The returned ids key later
    /// marker attachment inside the engine.
    async fn add_photos(&self, model: &SessionModel) -> Result<PhotoIds>;
    /// Register markers and their observations; the model carries the photo
    /// ids from [`LocalEngine::add_photos`] by this point.
    async fn add_markers(&self, model: &SessionModel) -> Result<()>;
    async fn solve(&self) -> Result<()>;
    async fn export(&self, target: &Path) -> Result<()>;
}

pub struct LocalBackend {
    engine: Arc<dyn LocalEngine>,
    sink: SharedSink,
}

impl LocalBackend {
    pub fn new(engine: Arc<dyn LocalEngine>, sink: SharedSink) -> Self {
        Self { engine, sink }
    }
}

fn apply_photo_ids(model: &mut SessionModel, ids: PhotoIds) -> Result<()> {
    if ids.cameras.len() != model.cameras.len() || ids.images.len() != model.images.len() {
        return Err(ConnectorError::data(
            "local engine",
            "photo id count does not match the session model",
        ));
    }
    for (camera, id) in model.cameras.iter_mut().zip(ids.cameras) {
        camera.backend_id = Some(id);
    }
    for (image, id) in model.images.iter_mut().zip(ids.images) {
        image.backend_id = Some(id);
    }
    Ok(())
}

#[async_trait]
impl SfmBackend for LocalBackend {
    async fn connect(&self) -> Result<()> {
        self.sink.log("Local engine ready");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn process_photos(&self, dir: &Path) -> Result<()> {
        self.sink.log("Processing photos");
        let mut model = reconcile::read_folder(dir, &self.sink)?;

        self.engine.create_project(&model.folder_name()).await?;
        let photo_ids = self.engine.add_photos(&model).await?;
        apply_photo_ids(&mut model, photo_ids)?;
        self.engine.add_markers(&model).await?;
        self.engine.solve().await?;

        let target = PathBuf::from(dir).join("model");
        self.engine.export(&target).await?;
        self.sink
            .log(&format!("Exported model to {}", target.display()));
        Ok(())
    }
}
