// Per-session data model — cameras, images, markers — and the folder
// reconciliation that builds it.

pub mod camera;
pub mod image;
pub mod marker;
pub mod reconcile;

use std::path::{Path, PathBuf};

pub use camera::{Calibration, Camera, CameraPosition};
pub use image::Image;
pub use marker::{Marker, MarkerPosition};

/// Index of a camera within a [`SessionModel`].
pub type CameraId = usize;
/// Index of an image within a [`SessionModel`].
pub type ImageId = usize;

/// The reconciled graph for one capture session. Images reference their owning
/// camera, and marker positions reference images, by index; both references
/// are fixed at construction.
#[derive(Debug, Default)]
pub struct SessionModel {
    dir: PathBuf,
    pub cameras: Vec<Camera>,
    pub images: Vec<Image>,
    pub markers: Vec<Marker>,
}

impl SessionModel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Session directory this model was read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Last path component of the session directory; used as the job name.
    pub fn folder_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn camera_by_name(&self, name: &str) -> Option<CameraId> {
        self.cameras.iter().position(|c| c.name == name)
    }

    pub fn camera_of(&self, image: &Image) -> &Camera {
        &self.cameras[image.camera]
    }
}
